//! Recursive placement driver.
//!
//! [`place`] walks a node tree depth first. Children are placed before their parent so that the
//! parent can treat each one as a rigid block. Within a node, every connected group and the
//! floating parts are placed on their own, then the resulting blocks and the children are
//! arranged together.

use crate::arrange::{Layout, LayoutKind};
use crate::block::{self, Block, BlockTag};
use crate::circuit::Schematic;
use crate::error::{Error, Result};
use crate::group::group_parts;
use crate::options::PlaceOptions;
use crate::orient;
use crate::rng::XorShift64Star;
use crate::solver;
use serde::Serialize;
use sirenia_geom::{BBox, Tx, vector};

/// Solver stage that fell short of its normal stopping condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// An alpha step hit `max_solver_iterations` before the elements were still.
    PushPull,
    /// Grid shoves hit `max_overlap_iterations`; the sweep fallback was used.
    OverlapRemoval,
}

/// A non-fatal shortfall. The placement is still overlap-free and on the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub node: String,
    pub stage: Stage,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementReport {
    pub degradations: Vec<Degradation>,
    pub parts_placed: usize,
    pub blocks_placed: usize,
}

impl PlacementReport {
    pub fn is_clean(&self) -> bool {
        self.degradations.is_empty()
    }
}

/// State shared by every node of one top-level placement call.
pub(crate) struct Run<'a> {
    pub(crate) opts: &'a PlaceOptions,
    pub(crate) rng: XorShift64Star,
    node: String,
    report: PlacementReport,
}

impl<'a> Run<'a> {
    pub(crate) fn new(opts: &'a PlaceOptions) -> Self {
        Self {
            opts,
            rng: XorShift64Star::new(opts.seed),
            node: String::new(),
            report: PlacementReport::default(),
        }
    }

    pub(crate) fn degrade(&mut self, stage: Stage, detail: String) {
        tracing::warn!(node = %self.node, ?stage, %detail, "placement degraded");
        self.report.degradations.push(Degradation {
            node: self.node.clone(),
            stage,
            detail,
        });
    }

    #[cfg(test)]
    pub(crate) fn degradations(&self) -> &[Degradation] {
        &self.report.degradations
    }
}

/// Places every part and child node under `node`, writing transforms and bounding boxes back.
///
/// The random generator is seeded once from `opts.seed`, so the same input and options always
/// give the same transforms. If a node fails, its parts and children get back the transforms
/// they had before that node's placement started and the error is returned.
pub fn place<S: Schematic>(node: &mut S, opts: &PlaceOptions) -> Result<PlacementReport> {
    let mut run = Run::new(opts);
    place_node(node, &mut run)?;
    let report = run.report;
    tracing::debug!(
        parts = report.parts_placed,
        blocks = report.blocks_placed,
        degradations = report.degradations.len(),
        "placement finished"
    );
    Ok(report)
}

fn place_node<S: Schematic>(node: &mut S, run: &mut Run<'_>) -> Result<()> {
    let span = tracing::debug_span!("place", node = node.name());
    let _enter = span.enter();

    for child in node.children_mut() {
        place_node(child, run)?;
    }

    let part_txs: Vec<Tx> = node.parts().iter().map(|p| p.tx).collect();
    let child_txs: Vec<Tx> = node.children().map(Schematic::tx).collect();
    run.node = node.name().to_string();

    if let Err(err) = place_contents(node, run) {
        tracing::debug!(%err, "restoring transforms");
        for (part, tx) in node.parts_mut().iter_mut().zip(part_txs) {
            part.tx = tx;
        }
        for (child, tx) in node.children_mut().zip(child_txs) {
            child.set_tx(tx);
        }
        return Err(err);
    }

    let bbox = node_bbox(node, run.opts);
    node.set_bbox(bbox);
    Ok(())
}

fn place_contents<S: Schematic>(node: &mut S, run: &mut Run<'_>) -> Result<()> {
    let opts = run.opts;
    let grouping = group_parts(node.parts(), node.internal_nets(), opts);
    let mut blocks: Vec<Block> = Vec::new();

    for members in &grouping.connected {
        let mut layout = Layout::connected(
            node.parts(),
            members,
            node.internal_nets(),
            &grouping.nets,
            opts,
            &mut run.rng,
        )?;
        place_group(&mut layout, run)?;
        write_back(node, members, &layout);
        blocks.extend(Block::from_parts(node.parts(), members, BlockTag::Connected, opts));
    }

    if !grouping.floating.is_empty() {
        let mut layout = Layout::floating(node.parts(), &grouping.floating, opts);
        place_group(&mut layout, run)?;
        write_back(node, &grouping.floating, &layout);
        blocks.extend(Block::from_parts(
            node.parts(),
            &grouping.floating,
            BlockTag::Floating,
            opts,
        ));
    }

    for (index, child) in node.children().enumerate() {
        blocks.extend(Block::from_child(index, child, opts));
    }

    block::arrange_blocks(&mut blocks, run);
    if blocks.iter().any(|b| !b.tx.is_finite()) {
        return Err(Error::PlacementFailure {
            node: run.node.clone(),
            reason: "block transform is not finite".to_string(),
        });
    }
    block::apply_blocks(node, &blocks);

    run.report.parts_placed += node.parts().len();
    run.report.blocks_placed += blocks.len();
    tracing::debug!(
        groups = grouping.connected.len(),
        floating = grouping.floating.len(),
        blocks = blocks.len(),
        "node placed"
    );
    Ok(())
}

/// Initial spread, solve, and for connected parts one round of reorientation followed by a
/// second solve.
fn place_group(layout: &mut Layout, run: &mut Run<'_>) -> Result<()> {
    let opts = run.opts;
    if layout.len() > 1 {
        layout.scatter(&mut run.rng);
        if opts.compress_before_place {
            layout.collapse();
        }
    }

    solver::evolve(layout, run);
    if opts.rotate_parts
        && layout.kind == LayoutKind::Connected
        && orient::adjust_orientations(layout, opts)
    {
        solver::evolve(layout, run);
    }

    if !layout.is_finite() {
        return Err(Error::PlacementFailure {
            node: run.node.clone(),
            reason: "part transform is not finite".to_string(),
        });
    }
    Ok(())
}

fn write_back<S: Schematic>(node: &mut S, members: &[usize], layout: &Layout) {
    let parts = node.parts_mut();
    for (&p, elem) in members.iter().zip(&layout.elems) {
        parts[p].tx = elem.tx;
    }
}

/// Outline of a placed node: its parts' symbol outlines and its children's padded outlines,
/// all in the node's coordinates.
pub(crate) fn node_bbox<S: Schematic>(node: &S, opts: &PlaceOptions) -> BBox {
    let pad = opts.grid.blk_ext_pad;
    let mut bbox = BBox::empty();
    for part in node.parts() {
        bbox.add(&part.bbox.transform(&part.tx));
    }
    for child in node.children() {
        let outline = child.bbox();
        if outline.is_empty() {
            continue;
        }
        bbox.add(&outline.resize(vector(pad, pad)).transform(&child.tx()));
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrange::tests::{net, part, pin};
    use crate::arrange::placement_bbox;
    use crate::circuit::{Node, PinOrientation};
    use sirenia_geom::{is_on_grid, point};

    fn resistor(name: &str) -> crate::circuit::Part {
        part(
            name,
            100.0,
            50.0,
            vec![
                pin("1", 0.0, 25.0, PinOrientation::Right),
                pin("2", 100.0, 25.0, PinOrientation::Left),
            ],
        )
    }

    fn divider() -> Node {
        let mut node = Node::new("divider");
        node.parts = vec![resistor("R1"), resistor("R2"), resistor("R3")];
        node.nets = vec![net("mid", &[(0, 1), (1, 0)]), net("out", &[(1, 1), (2, 0)])];
        node
    }

    #[test]
    fn empty_node_is_a_no_op() {
        let mut node = Node::new("empty");
        let report = place(&mut node, &PlaceOptions::default()).unwrap();
        assert!(node.bbox.is_empty());
        assert_eq!(report.parts_placed, 0);
        assert_eq!(report.blocks_placed, 0);
    }

    #[test]
    fn single_part_stays_on_grid() {
        let mut node = Node::new("one");
        node.parts.push(resistor("R1"));
        node.parts[0].tx = Tx::translation(13.0, 7.0);
        place(&mut node, &PlaceOptions::default()).unwrap();
        let p = &node.parts[0];
        assert!(is_on_grid(p.tx.apply(p.snap_pt()), 50.0, 1e-6));
        assert_eq!(node.bbox, p.bbox.transform(&p.tx));
    }

    #[test]
    fn connected_parts_do_not_overlap() {
        let opts = PlaceOptions::default();
        let mut node = divider();
        let report = place(&mut node, &opts).unwrap();
        assert_eq!(report.parts_placed, 3);
        assert_eq!(report.blocks_placed, 1);

        let boxes: Vec<BBox> = node
            .parts
            .iter()
            .map(|p| placement_bbox(p, &opts).transform(&p.tx))
            .collect();
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
        for p in &node.parts {
            assert!(is_on_grid(p.tx.apply(p.snap_pt()), 50.0, 1e-6));
            assert!(p.tx.orientation().is_some());
        }
    }

    #[test]
    fn failure_restores_transforms() {
        let mut node = divider();
        node.parts[2].tx = Tx::translation(400.0, 0.0);
        node.nets.push(net("bad", &[(0, 0), (2, 9)]));
        let before: Vec<Tx> = node.parts.iter().map(|p| p.tx).collect();
        let err = place(&mut node, &PlaceOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidNetPin { pin: 9, .. }));
        let after: Vec<Tx> = node.parts.iter().map(|p| p.tx).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn overflowing_outline_fails_and_restores_transforms() {
        let mut node =
            Node::from_json_str(include_str!("../tests/fixtures/point_to_point.json")).unwrap();
        node.parts[1].bbox = BBox::new(point(0.0, 0.0), point(1e308, 1e308));
        let before: Vec<Tx> = node.parts.iter().map(|p| p.tx).collect();

        let err = place(&mut node, &PlaceOptions::default()).unwrap_err();
        assert!(
            matches!(err, Error::PlacementFailure { .. }),
            "unexpected error: {err}"
        );
        let after: Vec<Tx> = node.parts.iter().map(|p| p.tx).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn node_bbox_pads_children_only() {
        let opts = PlaceOptions::default();
        let mut node = Node::new("top");
        node.parts.push(part("A", 100.0, 100.0, Vec::new()));
        let mut child = Node::new("sub");
        child.bbox = BBox::new(point(0.0, 0.0), point(100.0, 100.0));
        child.tx = Tx::translation(1000.0, 0.0);
        node.add_child(child);
        node.add_child(Node::new("hollow"));

        let bbox = node_bbox(&node, &opts);
        assert_eq!(bbox.min, point(0.0, -100.0));
        assert_eq!(bbox.max, point(1200.0, 200.0));
    }
}
