//! Block composition: each placed part group and each child node becomes one rigid block, and
//! the blocks are arranged against each other with the same solver used for parts.

use crate::arrange::{Element, Layout, LayoutKind, placement_bbox};
use crate::circuit::{Part, Schematic};
use crate::options::PlaceOptions;
use crate::place::Run;
use crate::solver;
use sirenia_geom::{BBox, Point, Tx, vector};

/// Kind of block, in the order blocks are laid out next to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum BlockTag {
    Connected = 1,
    Floating = 2,
    FlattenedChild = 3,
    Child = 4,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BlockSource {
    /// Indices into the node's parts.
    Parts(Vec<usize>),
    /// Index of the child in the node's child order.
    Child(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub(crate) source: BlockSource,
    pub(crate) tag: BlockTag,
    pub(crate) place_bbox: BBox,
    pub(crate) snap_pt: Point,
    pub(crate) tx: Tx,
}

impl Block {
    /// Block around already-placed parts. Coordinates are the node's own, so the block starts
    /// at the identity transform.
    pub(crate) fn from_parts(
        parts: &[Part],
        members: &[usize],
        tag: BlockTag,
        opts: &PlaceOptions,
    ) -> Option<Self> {
        let first = parts.get(*members.first()?)?;
        let mut bbox = BBox::empty();
        for &p in members {
            let part = &parts[p];
            bbox.add(&placement_bbox(part, opts).transform(&part.tx));
        }
        let pad = opts.grid.blk_ext_pad;
        Some(Self {
            source: BlockSource::Parts(members.to_vec()),
            tag,
            place_bbox: bbox.resize(vector(pad, pad)),
            snap_pt: first.tx.apply(first.snap_pt()),
            tx: Tx::identity(),
        })
    }

    /// Block around a placed child node. Children with nothing in them are left alone.
    pub(crate) fn from_child<S: Schematic>(index: usize, child: &S, opts: &PlaceOptions) -> Option<Self> {
        let bbox = child.bbox();
        if bbox.is_empty() {
            return None;
        }
        // A flattened child draws its parts inside an outline, so it needs the inner margin too.
        let (tag, pad) = if child.is_flattened() {
            (
                BlockTag::FlattenedChild,
                opts.grid.blk_int_pad + opts.grid.blk_ext_pad,
            )
        } else {
            (BlockTag::Child, opts.grid.blk_ext_pad)
        };
        let place_bbox = bbox.resize(vector(pad, pad));
        Some(Self {
            source: BlockSource::Child(index),
            tag,
            place_bbox,
            snap_pt: node_snap_pt(child).unwrap_or(place_bbox.min),
            tx: child.tx(),
        })
    }
}

/// Grid reference point of a node in its own coordinates: the first pin of its parts, or
/// failing that the reference point of its first child that has one.
pub(crate) fn node_snap_pt<S: Schematic>(node: &S) -> Option<Point> {
    if let Some(pt) = node
        .parts()
        .iter()
        .find_map(|part| part.pins.first().map(|pin| part.tx.apply(pin.pt)))
    {
        return Some(pt);
    }
    node.children()
        .find_map(|child| node_snap_pt(child).map(|pt| child.tx().apply(pt)))
}

/// Attraction between two block kinds: strong within a kind, weak between kinds that are next
/// to each other among the kinds present, none otherwise.
fn tag_weight(tags: &[BlockTag], a: BlockTag, b: BlockTag) -> f64 {
    if a == b {
        return 1.0;
    }
    let pos = |t| tags.iter().position(|&x| x == t);
    match (pos(a), pos(b)) {
        (Some(i), Some(j)) if i.abs_diff(j) == 1 => 0.1,
        _ => 0.0,
    }
}

/// Arranges the blocks and stores each block's final transform on it.
pub(crate) fn arrange_blocks(blocks: &mut [Block], run: &mut Run<'_>) {
    if blocks.is_empty() {
        return;
    }
    let mut tags: Vec<BlockTag> = blocks.iter().map(|b| b.tag).collect();
    tags.sort_unstable();
    tags.dedup();

    let elems = blocks
        .iter()
        .map(|b| Element {
            orientation_locked: true,
            ..Element::new(b.tx, b.place_bbox, b.snap_pt)
        })
        .collect();
    let anchors: Vec<Point> = blocks.iter().map(|b| b.place_bbox.ctr()).collect();
    let mut layout = Layout::with_similarity(elems, &anchors, LayoutKind::Blocks, |a, b| {
        tag_weight(&tags, blocks[a].tag, blocks[b].tag)
    });

    if layout.len() > 1 {
        layout.scatter(&mut run.rng);
        if run.opts.compress_before_place {
            layout.collapse();
        }
    }
    solver::evolve(&mut layout, run);
    tracing::debug!(blocks = layout.len(), tags = tags.len(), "blocks arranged");

    for (block, elem) in blocks.iter_mut().zip(&layout.elems) {
        block.tx = elem.tx;
    }
}

/// Copies block transforms onto their sources. Child nodes take the block transform as is;
/// parts keep their position inside the group and move with it.
pub(crate) fn apply_blocks<S: Schematic>(node: &mut S, blocks: &[Block]) {
    for block in blocks {
        match &block.source {
            BlockSource::Parts(members) => {
                let parts = node.parts_mut();
                for &p in members {
                    parts[p].tx = parts[p].tx.then(&block.tx);
                }
            }
            BlockSource::Child(index) => {
                if let Some(child) = node.children_mut().nth(*index) {
                    child.set_tx(block.tx);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrange::tests::{part, pin};
    use crate::circuit::{Node, PinOrientation};
    use sirenia_geom::point;

    #[test]
    fn adjacent_kinds_attract_weakly() {
        let tags = [BlockTag::Connected, BlockTag::Floating, BlockTag::FlattenedChild];
        assert_eq!(tag_weight(&tags, BlockTag::Floating, BlockTag::Floating), 1.0);
        assert_eq!(tag_weight(&tags, BlockTag::Connected, BlockTag::Floating), 0.1);
        assert_eq!(tag_weight(&tags, BlockTag::Connected, BlockTag::FlattenedChild), 0.0);

        // With no floating block, connected and child blocks become neighbours.
        let gapped = [BlockTag::Connected, BlockTag::FlattenedChild];
        assert_eq!(
            tag_weight(&gapped, BlockTag::FlattenedChild, BlockTag::Connected),
            0.1
        );
    }

    #[test]
    fn part_block_wraps_padded_parts() {
        let mut parts = vec![
            part("A", 100.0, 100.0, vec![pin("1", 0.0, 50.0, PinOrientation::Right)]),
            part("B", 100.0, 100.0, Vec::new()),
        ];
        parts[0].tx = Tx::translation(500.0, 0.0);
        let opts = PlaceOptions::default();
        let block = Block::from_parts(&parts, &[0, 1], BlockTag::Connected, &opts).unwrap();

        // B: -50..150 square; A: 400..650 by -50..150; plus 100 of block padding.
        assert_eq!(block.place_bbox.min, point(-150.0, -150.0));
        assert_eq!(block.place_bbox.max, point(750.0, 250.0));
        assert_eq!(block.snap_pt, point(500.0, 50.0));
        assert!(Block::from_parts(&parts, &[], BlockTag::Floating, &opts).is_none());
    }

    #[test]
    fn child_block_padding_depends_on_flattening() {
        let opts = PlaceOptions::default();
        let mut child = Node::new("sub");
        child.bbox = BBox::new(point(0.0, 0.0), point(100.0, 100.0));
        let flat = Block::from_child(0, &child, &opts).unwrap();
        assert_eq!(flat.tag, BlockTag::FlattenedChild);
        assert_eq!(flat.place_bbox.min, point(-150.0, -150.0));

        child.flattened = false;
        let boxed = Block::from_child(0, &child, &opts).unwrap();
        assert_eq!(boxed.tag, BlockTag::Child);
        assert_eq!(boxed.place_bbox.min, point(-100.0, -100.0));

        assert!(Block::from_child(0, &Node::new("empty"), &opts).is_none());
    }

    #[test]
    fn snap_point_falls_back_to_children() {
        let mut inner = Node::new("inner");
        inner
            .parts
            .push(part("R1", 100.0, 50.0, vec![pin("1", 0.0, 25.0, PinOrientation::Right)]));
        inner.tx = Tx::translation(200.0, 0.0);
        let mut outer = Node::new("outer");
        outer.add_child(inner);
        assert_eq!(node_snap_pt(&outer), Some(point(200.0, 25.0)));
        assert_eq!(node_snap_pt(&Node::new("bare")), None);
    }

    #[test]
    fn applying_blocks_moves_parts_and_children() {
        let mut node = Node::new("top");
        node.parts.push(part("A", 100.0, 100.0, Vec::new()));
        node.parts[0].tx = Tx::translation(50.0, 0.0);
        node.add_child(Node::new("sub"));
        let blocks = vec![
            Block {
                source: BlockSource::Parts(vec![0]),
                tag: BlockTag::Floating,
                place_bbox: BBox::new(point(0.0, 0.0), point(1.0, 1.0)),
                snap_pt: point(0.0, 0.0),
                tx: Tx::translation(0.0, 100.0),
            },
            Block {
                source: BlockSource::Child(0),
                tag: BlockTag::FlattenedChild,
                place_bbox: BBox::new(point(0.0, 0.0), point(1.0, 1.0)),
                snap_pt: point(0.0, 0.0),
                tx: Tx::translation(300.0, 0.0),
            },
        ];
        apply_blocks(&mut node, &blocks);
        assert_eq!(node.parts[0].tx.origin(), point(50.0, 100.0));
        assert_eq!(node.children["sub"].tx.origin(), point(300.0, 0.0));
    }

    #[test]
    fn arranged_blocks_do_not_overlap() {
        let opts = PlaceOptions::default();
        let mut run = Run::new(&opts);
        let square = BBox::new(point(0.0, 0.0), point(300.0, 300.0));
        let mut blocks: Vec<Block> = [BlockTag::Connected, BlockTag::Connected, BlockTag::Floating]
            .into_iter()
            .enumerate()
            .map(|(i, tag)| Block {
                source: BlockSource::Child(i),
                tag,
                place_bbox: square,
                snap_pt: point(0.0, 0.0),
                tx: Tx::identity(),
            })
            .collect();
        arrange_blocks(&mut blocks, &mut run);
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                assert!(!a.place_bbox.transform(&a.tx).intersects(&b.place_bbox.transform(&b.tx)));
            }
            assert!(sirenia_geom::is_on_grid(a.tx.apply(a.snap_pt), 50.0, 1e-6));
        }
    }
}
