//! Placement context: the movable elements of one placement problem and the anchor/pull points
//! that tie them together.
//!
//! Elements are built fresh for every group and dropped once their transforms are written back,
//! so nothing placement-specific is ever stored on the circuit model.

use crate::circuit::{Net, Part, Pin, PinOrientation};
use crate::error::{Error, Result};
use crate::options::PlaceOptions;
use crate::rng::XorShift64Star;
use rustc_hash::FxHashMap;
use sirenia_geom::{BBox, Point, Tx, point, vector};

/// Part outline grown by routing channels.
///
/// Every side gets one channel plus one per connected, non-stub pin whose wire leaves on that
/// side, each `grid * expansion_factor` wide. Pins oriented `L` widen the right side, `R` the
/// left side, `U` the bottom and `D` the top.
pub fn placement_bbox(part: &Part, opts: &PlaceOptions) -> BBox {
    let (mut up, mut down, mut left, mut right) = (1.0, 1.0, 1.0, 1.0);
    for pin in &part.pins {
        if !pin.connected || pin.stub {
            continue;
        }
        match pin.orientation {
            PinOrientation::Up => up += 1.0,
            PinOrientation::Down => down += 1.0,
            PinOrientation::Left => left += 1.0,
            PinOrientation::Right => right += 1.0,
        }
    }

    let base = if part.bbox.is_empty() {
        BBox::new(Point::origin(), Point::origin())
    } else {
        part.bbox
    };
    let unit = opts.grid.grid * opts.expansion_factor;
    BBox {
        min: point(base.min.x - right * unit, base.min.y - up * unit),
        max: point(base.max.x + left * unit, base.max.y + down * unit),
    }
}

/// Pin point moved onto the placement box edge it faces.
fn anchor_point(pin: &Pin, place_bbox: &BBox) -> Point {
    match pin.orientation {
        PinOrientation::Up => point(pin.pt.x, place_bbox.min.y),
        PinOrientation::Down => point(pin.pt.x, place_bbox.max.y),
        PinOrientation::Left => point(place_bbox.max.x, pin.pt.y),
        PinOrientation::Right => point(place_bbox.min.x, pin.pt.y),
    }
}

/// A point on another element that pulls on this one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pull {
    pub(crate) elem: usize,
    /// Local to `elem`.
    pub(crate) pt: Point,
    pub(crate) weight: f64,
}

/// Everything one net (or the similarity model) contributes to one element.
#[derive(Debug, Clone, Default)]
pub(crate) struct Link {
    pub(crate) key: usize,
    /// Local anchor points on the owning element.
    pub(crate) anchors: Vec<Point>,
    pub(crate) pulls: Vec<Pull>,
    /// Local centroid of `anchors`.
    pub(crate) centroid: Option<Point>,
    /// Distinct elements touching the net, including this one.
    pub(crate) net_parts: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tx: Tx,
    pub(crate) place_bbox: BBox,
    pub(crate) snap_pt: Point,
    pub(crate) orientation_locked: bool,
    pub(crate) pin_count: usize,
    pub(crate) links: Vec<Link>,
}

impl Element {
    pub(crate) fn new(tx: Tx, place_bbox: BBox, snap_pt: Point) -> Self {
        Self {
            tx,
            place_bbox,
            snap_pt,
            orientation_locked: false,
            pin_count: 0,
            links: Vec::new(),
        }
    }

    fn from_part(part: &Part, opts: &PlaceOptions) -> Self {
        Self {
            orientation_locked: part.orientation_locked,
            pin_count: part.pins.len(),
            ..Self::new(part.tx, placement_bbox(part, opts), part.snap_pt())
        }
    }

    /// Placement box under the current transform.
    pub(crate) fn bbox(&self) -> BBox {
        self.place_bbox.transform(&self.tx)
    }

    /// Half-perimeter of the placement box; the yardstick for movement limits.
    pub(crate) fn size(&self) -> f64 {
        self.place_bbox.w() + self.place_bbox.h()
    }

    pub(crate) fn world(&self, local: Point) -> Point {
        self.tx.apply(local)
    }

    pub(crate) fn link(&self, key: usize) -> Option<&Link> {
        self.links.iter().find(|l| l.key == key)
    }

    fn link_mut(&mut self, key: usize) -> &mut Link {
        let pos = match self.links.iter().position(|l| l.key == key) {
            Some(pos) => pos,
            None => {
                self.links.push(Link {
                    key,
                    ..Link::default()
                });
                self.links.len() - 1
            }
        };
        &mut self.links[pos]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LayoutKind {
    /// Parts joined by nets.
    Connected,
    /// Parts with no nets, attracted by similarity.
    Floating,
    /// Part groups and child nodes.
    Blocks,
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) elems: Vec<Element>,
    pub(crate) kind: LayoutKind,
}

impl Layout {
    /// Elements for one connected group. `members` index `parts`; `kept` indexes `nets`.
    pub(crate) fn connected(
        parts: &[Part],
        members: &[usize],
        nets: &[Net],
        kept: &[usize],
        opts: &PlaceOptions,
        rng: &mut XorShift64Star,
    ) -> Result<Self> {
        let index: FxHashMap<usize, usize> =
            members.iter().enumerate().map(|(e, &p)| (p, e)).collect();
        let mut elems: Vec<Element> = members
            .iter()
            .map(|&p| Element::from_part(&parts[p], opts))
            .collect();

        for &ni in kept {
            let net = &nets[ni];
            let mut pins: Vec<(usize, Point, bool)> = Vec::new();
            for r in &net.pins {
                let Some(&e) = index.get(&r.part) else {
                    continue;
                };
                let part = &parts[r.part];
                let pin = part.pins.get(r.pin).ok_or_else(|| Error::InvalidNetPin {
                    net: net.name.clone(),
                    part: r.part,
                    pin: r.pin,
                })?;
                pins.push((
                    e,
                    anchor_point(pin, &elems[e].place_bbox),
                    part.is_net_terminal(),
                ));
            }
            if pins.is_empty() {
                continue;
            }

            let mut net_elems: Vec<usize> = pins.iter().map(|p| p.0).collect();
            net_elems.sort_unstable();
            net_elems.dedup();

            for &(e, anchor, terminal) in &pins {
                elems[e].link_mut(ni).anchors.push(anchor);
                // Net terminals are pulled toward the parts on their net but never pull them.
                if terminal {
                    continue;
                }
                for &other in net_elems.iter().filter(|&&o| o != e) {
                    elems[other].link_mut(ni).pulls.push(Pull {
                        elem: e,
                        pt: anchor,
                        weight: 1.0,
                    });
                }
            }
            for &e in &net_elems {
                elems[e].link_mut(ni).net_parts = net_elems.len();
            }
        }

        if opts.trim_anchor_pull_pins {
            for elem in &mut elems {
                for link in &mut elem.links {
                    if link.anchors.len() > 1 {
                        let keep = link.anchors[rng.next_usize(link.anchors.len())];
                        link.anchors = vec![keep];
                    }
                }
            }
        }

        for elem in &mut elems {
            for link in &mut elem.links {
                link.centroid = centroid(&link.anchors);
            }
        }

        Ok(Self {
            elems,
            kind: LayoutKind::Connected,
        })
    }

    /// Elements for the floating parts. Each part is anchored at its top-most pin so the tops of
    /// similar parts line up; pinless parts use the top-right corner of their placement box.
    pub(crate) fn floating(parts: &[Part], members: &[usize], opts: &PlaceOptions) -> Self {
        let elems: Vec<Element> = members
            .iter()
            .map(|&p| Element::from_part(&parts[p], opts))
            .collect();
        let anchors: Vec<Point> = members
            .iter()
            .zip(&elems)
            .map(|(&p, elem)| {
                let mut top: Option<&Pin> = None;
                for pin in &parts[p].pins {
                    if top.is_none_or(|t| pin.pt.y > t.pt.y) {
                        top = Some(pin);
                    }
                }
                match top {
                    Some(pin) => anchor_point(pin, &elem.place_bbox),
                    None => elem.place_bbox.max,
                }
            })
            .collect();

        Self::with_similarity(elems, &anchors, LayoutKind::Floating, |a, b| {
            parts[members[a]].similarity(&parts[members[b]]) / 100.0
        })
    }

    /// Ties every element to every other through a single anchor each, weighted by `weight`.
    /// Pairs with zero weight exert no pull.
    pub(crate) fn with_similarity(
        mut elems: Vec<Element>,
        anchors: &[Point],
        kind: LayoutKind,
        weight: impl Fn(usize, usize) -> f64,
    ) -> Self {
        let n = elems.len();
        for (a, elem) in elems.iter_mut().enumerate() {
            let pulls = (0..n)
                .filter(|&b| b != a)
                .map(|b| Pull {
                    elem: b,
                    pt: anchors[b],
                    weight: weight(a, b),
                })
                .filter(|p| p.weight != 0.0)
                .collect();
            elem.links = vec![Link {
                key: 0,
                anchors: vec![anchors[a]],
                pulls,
                centroid: Some(anchors[a]),
                net_parts: n,
            }];
        }
        Self { elems, kind }
    }

    pub(crate) fn len(&self) -> usize {
        self.elems.len()
    }

    pub(crate) fn has_nets(&self) -> bool {
        self.kind == LayoutKind::Connected
    }

    pub(crate) fn pull_point(&self, pull: &Pull) -> Point {
        self.elems[pull.elem].world(pull.pt)
    }

    pub(crate) fn overlaps_any(&self, i: usize) -> bool {
        let bbox = self.elems[i].bbox();
        self.elems
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && bbox.intersects(&other.bbox()))
    }

    pub(crate) fn any_overlap(&self) -> bool {
        let boxes: Vec<BBox> = self.elems.iter().map(Element::bbox).collect();
        boxes
            .iter()
            .enumerate()
            .any(|(i, a)| boxes[i + 1..].iter().any(|b| a.intersects(b)))
    }

    /// Side of a square big enough to hold every element with room to spare.
    fn scatter_side(&self) -> f64 {
        let area: f64 = self.elems.iter().map(|e| e.place_bbox.area()).sum();
        3.0 * area.sqrt()
    }

    /// Moves every element's origin to a random spot in a square sized to their total area.
    pub(crate) fn scatter(&mut self, rng: &mut XorShift64Star) {
        let side = self.scatter_side();
        for elem in &mut self.elems {
            let pt = point(rng.next_f64_unit() * side, rng.next_f64_unit() * side);
            elem.tx.move_to(pt);
        }
    }

    /// Stacks every element's centre on the centre of the group.
    pub(crate) fn collapse(&mut self) {
        if self.elems.len() <= 1 {
            return;
        }
        let mut bbox = BBox::empty();
        for elem in &self.elems {
            bbox.add(&elem.bbox());
        }
        let ctr = bbox.ctr();
        for elem in &mut self.elems {
            let mv = ctr - elem.world(elem.place_bbox.ctr());
            elem.tx.translate(mv);
        }
    }

    pub(crate) fn txs(&self) -> Vec<Tx> {
        self.elems.iter().map(|e| e.tx).collect()
    }

    pub(crate) fn restore_txs(&mut self, txs: &[Tx]) {
        for (elem, tx) in self.elems.iter_mut().zip(txs) {
            elem.tx = *tx;
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.elems.iter().all(|e| e.tx.is_finite())
    }
}

fn centroid(pts: &[Point]) -> Option<Point> {
    if pts.is_empty() {
        return None;
    }
    let sum = pts
        .iter()
        .fold(vector(0.0, 0.0), |acc, p| acc + p.to_vector());
    Some((sum / pts.len() as f64).to_point())
}
