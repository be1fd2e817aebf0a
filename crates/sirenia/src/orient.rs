//! Orientation search over the eight quarter-turn/mirror orientations of each part.

use crate::arrange::Layout;
use crate::options::{PlaceOptions, TensionKind};
use sirenia_geom::{Tx, norm, xprod};

/// Cost of the nets pulling on one element.
pub(crate) fn tension(layout: &Layout, elem: usize, kind: TensionKind, pt_to_pt_mult: f64) -> f64 {
    match kind {
        TensionKind::Distance => nearest_pull_distance(layout, elem),
        TensionKind::Torque => torque(layout, elem, pt_to_pt_mult),
    }
}

pub(crate) fn total_tension(layout: &Layout, kind: TensionKind, pt_to_pt_mult: f64) -> f64 {
    (0..layout.len())
        .map(|i| tension(layout, i, kind, pt_to_pt_mult))
        .sum()
}

/// Sum over anchors of the distance to the closest pull point on the same net, where the wire
/// will most likely be routed.
fn nearest_pull_distance(layout: &Layout, elem: usize) -> f64 {
    let e = &layout.elems[elem];
    let mut total = 0.0;
    for link in &e.links {
        if link.pulls.is_empty() {
            continue;
        }
        for anchor in &link.anchors {
            let anchor = e.world(*anchor);
            let nearest = link
                .pulls
                .iter()
                .map(|p| (layout.pull_point(p) - anchor).length())
                .fold(f64::INFINITY, f64::min);
            total += nearest;
        }
    }
    total
}

/// Magnitude of the combined turning moment the nets exert about the centre of the placement
/// box.
fn torque(layout: &Layout, elem: usize, pt_to_pt_mult: f64) -> f64 {
    let e = &layout.elems[elem];
    let ctr = e.world(e.place_bbox.ctr());
    let mut total = 0.0;
    for link in &e.links {
        if link.anchors.is_empty() || link.pulls.is_empty() {
            continue;
        }
        let mult = if link.pulls.len() <= 1 {
            pt_to_pt_mult
        } else {
            1.0
        };
        let count = link.pulls.len() as f64;
        for anchor in &link.anchors {
            let anchor = e.world(*anchor);
            let lever = norm(anchor - ctr);
            for pull in &link.pulls {
                let pull_dir = norm(layout.pull_point(pull) - anchor);
                total += xprod(lever, pull_dir) * mult / count;
            }
        }
    }
    total.abs()
}

/// Change in tension of the best alternative orientation, and the transform that gives it.
/// Rotations and mirrors pivot about the placement box centre, so the part stays where it is.
fn best_orientation(
    layout: &mut Layout,
    elem: usize,
    kind: TensionKind,
    pt_to_pt_mult: f64,
) -> (f64, Tx) {
    let start = layout.elems[elem].tx;
    let current = tension(layout, elem, kind, pt_to_pt_mult);
    let pivot = layout.elems[elem].bbox().ctr();

    let mut best = (f64::INFINITY, start);
    let mut first = true;
    for _ in 0..2 {
        for _ in 0..4 {
            if first {
                first = false;
            } else {
                let delta = tension(layout, elem, kind, pt_to_pt_mult) - current;
                if delta < best.0 {
                    best = (delta, layout.elems[elem].tx);
                }
            }
            layout.elems[elem].tx.rotate_cw_about(pivot);
        }
        layout.elems[elem].tx.flip_x_about(pivot);
    }

    layout.elems[elem].tx = start;
    best
}

/// Kernighan-Lin style orientation pass over the parts that are not orientation-locked.
///
/// Each pass greedily reorients every movable part once, always taking the part whose best
/// orientation lowers its tension the most, then undoes every move after the point of lowest
/// cumulative cost. Passes repeat until one keeps no moves, the total tension stops falling, or
/// the pass limit is reached. Returns whether any orientation changed.
pub(crate) fn adjust_orientations(layout: &mut Layout, opts: &PlaceOptions) -> bool {
    let kind = opts.net_tension;
    let mult = opts.pt_to_pt_mult;
    let movable: Vec<usize> = (0..layout.len())
        .filter(|&i| !layout.elems[i].orientation_locked)
        .collect();
    if movable.is_empty() {
        return false;
    }

    let initial = layout.txs();
    for pass in 0..opts.max_orientation_passes {
        let before_txs = layout.txs();
        let before = total_tension(layout, kind, mult);

        let mut unmoved = movable.clone();
        let mut moved: Vec<(usize, f64, Tx)> = Vec::with_capacity(movable.len());
        while !unmoved.is_empty() {
            let mut pick: Option<(usize, f64, Tx)> = None;
            for (slot, &elem) in unmoved.iter().enumerate() {
                let (delta, tx) = best_orientation(layout, elem, kind, mult);
                if pick.is_none_or(|(_, best, _)| delta < best) {
                    pick = Some((slot, delta, tx));
                }
            }
            let Some((slot, delta, tx)) = pick else {
                break;
            };
            let elem = unmoved.remove(slot);
            moved.push((elem, delta, layout.elems[elem].tx));
            layout.elems[elem].tx = tx;
        }

        // Cumulative cost after each prefix of moves, starting with no moves at all.
        let mut keep = 0;
        let mut running = 0.0;
        let mut lowest = 0.0;
        for (i, (_, delta, _)) in moved.iter().enumerate() {
            running += delta;
            if running < lowest {
                lowest = running;
                keep = i + 1;
            }
        }
        for (elem, _, prev) in &moved[keep..] {
            layout.elems[*elem].tx = *prev;
        }

        let after = total_tension(layout, kind, mult);
        tracing::trace!(pass, kept = keep, before, after, "orientation pass");
        if after > before {
            layout.restore_txs(&before_txs);
            break;
        }
        if keep == 0 {
            break;
        }
    }

    layout.txs() != initial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrange::tests::{net, part, pin};
    use crate::circuit::PinOrientation;
    use crate::rng::XorShift64Star;
    use sirenia_geom::{Orientation, point};

    fn facing_away() -> Layout {
        // A's pin leaves to the right, B's pin leaves to the left, but B sits left of A.
        let parts = vec![
            part("A", 100.0, 100.0, vec![pin("1", 100.0, 50.0, PinOrientation::Left)]),
            part("B", 100.0, 100.0, vec![pin("1", 0.0, 50.0, PinOrientation::Right)]),
        ];
        let nets = vec![net("n", &[(0, 0), (1, 0)])];
        let mut rng = XorShift64Star::new(1);
        let mut layout = Layout::connected(
            &parts,
            &[0, 1],
            &nets,
            &[0],
            &PlaceOptions::default(),
            &mut rng,
        )
        .unwrap();
        layout.elems[0].tx = Tx::translation(1000.0, 0.0);
        layout.elems[1].tx = Tx::translation(0.0, 0.0);
        layout
    }

    #[test]
    fn distance_tension_uses_nearest_pull() {
        let layout = facing_away();
        // A anchor (1200, 50); B anchor (-100, 50).
        let t = tension(&layout, 0, TensionKind::Distance, 5.0);
        assert!((t - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn torque_is_zero_for_a_pull_along_the_lever() {
        let layout = facing_away();
        assert!(tension(&layout, 0, TensionKind::Torque, 5.0).abs() < 1e-12);
    }

    #[test]
    fn reorienting_never_raises_total_tension() {
        for kind in [TensionKind::Distance, TensionKind::Torque] {
            let mut opts = PlaceOptions::default();
            opts.net_tension = kind;
            let mut layout = facing_away();
            let before = total_tension(&layout, kind, opts.pt_to_pt_mult);
            adjust_orientations(&mut layout, &opts);
            let after = total_tension(&layout, kind, opts.pt_to_pt_mult);
            assert!(after <= before + 1e-9, "{kind:?}: {before} -> {after}");
        }
    }

    #[test]
    fn facing_pins_get_turned_toward_each_other() {
        let opts = PlaceOptions::default();
        let mut layout = facing_away();
        let before = total_tension(&layout, opts.net_tension, opts.pt_to_pt_mult);
        assert!(adjust_orientations(&mut layout, &opts));
        let after = total_tension(&layout, opts.net_tension, opts.pt_to_pt_mult);
        assert!(after < before);
        for elem in &layout.elems {
            assert!(elem.tx.orientation().is_some());
        }
    }

    #[test]
    fn locked_parts_keep_their_orientation() {
        let opts = PlaceOptions::default();
        let mut layout = facing_away();
        for elem in &mut layout.elems {
            elem.orientation_locked = true;
        }
        assert!(!adjust_orientations(&mut layout, &opts));
        assert_eq!(layout.elems[0].tx.orientation(), Some(Orientation::IDENTITY));
    }

    #[test]
    fn trying_orientations_keeps_the_part_in_place() {
        let mut layout = facing_away();
        let ctr = layout.elems[0].bbox().ctr();
        let (_, tx) = best_orientation(&mut layout, 0, TensionKind::Distance, 5.0);
        layout.elems[0].tx = tx;
        let moved = layout.elems[0].bbox().ctr();
        assert!((moved - ctr).length() < 1e-9);
        assert_ne!(ctr, point(0.0, 0.0));
    }
}
