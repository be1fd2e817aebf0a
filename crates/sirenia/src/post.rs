//! Passes that run after the force solver: jumping, pin alignment, grid snapping, overlap
//! removal and slip-and-slide refinement.

use crate::arrange::{Layout, LayoutKind};
use crate::force::{ForceModel, overlap_force};
use crate::options::PlaceOptions;
use crate::place::{Run, Stage};
use indexmap::IndexMap;
use sirenia_geom::{Vector, sgn, snap_to_grid, vector};

/// Moves the elements with the strongest attractive pull straight along that pull, ignoring
/// whatever overlaps they pass through, so they can escape a blocked position.
pub(crate) fn jump(layout: &mut Layout, model: &ForceModel, run: &mut Run<'_>) {
    let opts = run.opts;
    if !opts.allow_jumps || layout.len() <= 1 || opts.speed <= 0.0 {
        return;
    }

    let by_pull = |layout: &Layout, elems: &mut Vec<usize>| {
        let mut keyed: Vec<(f64, usize)> = elems
            .iter()
            .map(|&i| (model.attractive(layout, i).length(), i))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        *elems = keyed.into_iter().map(|(_, i)| i).collect();
    };

    let mut queue: Vec<usize> = (0..layout.len()).collect();
    by_pull(layout, &mut queue);
    queue.truncate(opts.jump_count);

    let hops = (1.0 / opts.speed).round() as usize;
    while !queue.is_empty() {
        let elem = queue.remove(0);
        for _ in 0..hops {
            let mv = model.attractive(layout, elem) * opts.speed;
            layout.elems[elem].tx.translate(mv);
        }
        tracing::trace!(elem, "jumped");
        by_pull(layout, &mut queue);
    }
}

/// Shifts each part along one axis so that its most common pin-to-pin offset becomes
/// horizontal or vertical. Parts with more pins go first so smaller parts line up with them.
pub(crate) fn align(layout: &mut Layout, opts: &PlaceOptions) {
    if !opts.align_parts || layout.kind == LayoutKind::Blocks {
        return;
    }

    let mut order: Vec<usize> = (0..layout.len()).collect();
    order.sort_by(|&a, &b| layout.elems[b].pin_count.cmp(&layout.elems[a].pin_count));

    for elem in order {
        // Offsets are counted on a fine lattice so float noise does not split equal moves.
        let mut counts: IndexMap<(i64, i64), (Vector, usize)> = IndexMap::new();
        {
            let e = &layout.elems[elem];
            for link in &e.links {
                for pull in &link.pulls {
                    let pull_pt = layout.pull_point(pull);
                    for anchor in &link.anchors {
                        let mv = pull_pt - e.world(*anchor);
                        let key = ((mv.x * 1e3).round() as i64, (mv.y * 1e3).round() as i64);
                        counts.entry(key).or_insert((mv, 0)).1 += 1;
                    }
                }
            }
        }

        let mut best: Option<(Vector, usize)> = None;
        for &(mv, count) in counts.values() {
            let better = match best {
                None => true,
                Some((b, c)) => {
                    count > c || (count == c && mv.x.abs().min(mv.y.abs()) < b.x.abs().min(b.y.abs()))
                }
            };
            if better {
                best = Some((mv, count));
            }
        }
        let Some((mut mv, _)) = best else {
            continue;
        };

        // Move along the smaller component only.
        if mv.x.abs() > mv.y.abs() {
            mv.x = 0.0;
        } else {
            mv.y = 0.0;
        }
        layout.elems[elem].tx.translate(mv);
    }
}

/// Puts every element's snap point exactly on the grid.
pub(crate) fn snap_all(layout: &mut Layout, grid: f64) {
    for elem in &mut layout.elems {
        let at = elem.world(elem.snap_pt);
        let target = snap_to_grid(at, grid);
        elem.tx.place_point(elem.snap_pt, target);
    }
}

/// Shoves overlapping elements apart one grid step at a time.
///
/// Every element steps along the sign of its overlap force; the mean step, rounded to whole grid
/// steps, is removed so the group does not wander and positions stay on the grid. If overlaps
/// survive `max_overlap_iterations` steps the elements are legalised by a left-to-right sweep.
pub(crate) fn remove_overlaps(layout: &mut Layout, run: &mut Run<'_>) {
    let n = layout.len();
    if n <= 1 {
        return;
    }
    let grid = run.opts.grid.grid;

    for iteration in 0..run.opts.max_overlap_iterations {
        if !layout.any_overlap() {
            tracing::trace!(iteration, "overlaps cleared");
            return;
        }

        let shoves: Vec<Vector> = (0..n)
            .map(|i| {
                let f = overlap_force(layout, i, &mut run.rng);
                vector(sgn(f.x), sgn(f.y)) * grid
            })
            .collect();
        let drift = shoves.iter().fold(Vector::zero(), |acc, s| acc + *s) / n as f64;
        let drift = vector(
            (drift.x / grid).round() * grid,
            (drift.y / grid).round() * grid,
        );
        for (elem, shove) in layout.elems.iter_mut().zip(shoves) {
            elem.tx.translate(shove - drift);
        }
    }

    if layout.any_overlap() {
        legalize(layout, grid);
        run.degrade(
            Stage::OverlapRemoval,
            format!(
                "overlaps remained after {} grid shoves; swept elements apart",
                run.opts.max_overlap_iterations
            ),
        );
    }
}

/// Places elements left to right so that no two share any x range. Moves are whole grid steps.
fn legalize(layout: &mut Layout, grid: f64) {
    let mut order: Vec<usize> = (0..layout.len()).collect();
    order.sort_by(|&a, &b| {
        let (ba, bb) = (layout.elems[a].bbox(), layout.elems[b].bbox());
        ba.min.x.total_cmp(&bb.min.x).then(a.cmp(&b))
    });

    let mut cursor = f64::NEG_INFINITY;
    for i in order {
        let bbox = layout.elems[i].bbox();
        if bbox.min.x < cursor {
            let dx = ((cursor - bbox.min.x) / grid).ceil() * grid;
            layout.elems[i].tx.translate(vector(dx, 0.0));
        }
        cursor = cursor.max(layout.elems[i].bbox().max.x);
    }
}

/// Local refinement: tries single grid steps in each direction and keeps the first one that
/// lowers the element's attractive force without creating an overlap.
pub(crate) fn slip_and_slide(layout: &mut Layout, model: &ForceModel, run: &mut Run<'_>) {
    let opts = run.opts;
    if !opts.slip_and_slide || layout.len() <= 1 || !layout.has_nets() {
        return;
    }
    let grid = opts.grid.grid;
    let steps = [
        vector(-grid, 0.0),
        vector(grid, 0.0),
        vector(0.0, -grid),
        vector(0.0, grid),
    ];

    let mut order: Vec<usize> = (0..layout.len()).collect();
    for iteration in 0..opts.slip_and_slide_iterations {
        let mut moved = false;
        run.rng.shuffle(&mut order);
        for &elem in &order {
            let start = layout.elems[elem].tx;
            let force = model.attractive(layout, elem).length();
            for step in steps {
                layout.elems[elem].tx.translate(step);
                if model.attractive(layout, elem).length() < force && !layout.overlaps_any(elem) {
                    moved = true;
                    break;
                }
                layout.elems[elem].tx = start;
            }
        }
        if !moved {
            tracing::trace!(iteration, "slip-and-slide settled");
            break;
        }
    }
}
