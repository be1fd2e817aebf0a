//! Force-directed solvers and the full evolve sequence run on every layout.

use crate::arrange::Layout;
use crate::force::{Attraction, ForceModel};
use crate::place::{Run, Stage};
use crate::post;
use crate::rng::XorShift64Star;
use sirenia_geom::Vector;

/// Solve, then tidy: the sequence applied to every connected group, the floating parts and the
/// block set.
pub(crate) fn evolve(layout: &mut Layout, run: &mut Run<'_>) {
    let attraction = Attraction::for_layout(layout.kind, run.opts);
    let model = ForceModel::calibrated(attraction, layout, &mut run.rng);

    optimizer_place(layout, &model, run);
    push_and_pull(layout, &model, run);
    post::jump(layout, &model, run);
    post::align(layout, run.opts);
    post::snap_all(layout, run.opts.grid.grid);
    post::remove_overlaps(layout, run);
    post::slip_and_slide(layout, &model, run);
}

/// One solver iteration. Each force is clamped so no element moves further than its own size,
/// then the mean force is removed so the group as a whole does not drift. Returns the
/// displacement applied to each element.
pub(crate) fn step(
    layout: &mut Layout,
    model: &ForceModel,
    alpha: f64,
    speed: f64,
    rng: &mut XorShift64Star,
) -> Vec<Vector> {
    let n = layout.len();
    if n == 0 {
        return Vec::new();
    }

    let mut forces: Vec<Vector> = (0..n)
        .map(|i| model.total(layout, i, alpha, rng))
        .collect();
    for (force, elem) in forces.iter_mut().zip(&layout.elems) {
        let limit = elem.size();
        let travel = force.length() * speed;
        if travel > limit {
            *force *= limit / travel;
        }
    }

    let drift = forces.iter().fold(Vector::zero(), |acc, f| acc + *f) / n as f64;
    forces
        .into_iter()
        .zip(layout.elems.iter_mut())
        .map(|(force, elem)| {
            let mv = (force - drift) * speed;
            elem.tx.translate(mv);
            mv
        })
        .collect()
}

/// Anneals from pure attraction to pure repulsion in `alpha_steps` equal steps, iterating each
/// step until every element's moving-average displacement is small next to its size.
/// Each element moves by force times speed, capped at its own size per iteration (see `step`).
pub(crate) fn push_and_pull(layout: &mut Layout, model: &ForceModel, run: &mut Run<'_>) {
    let opts = run.opts;
    if !opts.use_push_pull || layout.len() <= 1 {
        return;
    }

    let steps = opts.alpha_steps.max(1);
    for i in 0..=steps {
        let alpha = i as f64 / steps as f64;
        let stillness = if i == steps { 0.001 } else { 0.01 };

        let mut mv_avg = vec![Vector::zero(); layout.len()];
        // The first move seeds the average outright.
        let mut coef = 1.0;
        let mut settled = false;
        let mut iterations = 0;
        while iterations < opts.max_solver_iterations {
            iterations += 1;
            let moves = step(layout, model, alpha, opts.speed, &mut run.rng);
            for (avg, mv) in mv_avg.iter_mut().zip(&moves) {
                *avg = *avg * (1.0 - coef) + *mv * coef;
            }
            coef = 0.1;

            if mv_avg
                .iter()
                .zip(&layout.elems)
                .all(|(avg, elem)| avg.length() < stillness * elem.size())
            {
                settled = true;
                break;
            }
        }

        tracing::trace!(alpha, iterations, settled, "push-and-pull step");
        if !settled {
            run.degrade(
                Stage::PushPull,
                format!("alpha {alpha:.2} still moving after {iterations} iterations"),
            );
        }
    }
}

/// Bounded pattern search that minimises the summed force magnitude at ten alpha steps.
/// Runs ahead of push-and-pull when enabled.
pub(crate) fn optimizer_place(layout: &mut Layout, model: &ForceModel, run: &mut Run<'_>) {
    const STEPS: usize = 10;
    const MAX_EVALS: usize = 2000;
    const DIRS: [(f64, f64); 4] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

    let opts = run.opts;
    if !opts.use_optimizer || layout.len() <= 1 {
        return;
    }

    fn cost(layout: &Layout, model: &ForceModel, alpha: f64, rng: &mut XorShift64Star) -> f64 {
        (0..layout.len())
            .map(|i| model.total(layout, i, alpha, rng).length())
            .sum()
    }

    let min_h = (opts.grid.grid / 4.0).max(f64::EPSILON);
    for i in 0..=STEPS {
        let alpha = i as f64 / STEPS as f64;
        let mut h = layout
            .elems
            .iter()
            .map(|e| e.size())
            .fold(0.0f64, f64::max)
            / 2.0;
        let mut best = cost(layout, model, alpha, &mut run.rng);
        let mut evals = 1usize;

        while h >= min_h && evals < MAX_EVALS {
            let mut improved = false;
            for e in 0..layout.len() {
                for (dx, dy) in DIRS {
                    let saved = layout.elems[e].tx;
                    layout.elems[e].tx.translate(Vector::new(dx * h, dy * h));
                    let c = cost(layout, model, alpha, &mut run.rng);
                    evals += 1;
                    if c < best {
                        best = c;
                        improved = true;
                    } else {
                        layout.elems[e].tx = saved;
                    }
                }
            }
            if !improved {
                h /= 2.0;
            }
        }
        tracing::trace!(alpha, evals, cost = best, "optimizer step");
    }
}
