//! Attractive and repulsive forces on placement elements.

use crate::arrange::{Layout, LayoutKind};
use crate::options::{AttractiveKind, PlaceOptions};
use crate::rng::XorShift64Star;
use sirenia_geom::{BBox, Point, Vector, vector};

/// A way of turning an element's anchor/pull points into an attractive force.
pub(crate) trait ForceStrategy {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector;
}

/// Sum of every anchor-to-pull vector.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DistanceForce {
    pub(crate) pt_to_pt_mult: f64,
    pub(crate) normalize: bool,
}

impl ForceStrategy for DistanceForce {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        let e = &layout.elems[elem];
        let mut total = Vector::zero();
        let mut nets = 0usize;

        for link in &e.links {
            if link.anchors.is_empty() || link.pulls.is_empty() {
                continue;
            }
            let mult = if link.pulls.len() <= 1 {
                self.pt_to_pt_mult
            } else {
                1.0
            };

            let mut net_force = Vector::zero();
            let mut terms = 0usize;
            for anchor in &link.anchors {
                let anchor = e.world(*anchor);
                for pull in &link.pulls {
                    net_force += layout.pull_point(pull) - anchor;
                    terms += 1;
                }
            }
            if self.normalize {
                net_force /= terms.max(1) as f64;
            }
            total += net_force * mult;
            nets += 1;
        }

        if self.normalize {
            total /= nets.max(1) as f64;
        }
        total
    }
}

/// Like [`DistanceForce`], but each net's pull is capped at the mean anchor-to-pull distance so
/// heavily connected parts cannot leap over their neighbours.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DistanceAvgForce {
    pub(crate) pt_to_pt_mult: f64,
    pub(crate) normalize: bool,
    pub(crate) fanout_attenuation: bool,
}

impl ForceStrategy for DistanceAvgForce {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        let e = &layout.elems[elem];
        let mut total = Vector::zero();
        let mut nets = 0usize;

        for link in &e.links {
            if link.anchors.is_empty() || link.pulls.is_empty() {
                continue;
            }
            let fanout = link.pulls.len();
            let mult = if fanout <= 1 { self.pt_to_pt_mult } else { 1.0 };

            let mut net_force = Vector::zero();
            let mut dist_sum = 0.0;
            let mut terms = 0usize;
            for anchor in &link.anchors {
                let anchor = e.world(*anchor);
                for pull in &link.pulls {
                    let d = layout.pull_point(pull) - anchor;
                    net_force += d;
                    dist_sum += d.length();
                    terms += 1;
                }
            }
            if self.fanout_attenuation {
                net_force /= (fanout * fanout) as f64;
            }
            if self.normalize {
                net_force /= terms as f64;
            }

            let avg_dist = dist_sum / terms as f64;
            let mag = net_force.length();
            if mag > avg_dist && mag > 0.0 {
                net_force *= avg_dist / mag;
            }

            total += net_force * mult;
            nets += 1;
        }

        if self.normalize {
            total /= nets.max(1) as f64;
        }
        total
    }
}

/// Unit step in whichever axis direction most shrinks the anchor/pull bounding boxes and the
/// distance between their centroids.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BboxForce;

impl ForceStrategy for BboxForce {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        const DIRS: [(f64, f64); 4] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

        let e = &layout.elems[elem];
        let mut cost_chg = [0.0f64; 4];

        for link in &e.links {
            if link.anchors.is_empty() || link.pulls.is_empty() {
                continue;
            }
            let anchor_pts: Vec<Point> = link.anchors.iter().map(|a| e.world(*a)).collect();
            let pull_pts: Vec<Point> = link.pulls.iter().map(|p| layout.pull_point(p)).collect();
            let anchor_bbox = BBox::from_points(anchor_pts.iter().copied());
            let pull_bbox = BBox::from_points(pull_pts.iter().copied());
            let anchor_ctr = mean(&anchor_pts);
            let pull_ctr = mean(&pull_pts);

            let total = anchor_bbox.union(&pull_bbox);
            let hw = total.w() + total.h();
            let dist = (anchor_ctr - pull_ctr).length();

            for (chg, (dx, dy)) in cost_chg.iter_mut().zip(DIRS) {
                let step = vector(dx, dy);
                let moved = anchor_bbox.translate(step).union(&pull_bbox);
                let hw_chg = moved.w() + moved.h() - hw;
                let dist_chg = (anchor_ctr + step - pull_ctr).length() - dist;
                *chg += hw_chg + dist_chg;
            }
        }

        let mut best = 0;
        for (i, chg) in cost_chg.iter().enumerate() {
            if *chg < cost_chg[best] {
                best = i;
            }
        }
        if cost_chg[best] >= 0.0 {
            return Vector::zero();
        }
        vector(DIRS[best].0, DIRS[best].1)
    }
}

/// Vectors from this element's anchor centroid on each net to the anchor centroids of the other
/// pulling elements on the same net.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CentroidForce {
    pub(crate) normalize: bool,
    pub(crate) fanout_attenuation: bool,
}

impl ForceStrategy for CentroidForce {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        let e = &layout.elems[elem];
        let mut total = Vector::zero();
        let mut nets = 0usize;

        for link in &e.links {
            let Some(ctr) = link.centroid else {
                continue;
            };
            let attenuation = if self.fanout_attenuation && link.net_parts > 3 {
                0.01
            } else {
                1.0
            };
            let anchor_ctr = e.world(ctr);

            let mut pullers: Vec<usize> = link.pulls.iter().map(|p| p.elem).collect();
            pullers.sort_unstable();
            pullers.dedup();
            for q in pullers {
                let other = &layout.elems[q];
                if let Some(pull_ctr) = other.link(link.key).and_then(|l| l.centroid) {
                    total += (other.world(pull_ctr) - anchor_ctr) * attenuation;
                }
            }
            nets += 1;
        }

        if self.normalize {
            total /= nets.max(1) as f64;
        }
        total
    }
}

/// Pairwise attraction weighted by similarity, for elements that share no nets.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimilarityForce;

impl ForceStrategy for SimilarityForce {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        let e = &layout.elems[elem];
        let mut total = Vector::zero();
        for link in &e.links {
            let Some(anchor) = link.anchors.first() else {
                continue;
            };
            let anchor = e.world(*anchor);
            for pull in &link.pulls {
                total += (layout.pull_point(pull) - anchor) * pull.weight;
            }
        }
        total
    }
}

/// The closed set of attractive strategies.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Attraction {
    Distance(DistanceForce),
    DistanceAvg(DistanceAvgForce),
    Bbox(BboxForce),
    Centroid(CentroidForce),
    Similarity(SimilarityForce),
}

impl Attraction {
    /// Nets drive connected groups with the configured strategy; everything else is pulled
    /// together by similarity.
    pub(crate) fn for_layout(kind: LayoutKind, opts: &PlaceOptions) -> Self {
        if kind != LayoutKind::Connected {
            return Self::Similarity(SimilarityForce);
        }
        match opts.attractive_force {
            AttractiveKind::Distance => Self::Distance(DistanceForce {
                pt_to_pt_mult: opts.pt_to_pt_mult,
                normalize: opts.normalize,
            }),
            AttractiveKind::DistanceAvg => Self::DistanceAvg(DistanceAvgForce {
                pt_to_pt_mult: opts.pt_to_pt_mult,
                normalize: opts.normalize,
                fanout_attenuation: opts.fanout_attenuation,
            }),
            AttractiveKind::Bbox => Self::Bbox(BboxForce),
            AttractiveKind::Centroid => Self::Centroid(CentroidForce {
                normalize: opts.normalize,
                fanout_attenuation: opts.fanout_attenuation,
            }),
        }
    }
}

impl ForceStrategy for Attraction {
    fn compute_force(&self, layout: &Layout, elem: usize) -> Vector {
        match self {
            Self::Distance(f) => f.compute_force(layout, elem),
            Self::DistanceAvg(f) => f.compute_force(layout, elem),
            Self::Bbox(f) => f.compute_force(layout, elem),
            Self::Centroid(f) => f.compute_force(layout, elem),
            Self::Similarity(f) => f.compute_force(layout, elem),
        }
    }
}

/// Sum, over every element whose placement box overlaps this one, of the shortest axis-aligned
/// move that would clear the overlap. A jitter of up to half a unit per axis keeps exactly
/// stacked elements from cancelling out.
pub(crate) fn overlap_force(layout: &Layout, elem: usize, rng: &mut XorShift64Star) -> Vector {
    let bbox = layout.elems[elem].bbox();
    let mut total = Vector::zero();

    for (j, other) in layout.elems.iter().enumerate() {
        if j == elem {
            continue;
        }
        let other = other.bbox();
        if !bbox.intersects(&other) {
            continue;
        }

        let mut jitter = || vector(rng.next_centered(), rng.next_centered());
        let mv_left = other.ll() - bbox.lr() + jitter();
        let mv_right = other.lr() - bbox.ll() + jitter();
        let mv_up = other.ul() - bbox.ll() + jitter();
        let mv_down = other.ll() - bbox.ul() + jitter();

        let dx = if mv_left.x.abs() < mv_right.x.abs() {
            mv_left.x
        } else {
            mv_right.x
        };
        let dy = if mv_up.y.abs() < mv_down.y.abs() {
            mv_up.y
        } else {
            mv_down.y
        };
        total += if dx.abs() < dy.abs() {
            vector(dx, 0.0)
        } else {
            vector(0.0, dy)
        };
    }
    total
}

/// Attraction blended with overlap repulsion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForceModel {
    pub(crate) attraction: Attraction,
    /// Brings attractive magnitudes in line with repulsive ones.
    pub(crate) scale: f64,
}

impl ForceModel {
    /// Measures the attraction of a spread-out placement against the repulsion of a fully
    /// collapsed one and picks the scale that equalises them. The layout's transforms are
    /// restored afterwards.
    pub(crate) fn calibrated(
        attraction: Attraction,
        layout: &mut Layout,
        rng: &mut XorShift64Star,
    ) -> Self {
        let saved = layout.txs();

        layout.scatter(rng);
        let attr: f64 = (0..layout.len())
            .map(|i| attraction.compute_force(layout, i).length())
            .sum();

        layout.collapse();
        let rep: f64 = (0..layout.len())
            .map(|i| overlap_force(layout, i, rng).length())
            .sum();

        layout.restore_txs(&saved);

        let scale = if attr > f64::EPSILON && rep > f64::EPSILON {
            rep / attr
        } else {
            1.0
        };
        tracing::trace!(attr, rep, scale, "force scale");
        Self { attraction, scale }
    }

    pub(crate) fn attractive(&self, layout: &Layout, elem: usize) -> Vector {
        self.attraction.compute_force(layout, elem) * self.scale
    }

    /// `scale * (1 - alpha) * attractive + alpha * repulsive`.
    pub(crate) fn total(
        &self,
        layout: &Layout,
        elem: usize,
        alpha: f64,
        rng: &mut XorShift64Star,
    ) -> Vector {
        let mut force = Vector::zero();
        if alpha < 1.0 {
            force += self.attractive(layout, elem) * (1.0 - alpha);
        }
        if alpha > 0.0 {
            force += overlap_force(layout, elem, rng) * alpha;
        }
        force
    }
}

fn mean(pts: &[Point]) -> Point {
    let sum = pts
        .iter()
        .fold(Vector::zero(), |acc, p| acc + p.to_vector());
    (sum / pts.len().max(1) as f64).to_point()
}
