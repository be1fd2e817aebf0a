use crate::{Point, Tx, Vector, point, vector};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. The empty box (`min > max`) is the identity for [`BBox::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            min: point(f64::INFINITY, f64::INFINITY),
            max: point(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box holding both corners, in any order.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: point(a.x.min(b.x), a.y.min(b.y)),
            max: point(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(pts: I) -> Self {
        let mut bbox = Self::empty();
        for p in pts {
            bbox.add_point(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn add_point(&mut self, p: Point) {
        self.min = point(self.min.x.min(p.x), self.min.y.min(p.y));
        self.max = point(self.max.x.max(p.x), self.max.y.max(p.y));
    }

    pub fn add(&mut self, other: &BBox) {
        *self = self.union(other);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        BBox {
            min: point(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: point(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Strict overlap test: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn w(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max.x - self.min.x
        }
    }

    pub fn h(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max.y - self.min.y
        }
    }

    pub fn area(&self) -> f64 {
        self.w() * self.h()
    }

    pub fn ctr(&self) -> Point {
        if self.is_empty() {
            return Point::origin();
        }
        point(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn ll(&self) -> Point {
        self.min
    }

    pub fn lr(&self) -> Point {
        point(self.max.x, self.min.y)
    }

    pub fn ul(&self) -> Point {
        point(self.min.x, self.max.y)
    }

    pub fn ur(&self) -> Point {
        self.max
    }

    /// Grows (or shrinks, for negative components) every side by `pad`.
    pub fn resize(&self, pad: Vector) -> BBox {
        if self.is_empty() {
            return *self;
        }
        BBox {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn translate(&self, v: Vector) -> BBox {
        if self.is_empty() {
            return *self;
        }
        BBox {
            min: self.min + v,
            max: self.max + v,
        }
    }

    /// Box around the four transformed corners. Exact for quarter-turn transforms.
    pub fn transform(&self, tx: &Tx) -> BBox {
        if self.is_empty() {
            return *self;
        }
        BBox::from_points([self.ll(), self.lr(), self.ul(), self.ur()].map(|p| tx.apply(p)))
    }

    /// Minimal axis-aligned distance between two boxes (zero when touching or overlapping).
    pub fn gap(&self, other: &BBox) -> Vector {
        let dx = (other.min.x - self.max.x).max(self.min.x - other.max.x).max(0.0);
        let dy = (other.min.y - self.max.y).max(self.min.y - other.max.y).max(0.0);
        vector(dx, dy)
    }
}
