#![forbid(unsafe_code)]

//! Geometry kernel for schematic placement.
//!
//! Coordinates follow the row-vector convention used throughout `sirenia`: a point is mapped
//! by `tx.apply(pt)`, and `a.then(&b)` (also written `a * b`) applies `a` first. Rotations are
//! restricted to quarter turns so every linear part of a [`Tx`] holds only `0` and `±1`, which
//! keeps grid-aligned coordinates exact under composition.

mod bbox;
mod tx;

pub use bbox::BBox;
pub use tx::{Orientation, Tx};

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// Rounds each coordinate to the nearest multiple of `grid`.
pub fn snap_to_grid(pt: Point, grid: f64) -> Point {
    if !(grid.is_finite() && grid > 0.0) {
        return pt;
    }
    point((pt.x / grid).round() * grid, (pt.y / grid).round() * grid)
}

/// True when both coordinates are multiples of `grid` (within `eps`).
pub fn is_on_grid(pt: Point, grid: f64, eps: f64) -> bool {
    let snapped = snap_to_grid(pt, grid);
    (snapped.x - pt.x).abs() <= eps && (snapped.y - pt.y).abs() <= eps
}

/// Unit-length copy of `v`, or the zero vector when `v` has no length.
pub fn norm(v: Vector) -> Vector {
    let len = v.length();
    if len == 0.0 || !len.is_finite() {
        return Vector::zero();
    }
    v / len
}

/// Scalar cross product (`a.x * b.y - a.y * b.x`), used for torque.
pub fn xprod(a: Vector, b: Vector) -> f64 {
    a.cross(b)
}

/// Sign of `v` as `-1`, `0` or `1`.
pub fn sgn(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
