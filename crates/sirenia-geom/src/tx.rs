use crate::{BBox, Point, Transform, Vector, point};
use serde::{Deserialize, Serialize};

/// Quarter-turn orientation of a placed element: an optional horizontal mirror followed by
/// `rotation` clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub rotation: u8,
    #[serde(default)]
    pub mirrored: bool,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        rotation: 0,
        mirrored: false,
    };

    /// All eight orientations: four rotations, then the same four after one mirror.
    pub const ALL: [Orientation; 8] = [
        Orientation::new(0, false),
        Orientation::new(1, false),
        Orientation::new(2, false),
        Orientation::new(3, false),
        Orientation::new(0, true),
        Orientation::new(1, true),
        Orientation::new(2, true),
        Orientation::new(3, true),
    ];

    pub const fn new(rotation: u8, mirrored: bool) -> Self {
        Self {
            rotation: rotation % 4,
            mirrored,
        }
    }

    /// Clockwise rotation in degrees.
    pub fn degrees(self) -> f64 {
        f64::from(self.rotation) * 90.0
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Placement transform: translation plus a quarter-turn rotation and optional mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tx(Transform);

impl Default for Tx {
    fn default() -> Self {
        Self::identity()
    }
}

impl Tx {
    pub fn identity() -> Self {
        Self(Transform::identity())
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self(Transform::translation(dx, dy))
    }

    /// A pure clockwise quarter turn about the origin: `(x, y) -> (y, -x)`.
    pub fn rot_cw_90() -> Self {
        Self(Transform::new(0.0, -1.0, 1.0, 0.0, 0.0, 0.0))
    }

    /// A pure horizontal mirror about the y axis: `(x, y) -> (-x, y)`.
    pub fn flip_x() -> Self {
        Self(Transform::new(-1.0, 0.0, 0.0, 1.0, 0.0, 0.0))
    }

    pub fn from_orientation(o: Orientation) -> Self {
        let mut tx = Self::identity();
        if o.mirrored {
            tx = tx.then(&Self::flip_x());
        }
        for _ in 0..o.rotation {
            tx = tx.then(&Self::rot_cw_90());
        }
        tx
    }

    pub fn as_transform(&self) -> &Transform {
        &self.0
    }

    /// Composition that applies `self` first and `other` second.
    pub fn then(&self, other: &Tx) -> Tx {
        Tx(self.0.then(&other.0))
    }

    pub fn apply(&self, pt: Point) -> Point {
        self.0.transform_point(pt)
    }

    pub fn apply_vector(&self, v: Vector) -> Vector {
        self.0.transform_vector(v)
    }

    pub fn apply_bbox(&self, bbox: &BBox) -> BBox {
        bbox.transform(self)
    }

    /// Where the local origin lands.
    pub fn origin(&self) -> Point {
        point(self.0.m31, self.0.m32)
    }

    /// Moves the local origin to `pt` without touching rotation or mirroring.
    pub fn move_to(&mut self, pt: Point) {
        self.0.m31 = pt.x;
        self.0.m32 = pt.y;
    }

    /// Appends a translation. Only the translation terms change, so grid-multiple moves of a
    /// grid-aligned transform stay exact.
    pub fn translate(&mut self, v: Vector) {
        self.0.m31 += v.x;
        self.0.m32 += v.y;
    }

    /// Adjusts the translation so that `local` maps exactly onto `target`.
    pub fn place_point(&mut self, local: Point, target: Point) {
        let linear = self.linear().apply(local);
        self.0.m31 = target.x - linear.x;
        self.0.m32 = target.y - linear.y;
    }

    /// The rotation/mirror part with no translation.
    pub fn linear(&self) -> Tx {
        let mut t = self.0;
        t.m31 = 0.0;
        t.m32 = 0.0;
        Tx(t)
    }

    /// Rotates a quarter turn clockwise about `pivot` (given in the transformed space).
    pub fn rotate_cw_about(&mut self, pivot: Point) {
        *self = self
            .then(&Tx::translation(-pivot.x, -pivot.y))
            .then(&Tx::rot_cw_90())
            .then(&Tx::translation(pivot.x, pivot.y));
    }

    /// Mirrors horizontally about the vertical line through `pivot`.
    pub fn flip_x_about(&mut self, pivot: Point) {
        *self = self
            .then(&Tx::translation(-pivot.x, -pivot.y))
            .then(&Tx::flip_x())
            .then(&Tx::translation(pivot.x, pivot.y));
    }

    /// The quarter-turn orientation of the linear part. Returns `None` only for transforms that
    /// were not built from quarter turns and mirrors.
    pub fn orientation(&self) -> Option<Orientation> {
        let t = &self.0;
        Orientation::ALL.into_iter().find(|o| {
            let c = Tx::from_orientation(*o).0;
            c.m11 == t.m11 && c.m12 == t.m12 && c.m21 == t.m21 && c.m22 == t.m22
        })
    }

    pub fn is_finite(&self) -> bool {
        let t = &self.0;
        [t.m11, t.m12, t.m21, t.m22, t.m31, t.m32]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl std::ops::Mul for Tx {
    type Output = Tx;

    fn mul(self, rhs: Tx) -> Tx {
        self.then(&rhs)
    }
}

impl std::ops::MulAssign for Tx {
    fn mul_assign(&mut self, rhs: Tx) {
        *self = self.then(&rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector;

    #[test]
    fn quarter_turn_maps_x_axis_to_negative_y() {
        let p = Tx::rot_cw_90().apply(point(1.0, 0.0));
        assert_eq!(p, point(0.0, -1.0));
        let p = Tx::rot_cw_90().apply(point(0.0, 1.0));
        assert_eq!(p, point(1.0, 0.0));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let mut tx = Tx::translation(150.0, -50.0);
        for _ in 0..4 {
            tx.rotate_cw_about(point(175.0, 25.0));
        }
        assert_eq!(tx, Tx::translation(150.0, -50.0));
    }

    #[test]
    fn grid_translations_stay_exact() {
        let mut tx = Tx::from_orientation(Orientation::new(3, true));
        for _ in 0..1000 {
            tx.translate(vector(50.0, -50.0));
        }
        assert_eq!(tx.origin(), point(50_000.0, -50_000.0));
        assert_eq!(tx.orientation(), Some(Orientation::new(3, true)));
    }

    #[test]
    fn rotation_about_pivot_keeps_pivot_fixed() {
        let mut tx = Tx::translation(10.0, 20.0);
        let pivot = point(60.0, 70.0);
        let before = tx.apply(point(50.0, 50.0));
        assert_eq!(before, pivot);
        tx.rotate_cw_about(pivot);
        assert_eq!(tx.apply(point(50.0, 50.0)), pivot);
        tx.flip_x_about(pivot);
        assert_eq!(tx.apply(point(50.0, 50.0)), pivot);
    }

    #[test]
    fn place_point_lands_exactly_on_target() {
        let mut tx = Tx::from_orientation(Orientation::new(1, false));
        tx.translate(vector(13.7, -2.25));
        tx.place_point(point(100.0, 50.0), point(400.0, 250.0));
        assert_eq!(tx.apply(point(100.0, 50.0)), point(400.0, 250.0));
    }

    #[test]
    fn mul_applies_left_operand_first() {
        let a = Tx::translation(10.0, 0.0);
        let b = Tx::rot_cw_90();
        assert_eq!((a * b).apply(point(0.0, 0.0)), point(0.0, -10.0));
        assert_eq!((b * a).apply(point(0.0, 0.0)), point(10.0, 0.0));
    }

    #[test]
    fn orientation_round_trips_through_transform() {
        for o in Orientation::ALL {
            assert_eq!(Tx::from_orientation(o).orientation(), Some(o));
        }
    }
}
