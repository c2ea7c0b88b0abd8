//! The fitted similarity transform: scale, rotation, optional mirror, translation.

use crate::point::Point;

/// A similarity transform mapping reference coordinates onto input coordinates.
///
/// The linear part is one scale `s` and one rotation `θ` shared by both axes,
/// folded into `a = s·cosθ` and `b = s·sinθ`, plus an optional axis reflection
/// `mirror ∈ {+1, −1}` and an independent translation `(x0, y0)`. This is not a
/// full affine map: there is no shear and no per-axis scale.
///
/// Forward mapping:
///
/// ```text
/// x' = x0 + a·x + mirror·b·y
/// y' = y0 − b·x + mirror·a·y
/// ```
///
/// The determinant of the linear part is `mirror·(a² + b²)`, so `mirror = −1`
/// is a true orientation reversal. Identity is `a=1, b=0, mirror=1, x0=y0=0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    /// `s·cosθ` — scaled rotation cosine.
    pub a: f64,
    /// `s·sinθ` — scaled rotation sine.
    pub b: f64,
    /// Reflection sign: `+1.0` (proper rotation) or `−1.0` (mirrored).
    pub mirror: f64,
    /// Translation along x, in pixels.
    pub x0: f64,
    /// Translation along y, in pixels.
    pub y0: f64,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SimilarityTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            mirror: 1.0,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// A pure translation by `(x0, y0)`.
    pub fn translation(x0: f64, y0: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            mirror: 1.0,
            x0,
            y0,
        }
    }

    /// Build a transform from scale, rotation angle (radians), mirror flag, and
    /// translation.
    pub fn from_parts(scale: f64, rotation: f64, mirrored: bool, x0: f64, y0: f64) -> Self {
        Self {
            a: scale * rotation.cos(),
            b: scale * rotation.sin(),
            mirror: if mirrored { -1.0 } else { 1.0 },
            x0,
            y0,
        }
    }

    /// The uniform scale factor `s = √(a² + b²)`.
    pub fn scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// The rotation angle `θ = atan2(b, a)` in radians.
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    /// Whether the transform reverses orientation.
    pub fn is_mirrored(&self) -> bool {
        self.mirror < 0.0
    }

    /// Map a reference point into input coordinates.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.x0 + self.a * p.x + self.mirror * self.b * p.y,
            y: self.y0 - self.b * p.x + self.mirror * self.a * p.y,
        }
    }

    /// The inverse transform (input → reference), or `None` for a degenerate
    /// zero-scale transform.
    ///
    /// The alignment collaborator warps the reference frame's pixel grid, which
    /// needs the mapping in the opposite direction from the fit.
    pub fn inverse(&self) -> Option<Self> {
        let s2 = self.a * self.a + self.b * self.b;
        if s2 <= 0.0 || !s2.is_finite() {
            return None;
        }
        // Linear part L = [[a, m·b], [−b, m·a]]; L⁻¹ = [[a, −b], [m·b, m·a]] / s².
        // That is again a similarity with a' = a/s², b' = −m·b/s², same mirror.
        let inv = Self {
            a: self.a / s2,
            b: -self.mirror * self.b / s2,
            mirror: self.mirror,
            x0: 0.0,
            y0: 0.0,
        };
        let t = inv.apply(Point::new(self.x0, self.y0));
        Some(Self {
            x0: -t.x,
            y0: -t.y,
            ..inv
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_maps_points_to_themselves() {
        let t = SimilarityTransform::identity();
        let p = Point::new(3.5, -2.0);
        assert_eq!(t.apply(p), p);
        assert_eq!(t.scale(), 1.0);
        assert_eq!(t.rotation(), 0.0);
        assert!(!t.is_mirrored());
    }

    #[test]
    fn from_parts_round_trips_scale_and_rotation() {
        let t = SimilarityTransform::from_parts(2.5, 0.3, false, 1.0, -2.0);
        assert_relative_eq!(t.scale(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(t.rotation(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn mirror_negative_reverses_orientation() {
        // a=1, b=0, m=−1 is a reflection about the x-axis.
        let t = SimilarityTransform {
            mirror: -1.0,
            ..SimilarityTransform::identity()
        };
        let p = t.apply(Point::new(2.0, 3.0));
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, -3.0);
    }

    #[test]
    fn inverse_undoes_forward_mapping() {
        for &mirrored in &[false, true] {
            let t = SimilarityTransform::from_parts(1.7, -0.8, mirrored, 12.0, -5.5);
            let inv = t.inverse().unwrap();
            let p = Point::new(4.0, 9.0);
            let back = inv.apply(t.apply(p));
            assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn inverse_of_degenerate_transform_is_none() {
        let t = SimilarityTransform {
            a: 0.0,
            b: 0.0,
            ..SimilarityTransform::identity()
        };
        assert!(t.inverse().is_none());
    }
}
