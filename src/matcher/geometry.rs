//! Invariant geometry helpers.
//!
//! Pure functions computing quantities that are unchanged by the fitted
//! transform class (uniform scale, rotation, optional mirror, translation):
//! distance ratios, vector angles, and triangle shape coordinates. These are
//! the basis of all cheap rejection tests in the seed-growth search.

use crate::point::{dist2, Point};

/// Angle between two vectors as `asin(|u×v| / (|u||v|))`, in radians.
///
/// Domain-clamped against rounding. Returns the sentinel `−1.0` if either
/// vector is zero, which callers treat as "no defined angle".
pub(crate) fn angle_between(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let nu = (ux * ux + uy * uy).sqrt();
    let nv = (vx * vx + vy * vy).sqrt();
    if nu <= 0.0 || nv <= 0.0 {
        return -1.0;
    }
    let cross = (ux * vy - uy * vx).abs();
    (cross / (nu * nv)).clamp(-1.0, 1.0).asin()
}

/// Triangle shape coordinates `(u, v)` for the triangle `{l, j, k}`.
///
/// The three squared pairwise distances are sorted descending; `u` and `v` are
/// the ratios of the two smaller distances to the largest. Both lie in `(0, 1]`
/// and are invariant under similarity transforms, mirrored or not.
///
/// Returns `None` for a degenerate triangle whose largest edge is zero.
pub(crate) fn triangle_uv(l: usize, j: usize, k: usize, pts: &[Point]) -> Option<(f64, f64)> {
    let mut d = [
        dist2(pts[l], pts[j]),
        dist2(pts[l], pts[k]),
        dist2(pts[j], pts[k]),
    ];
    d.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    if d[0] <= 0.0 {
        return None;
    }
    Some(((d[1] / d[0]).sqrt(), (d[2] / d[0]).sqrt()))
}

/// Orientation sign of the triangle `(p0, p1, p2)`: the sign of the cross
/// product of its two edge vectors. Zero for collinear points.
pub(crate) fn orientation_sign(p0: Point, p1: Point, p2: Point) -> f64 {
    let cross = (p1.x - p0.x) * (p2.y - p0.y) - (p1.y - p0.y) * (p2.x - p0.x);
    if cross > 0.0 {
        1.0
    } else if cross < 0.0 {
        -1.0
    } else {
        0.0
    }
}
