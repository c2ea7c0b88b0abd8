//! Shared polygon growth: extending a seed correspondence vertex-by-vertex.
//!
//! Both search strategies grow the same way once seeded; they differ only in
//! how the seed and its distance normalization are chosen. Growth walks the
//! reference points in nearest-neighbor order from the seed center and, for
//! each, looks for an input point that survives two invariant filters:
//!
//! 1. its normalized squared distance from the input center lies within ±50%
//!    of the reference point's normalized squared distance, and
//! 2. the triangle it forms with the previous two accepted vertices has shape
//!    coordinates within 0.0005 of the corresponding reference triangle.
//!
//! Among the surviving candidates the one with the smallest shape distance is
//! accepted. Reference points with no surviving candidate are skipped, not
//! fatal: growth continues until the target vertex count is reached or the
//! neighbor order is exhausted.

use crate::point::{dist2, neighbor_order, Point};

use super::geometry::triangle_uv;

/// Relative half-width of the normalized center-distance window.
const DISTANCE_WINDOW: f64 = 0.5;
/// Maximum Euclidean distance between `(u, v)` shape coordinates.
const UV_TOLERANCE: f64 = 0.0005;

/// Reusable scratch buffers, sized by the working subsets and reused across
/// seeds. Never shared between concurrent growth passes.
#[derive(Debug, Default)]
pub(crate) struct GrowthScratch {
    ref_order: Vec<usize>,
    in_order: Vec<usize>,
    used_in: Vec<bool>,
    sort: Vec<(f64, usize)>,
    ref_exclude: Vec<usize>,
    in_exclude: Vec<usize>,
}

/// Geometry of one seed: per-side center and squared-distance normalization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeedFrame {
    pub ref_center: Point,
    pub in_center: Point,
    pub ref_scale2: f64,
    pub in_scale2: f64,
}

/// Extend `vertices` up to `target` pairs.
///
/// `vertices` must hold at least two seed pairs on entry (the shape test needs
/// two previous vertices). Accepted pairs are appended in growth order.
pub(crate) fn grow_polygon(
    refs: &[Point],
    ins: &[Point],
    frame: &SeedFrame,
    vertices: &mut Vec<(usize, usize)>,
    target: usize,
    scratch: &mut GrowthScratch,
) {
    debug_assert!(vertices.len() >= 2);
    if frame.ref_scale2 <= 0.0 || frame.in_scale2 <= 0.0 {
        return;
    }

    scratch.ref_exclude.clear();
    scratch.in_exclude.clear();
    for &(r, i) in vertices.iter() {
        scratch.ref_exclude.push(r);
        scratch.in_exclude.push(i);
    }

    neighbor_order(
        refs,
        frame.ref_center,
        &scratch.ref_exclude,
        &mut scratch.ref_order,
        &mut scratch.sort,
    );
    neighbor_order(
        ins,
        frame.in_center,
        &scratch.in_exclude,
        &mut scratch.in_order,
        &mut scratch.sort,
    );

    scratch.used_in.clear();
    scratch.used_in.resize(ins.len(), false);
    for &i in &scratch.in_exclude {
        scratch.used_in[i] = true;
    }

    for idx in 0..scratch.ref_order.len() {
        if vertices.len() >= target {
            break;
        }
        let r = scratch.ref_order[idx];

        let expected = dist2(refs[r], frame.ref_center) / frame.ref_scale2;
        let (p2, p1) = (vertices[vertices.len() - 2], vertices[vertices.len() - 1]);
        let ref_uv = match triangle_uv(r, p2.0, p1.0, refs) {
            Some(uv) => uv,
            None => continue,
        };

        let mut best: Option<(f64, usize)> = None;
        for &l in &scratch.in_order {
            if scratch.used_in[l] {
                continue;
            }
            let nd = dist2(ins[l], frame.in_center) / frame.in_scale2;
            if (nd - expected).abs() > DISTANCE_WINDOW * expected {
                continue;
            }
            let in_uv = match triangle_uv(l, p2.1, p1.1, ins) {
                Some(uv) => uv,
                None => continue,
            };
            let duv = ((ref_uv.0 - in_uv.0).powi(2) + (ref_uv.1 - in_uv.1).powi(2)).sqrt();
            if duv > UV_TOLERANCE {
                continue;
            }
            if best.map_or(true, |(d, _)| duv < d) {
                best = Some((duv, l));
            }
        }

        if let Some((_, l)) = best {
            scratch.used_in[l] = true;
            vertices.push((r, l));
        }
    }
}
