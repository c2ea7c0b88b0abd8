//! Transform fitting and validation for one candidate correspondence.
//!
//! This is the shared fit-and-validate routine both search strategies call once
//! a grown polygon reaches its target size:
//!
//! 1. **Invariant gate** (3+ vertices): robust distance-ratio and, for the
//!    standard strategy, angle-ratio consistency checks; a seed that fails is
//!    abandoned before any fitting.
//! 2. **Zoom & mirror**: scale prior from the robust mean of pairwise distance
//!    ratios; mirror sign from the orientation of the first three vertices.
//! 3. **Zero-iteration**: a provisional transform from the seed vertices alone —
//!    a weighted solve for the standard strategy, a plain translation average
//!    (bounded by `max_offset`) for the simple strategy.
//! 4. **Association passes**: map every working reference point, associate each
//!    with its nearest input point within tolerance, re-solve over the
//!    associated pairs, tighten the tolerance, then score.
//!
//! Rejections here are not errors — they prune the search tree. Only the
//! orchestrator's final ledger query can produce a caller-visible failure.

use tracing::trace;

use crate::point::{dist2, Point};
use crate::transform::SimilarityTransform;

use super::geometry::{angle_between, orientation_sign};
use super::robust::robust_mean;
use super::solver::MomentAccumulator;
use super::MatchConfig;

/// Maximum relative deviation of any pairwise distance ratio from the robust
/// mean ratio.
const RATIO_SPREAD_TOL: f64 = 0.2;
/// Maximum robust deviation of the distance ratios, relative to their mean.
const RATIO_DEV_TOL: f64 = 0.05;
/// Maximum deviation of the robust mean angle ratio from 1.
const ANGLE_RATIO_TOL: f64 = 0.2;
/// Absolute floor for the angle-ratio 3-sigma consistency test, so exact data
/// with zero robust deviation survives floating-point jitter.
const ANGLE_SIGMA_FLOOR: f64 = 1e-6;
/// Residual-tolerance floor in squared pixels.
const TOLERANCE_FLOOR: f64 = 1e-4;

/// Which strategy's validation rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitFlavor {
    /// Pair-seeded search: angle gate active, at least 3 associated pairs.
    Standard,
    /// Point-seeded search: no angle gate, translation-only zero-iteration,
    /// at least 1 associated pair.
    Simple,
}

/// Why a candidate was pruned. Not a caller-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitReject {
    /// Failed the invariant gate.
    Invariant,
    /// Residual tolerance exceeded `max_offset²`.
    Tolerance,
    /// Too few associated pairs to accept or re-solve.
    TooFew,
    /// The normal-equations solve was singular or failed its sanity check.
    Singular,
}

/// A validated fit.
#[derive(Debug, Clone)]
pub(crate) struct FitOutcome {
    pub transform: SimilarityTransform,
    pub matched_count: usize,
    pub sum_sq_residual: f64,
}

/// Residual tolerance from a mean squared residual, clamped to the floor.
#[inline]
pub(crate) fn residual_tolerance(clip_sigma: f64, mean_sq_residual: f64) -> f64 {
    (3.0 * clip_sigma * clip_sigma * mean_sq_residual).max(TOLERANCE_FLOOR)
}

/// Nearest input point to `p`: `(index, squared distance)`.
pub(crate) fn nearest_input(p: Point, ins: &[Point]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (l, &q) in ins.iter().enumerate() {
        let d2 = dist2(p, q);
        if best.map_or(true, |(_, b)| d2 < b) {
            best = Some((l, d2));
        }
    }
    best
}

/// One global association pass: every reference point is mapped through the
/// transform and paired with its nearest input point if within `tol`.
fn associate(
    refs: &[Point],
    ins: &[Point],
    transform: &SimilarityTransform,
    tol: f64,
) -> Vec<(usize, usize, f64)> {
    let mut pairs = Vec::new();
    for (r, &p) in refs.iter().enumerate() {
        if let Some((l, d2)) = nearest_input(transform.apply(p), ins) {
            if d2 <= tol {
                pairs.push((r, l, d2));
            }
        }
    }
    pairs
}

/// Pairwise distance ratios (input over reference) across the vertex list.
fn distance_ratios(vertices: &[(usize, usize)], refs: &[Point], ins: &[Point]) -> Vec<f64> {
    let mut ratios = Vec::with_capacity(vertices.len() * (vertices.len() - 1) / 2);
    for i in 0..vertices.len() {
        for j in (i + 1)..vertices.len() {
            let dr2 = dist2(refs[vertices[i].0], refs[vertices[j].0]);
            let di2 = dist2(ins[vertices[i].1], ins[vertices[j].1]);
            if dr2 > 0.0 && di2 > 0.0 {
                ratios.push((di2 / dr2).sqrt());
            }
        }
    }
    ratios
}

/// Angle ratios (input over reference) over consecutive vertex triples.
fn angle_ratios(vertices: &[(usize, usize)], refs: &[Point], ins: &[Point]) -> Vec<f64> {
    let mut ratios = Vec::new();
    for w in vertices.windows(3) {
        let (r0, r1, r2) = (refs[w[0].0], refs[w[1].0], refs[w[2].0]);
        let (i0, i1, i2) = (ins[w[0].1], ins[w[1].1], ins[w[2].1]);
        let ar = angle_between(r1.x - r0.x, r1.y - r0.y, r2.x - r0.x, r2.y - r0.y);
        let ai = angle_between(i1.x - i0.x, i1.y - i0.y, i2.x - i0.x, i2.y - i0.y);
        if ar > 0.0 && ai >= 0.0 {
            ratios.push(ai / ar);
        }
    }
    ratios
}

/// The invariant gate for 3+ vertex candidates. `zoom`/`zoom_dev` are the
/// robust statistics of the pairwise distance ratios.
fn invariant_gate(
    vertices: &[(usize, usize)],
    refs: &[Point],
    ins: &[Point],
    ratios: &[f64],
    zoom: f64,
    zoom_dev: f64,
    flavor: FitFlavor,
) -> Result<(), FitReject> {
    for &r in ratios {
        if (r / zoom - 1.0).abs() > RATIO_SPREAD_TOL {
            return Err(FitReject::Invariant);
        }
    }
    if zoom_dev > RATIO_DEV_TOL * zoom {
        return Err(FitReject::Invariant);
    }

    // A 1-point seed has no defined orientation, so the simple strategy never
    // tests angles.
    if flavor == FitFlavor::Standard {
        let angles = angle_ratios(vertices, refs, ins);
        if let Some((loc, dev)) = robust_mean(&angles) {
            if (loc - 1.0).abs() > ANGLE_RATIO_TOL {
                return Err(FitReject::Invariant);
            }
            if (loc - 1.0).abs() > 3.0 * dev + ANGLE_SIGMA_FLOOR {
                return Err(FitReject::Invariant);
            }
        }
    }
    Ok(())
}

/// Fit and validate a candidate vertex list against the full working sets.
///
/// `refs` and `ins` are the working subsets; vertex pairs index into them.
pub(crate) fn find_transform(
    vertices: &[(usize, usize)],
    refs: &[Point],
    ins: &[Point],
    config: &MatchConfig,
    flavor: FitFlavor,
) -> Result<FitOutcome, FitReject> {
    let n = vertices.len();
    debug_assert!(n >= 1);
    let max_offset2 = config.max_offset * config.max_offset;

    // Degenerate single-point hypothesis: translation-only, valid immediately.
    if n == 1 {
        let (r, l) = vertices[0];
        let t = SimilarityTransform::translation(ins[l].x - refs[r].x, ins[l].y - refs[r].y);
        return Ok(FitOutcome {
            transform: t,
            matched_count: 1,
            sum_sq_residual: 0.0,
        });
    }

    // ── Zoom prior and invariant gate ──
    let ratios = distance_ratios(vertices, refs, ins);
    let (zoom, zoom_dev) = robust_mean(&ratios).ok_or(FitReject::Invariant)?;
    if zoom <= 0.0 || !zoom.is_finite() {
        return Err(FitReject::Invariant);
    }
    if n >= 3 {
        invariant_gate(vertices, refs, ins, &ratios, zoom, zoom_dev, flavor)?;
    }

    let mirror = if n >= 3 {
        let sr = orientation_sign(refs[vertices[0].0], refs[vertices[1].0], refs[vertices[2].0]);
        let si = orientation_sign(ins[vertices[0].1], ins[vertices[1].1], ins[vertices[2].1]);
        if sr * si < 0.0 {
            -1.0
        } else {
            1.0
        }
    } else {
        1.0
    };

    // ── Zero-iteration: provisional transform from the seed alone ──
    let provisional = match flavor {
        FitFlavor::Standard => {
            let mut acc = MomentAccumulator::new(zoom, mirror);
            for &(r, l) in vertices {
                acc.add(refs[r], ins[l]);
            }
            acc.solve().map_err(|_| FitReject::Singular)?
        }
        FitFlavor::Simple => {
            let inv_n = 1.0 / n as f64;
            let tx = vertices.iter().map(|&(r, l)| ins[l].x - refs[r].x).sum::<f64>() * inv_n;
            let ty = vertices.iter().map(|&(r, l)| ins[l].y - refs[r].y).sum::<f64>() * inv_n;
            let t = SimilarityTransform::translation(tx, ty);
            for &(r, l) in vertices {
                if dist2(t.apply(refs[r]), ins[l]) > max_offset2 {
                    return Err(FitReject::Tolerance);
                }
            }
            t
        }
    };

    // ── Provisional tolerance from the seed residuals ──
    let mean_seed = vertices
        .iter()
        .map(|&(r, l)| dist2(provisional.apply(refs[r]), ins[l]))
        .sum::<f64>()
        / n as f64;
    let tol = residual_tolerance(config.clip_sigma, mean_seed);
    if tol > max_offset2 {
        return Err(FitReject::Tolerance);
    }

    // ── Global association and refinement ──
    let min_pairs = match flavor {
        FitFlavor::Standard => 3,
        FitFlavor::Simple => 1,
    };
    let pairs = associate(refs, ins, &provisional, tol);
    if pairs.len() < min_pairs {
        return Err(FitReject::TooFew);
    }

    let refined = if flavor == FitFlavor::Standard || pairs.len() >= 3 {
        let mut acc = MomentAccumulator::new(zoom, mirror);
        for &(r, l, _) in &pairs {
            acc.add(refs[r], ins[l]);
        }
        acc.solve().map_err(|_| FitReject::Singular)?
    } else {
        // Too few pairs to determine scale and rotation; the translation-only
        // transform stands.
        provisional
    };

    let mean_refined = pairs
        .iter()
        .map(|&(r, l, _)| dist2(refined.apply(refs[r]), ins[l]))
        .sum::<f64>()
        / pairs.len() as f64;
    let tol = residual_tolerance(config.clip_sigma, mean_refined);
    if tol > max_offset2 {
        return Err(FitReject::Tolerance);
    }

    // ── Final scoring pass ──
    let scored = associate(refs, ins, &refined, tol);
    if scored.len() < min_pairs {
        return Err(FitReject::TooFew);
    }
    let sum_sq = scored.iter().map(|&(_, _, d2)| d2).sum::<f64>();

    trace!(
        vertices = n,
        matched = scored.len(),
        sum_sq,
        "candidate accepted"
    );

    Ok(FitOutcome {
        transform: refined,
        matched_count: scored.len(),
        sum_sq_residual: sum_sq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::SimilarityTransform;
    use approx::assert_relative_eq;

    fn config() -> MatchConfig {
        MatchConfig {
            seed_size: 3,
            max_offset: 50.0,
            ..Default::default()
        }
    }

    #[test]
    fn standard_fit_recovers_exact_transform() {
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(7.0, 7.0),
        ];
        let truth = SimilarityTransform::from_parts(2.0, 0.0, false, 5.0, -3.0);
        let ins: Vec<Point> = refs.iter().map(|&p| truth.apply(p)).collect();

        let vertices = [(0, 0), (1, 1), (2, 2)];
        let out = find_transform(&vertices, &refs, &ins, &config(), FitFlavor::Standard).unwrap();
        assert_eq!(out.matched_count, 4);
        assert_relative_eq!(out.transform.a, 2.0, epsilon = 1e-9);
        assert_relative_eq!(out.transform.x0, 5.0, epsilon = 1e-9);
        assert_relative_eq!(out.transform.y0, -3.0, epsilon = 1e-9);
        assert!(out.sum_sq_residual < 1e-12);
    }

    #[test]
    fn scrambled_correspondence_fails_the_gate() {
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(7.0, 7.0),
        ];
        let ins: Vec<Point> = refs.to_vec();
        // Pairing distinct shapes: distance ratios cannot be consistent.
        let vertices = [(0, 3), (1, 0), (2, 1), (3, 2)];
        let result = find_transform(&vertices, &refs, &ins, &config(), FitFlavor::Standard);
        assert!(result.is_err());
    }

    #[test]
    fn simple_fit_translation_only() {
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(3.0, 8.0),
        ];
        let ins: Vec<Point> = refs
            .iter()
            .map(|&p| Point::new(p.x + 4.0, p.y - 2.5))
            .collect();
        let vertices = [(0, 0), (1, 1)];
        let out = find_transform(&vertices, &refs, &ins, &config(), FitFlavor::Simple).unwrap();
        assert_eq!(out.matched_count, 3);
        assert_relative_eq!(out.transform.x0, 4.0, epsilon = 1e-9);
        assert_relative_eq!(out.transform.y0, -2.5, epsilon = 1e-9);
    }

    #[test]
    fn simple_translation_beyond_max_offset_is_rejected() {
        let refs = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        // Inconsistent displacements: residuals about the average exceed max_offset.
        let ins = [Point::new(0.0, 200.0), Point::new(10.0, -200.0)];
        let result = find_transform(&[(0, 0), (1, 1)], &refs, &ins, &config(), FitFlavor::Simple);
        assert!(matches!(result, Err(FitReject::Tolerance)));
    }

    #[test]
    fn single_vertex_is_valid_immediately() {
        let refs = [Point::new(2.0, 3.0)];
        let ins = [Point::new(5.0, 1.0)];
        let out = find_transform(&[(0, 0)], &refs, &ins, &config(), FitFlavor::Simple).unwrap();
        assert_eq!(out.matched_count, 1);
        assert_eq!(out.sum_sq_residual, 0.0);
        assert_relative_eq!(out.transform.x0, 3.0);
        assert_relative_eq!(out.transform.y0, -2.0);
        assert_eq!(out.transform.scale(), 1.0);
    }

    #[test]
    fn mirrored_vertices_fit_with_negative_mirror() {
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(6.0, 4.0),
        ];
        let truth = SimilarityTransform {
            mirror: -1.0,
            ..SimilarityTransform::identity()
        };
        let ins: Vec<Point> = refs.iter().map(|&p| truth.apply(p)).collect();
        let vertices = [(0, 0), (1, 1), (2, 2)];
        let out = find_transform(&vertices, &refs, &ins, &config(), FitFlavor::Standard).unwrap();
        assert!(out.transform.is_mirrored());
        assert_eq!(out.matched_count, 4);
        assert_relative_eq!(out.transform.a, 1.0, epsilon = 1e-9);
        assert_relative_eq!(out.transform.b, 0.0, epsilon = 1e-9);
    }
}
