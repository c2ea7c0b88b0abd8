//! Simple search strategy: seed hypotheses from single points.
//!
//! For sparse fields, or fields with too few stars to afford pair seeds. Every
//! reference point is tried against every input point as the seed
//! correspondence; the seed's first-neighbor pairing fixes the distance
//! normalization, and growth proceeds with distance-ratio invariants only — a
//! 1-point seed has no defined orientation, so no angle test is possible.
//!
//! Unlike the standard strategy, hypotheses that stall below `seed_size`
//! vertices are still fitted and recorded, down to the degenerate single-point
//! hypothesis (translation-only, valid immediately) when either working set
//! holds just one star.

use tracing::debug;

use crate::point::{dist2, neighbor_order, Point};

use super::fit::{find_transform, FitFlavor};
use super::growth::{grow_polygon, GrowthScratch, SeedFrame};
use super::ledger::{Hypothesis, HypothesisLedger};
use super::MatchConfig;

/// Enumerate all point seeds, growing and fitting each, pushing accepted
/// hypotheses into the ledger.
pub(crate) fn search(
    refs: &[Point],
    ins: &[Point],
    config: &MatchConfig,
    ledger: &mut HypothesisLedger,
) {
    let mut attempts: u64 = 0;
    let mut accepted: u64 = 0;

    // Degenerate fields: no neighbors exist, so hypotheses are single pairs.
    if refs.len() == 1 || ins.len() == 1 {
        for i in 0..refs.len() {
            for j in 0..ins.len() {
                if let Some(budget) = config.max_seed_attempts {
                    if attempts >= budget {
                        break;
                    }
                }
                attempts += 1;
                if let Ok(fit) = find_transform(&[(i, j)], refs, ins, config, FitFlavor::Simple) {
                    accepted += 1;
                    ledger.insert(Hypothesis {
                        pairs: vec![(i, j)],
                        transform: fit.transform,
                        vertex_count: 1,
                        matched_count: fit.matched_count,
                        sum_sq_residual: fit.sum_sq_residual,
                        votes: 1,
                    });
                }
            }
        }
        debug!(attempts, accepted, "simple search complete (single-point field)");
        return;
    }

    let mut scratch = GrowthScratch::default();
    let mut vertices: Vec<(usize, usize)> = Vec::with_capacity(config.seed_size);
    let mut ref_order: Vec<usize> = Vec::new();
    let mut in_order: Vec<usize> = Vec::new();
    let mut sort: Vec<(f64, usize)> = Vec::new();

    for i in 0..refs.len() {
        for j in 0..ins.len() {
            neighbor_order(refs, refs[i], &[i], &mut ref_order, &mut sort);
            neighbor_order(ins, ins[j], &[j], &mut in_order, &mut sort);

            // The first matched neighbor pair sets the scale; enumerate the
            // possibilities rather than guessing.
            for &k in &ref_order {
                let ref_scale2 = dist2(refs[i], refs[k]);
                if ref_scale2 <= 0.0 {
                    continue;
                }
                for &l in &in_order {
                    if config.early_exit && ledger.max_vertex_count() >= config.seed_size {
                        debug!(attempts, accepted, "simple search stopped early");
                        return;
                    }
                    if let Some(budget) = config.max_seed_attempts {
                        if attempts >= budget {
                            debug!(attempts, accepted, "simple search budget exhausted");
                            return;
                        }
                    }
                    attempts += 1;

                    let in_scale2 = dist2(ins[j], ins[l]);
                    if in_scale2 <= 0.0 {
                        continue;
                    }
                    let frame = SeedFrame {
                        ref_center: refs[i],
                        in_center: ins[j],
                        ref_scale2,
                        in_scale2,
                    };

                    vertices.clear();
                    vertices.push((i, j));
                    vertices.push((k, l));
                    grow_polygon(refs, ins, &frame, &mut vertices, config.seed_size, &mut scratch);

                    if let Ok(fit) =
                        find_transform(&vertices, refs, ins, config, FitFlavor::Simple)
                    {
                        accepted += 1;
                        ledger.insert(Hypothesis {
                            pairs: vertices.clone(),
                            transform: fit.transform,
                            vertex_count: vertices.len(),
                            matched_count: fit.matched_count,
                            sum_sq_residual: fit.sum_sq_residual,
                            votes: 1,
                        });
                    }
                }
            }
        }
    }

    debug!(
        attempts,
        accepted,
        hypotheses = ledger.len(),
        "simple search complete"
    );
}
