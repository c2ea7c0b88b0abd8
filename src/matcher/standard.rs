//! Standard search strategy: seed hypotheses from point pairs.
//!
//! Every unordered pair of reference points is tried against every ordered
//! pair of input points (ordered, so both correspondence assignments of the
//! pair are covered). Each seed defines a frame — the pair midpoint as center,
//! the pair's squared length as distance normalization — in which the polygon
//! is grown to `seed_size` vertices and handed to the fit. Designed for
//! reasonably dense fields where pair seeds are plentiful.

use tracing::debug;

use crate::point::{dist2, Point};

use super::fit::{find_transform, FitFlavor};
use super::growth::{grow_polygon, GrowthScratch, SeedFrame};
use super::ledger::{Hypothesis, HypothesisLedger};
use super::MatchConfig;

/// Enumerate all pair seeds, growing and fitting each, pushing accepted
/// hypotheses into the ledger.
pub(crate) fn search(
    refs: &[Point],
    ins: &[Point],
    config: &MatchConfig,
    ledger: &mut HypothesisLedger,
) {
    let mut scratch = GrowthScratch::default();
    let mut vertices: Vec<(usize, usize)> = Vec::with_capacity(config.seed_size);
    let mut attempts: u64 = 0;
    let mut accepted: u64 = 0;

    for i1 in 0..refs.len() {
        for i2 in (i1 + 1)..refs.len() {
            let ref_scale2 = dist2(refs[i1], refs[i2]);
            if ref_scale2 <= 0.0 {
                continue;
            }
            let ref_center = Point::new(
                0.5 * (refs[i1].x + refs[i2].x),
                0.5 * (refs[i1].y + refs[i2].y),
            );

            for j1 in 0..ins.len() {
                for j2 in 0..ins.len() {
                    if j1 == j2 {
                        continue;
                    }
                    if config.early_exit && ledger.max_vertex_count() >= config.seed_size {
                        debug!(attempts, accepted, "standard search stopped early");
                        return;
                    }
                    if let Some(budget) = config.max_seed_attempts {
                        if attempts >= budget {
                            debug!(attempts, accepted, "standard search budget exhausted");
                            return;
                        }
                    }
                    attempts += 1;

                    let in_scale2 = dist2(ins[j1], ins[j2]);
                    if in_scale2 <= 0.0 {
                        continue;
                    }
                    let frame = SeedFrame {
                        ref_center,
                        in_center: Point::new(
                            0.5 * (ins[j1].x + ins[j2].x),
                            0.5 * (ins[j1].y + ins[j2].y),
                        ),
                        ref_scale2,
                        in_scale2,
                    };

                    vertices.clear();
                    vertices.push((i1, j1));
                    vertices.push((i2, j2));
                    grow_polygon(refs, ins, &frame, &mut vertices, config.seed_size, &mut scratch);
                    if vertices.len() < config.seed_size {
                        continue;
                    }

                    if let Ok(fit) =
                        find_transform(&vertices, refs, ins, config, FitFlavor::Standard)
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
        "standard search complete"
    );
}
