//! The matching engine: configuration, error taxonomy, orchestration, and the
//! final correspondence assignment.
//!
//! The orchestration is a single pure function over two point sets and a
//! configuration:
//!
//! 1. Validate the configuration (fail fast, nothing attempted on bad input).
//! 2. Resolve the strategy (`Auto` is a pure point-count rule).
//! 3. Run the seed-growth search, filling a fresh hypothesis ledger.
//! 4. Select the best hypothesis and derive the final residual tolerance.
//! 5. Greedy unique-claim assignment of input points to reference points,
//!    in reference index order (order dependence is intentional and kept for
//!    reproducibility).
//!
//! All state is local to one invocation; nothing survives across calls.

mod fit;
mod geometry;
mod growth;
mod ledger;
mod robust;
mod simple;
mod solver;
mod standard;

use thiserror::Error;
use tracing::debug;

use crate::point::{dist2, PointSet};
use crate::transform::SimilarityTransform;

use fit::residual_tolerance;
use ledger::HypothesisLedger;

/// When resolving [`Strategy::Auto`], fields whose smaller working set has
/// fewer than `seed_size` times this factor points use the simple strategy.
const AUTO_SPARSE_FACTOR: usize = 2;

// ── Strategy selection ──────────────────────────────────────────────────────

/// Which seed-growth search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Pair-seeded search with distance and angle invariants. Needs at least
    /// `seed_size` points on both sides; best for dense fields.
    Standard,
    /// Point-seeded search with distance invariants only. Works down to a
    /// single point per set; best for sparse fields.
    Simple,
    /// Choose by point count: simple for sparse working sets, standard
    /// otherwise. Resolved once at call start.
    #[default]
    Auto,
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling a match attempt.
///
/// Validated once per call; invalid values fail fast with
/// [`MatchError::InvalidConfig`] before either point set is examined.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Vertices required to accept a hypothesis (3 to 19).
    pub seed_size: usize,
    /// Working-subset cap per point set, at most 999 and greater than
    /// `seed_size`. Callers pre-sort by brightness so truncation keeps the
    /// brightest stars.
    pub max_points: usize,
    /// Sigma-clipping factor for the residual tolerance (> 0).
    pub clip_sigma: f64,
    /// Maximum allowed offset, in pixels, between a mapped reference point and
    /// its claimed input point (> 0). Bounds every residual tolerance.
    pub max_offset: f64,
    /// Seed-growth strategy.
    pub strategy: Strategy,
    /// Stop seed enumeration once any hypothesis has reached `seed_size`
    /// vertices. Exhaustive search (the default) considers every seed and is
    /// the reference behavior; early exit is a performance knob that remains
    /// deterministic for a given input.
    pub early_exit: bool,
    /// Upper bound on the number of seeds grown, for callers that need a hard
    /// compute budget. `None` (the default) means unbounded. Deterministic for
    /// a given budget; hypotheses found before exhaustion are still used.
    pub max_seed_attempts: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed_size: 5,
            max_points: 200,
            clip_sigma: 3.0,
            max_offset: 10.0,
            strategy: Strategy::Auto,
            early_exit: false,
            max_seed_attempts: None,
        }
    }
}

impl MatchConfig {
    /// Validate all parameters, as performed at the start of every match call.
    pub fn validate(&self) -> Result<(), MatchError> {
        if !(3..=19).contains(&self.seed_size) {
            return Err(MatchError::InvalidConfig("seed_size must be in [3, 19]"));
        }
        if self.max_points <= self.seed_size || self.max_points > 999 {
            return Err(MatchError::InvalidConfig(
                "max_points must be in (seed_size, 999]",
            ));
        }
        if !(self.clip_sigma > 0.0) || !self.clip_sigma.is_finite() {
            return Err(MatchError::InvalidConfig("clip_sigma must be positive"));
        }
        if !(self.max_offset > 0.0) || !self.max_offset.is_finite() {
            return Err(MatchError::InvalidConfig("max_offset must be positive"));
        }
        Ok(())
    }
}

// ── Error taxonomy ──────────────────────────────────────────────────────────

/// Failure modes of a match attempt.
///
/// `SingularSystem` is local to one hypothesis — the search drops that
/// hypothesis and continues — so callers only ever observe the other three
/// variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A configuration parameter is out of range; nothing was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Either set has fewer usable points than the chosen strategy requires.
    #[error("not enough points: strategy needs {needed}, smaller set has {got}")]
    InsufficientPoints { needed: usize, got: usize },
    /// The normal-equations system had a non-positive Cholesky pivot, or the
    /// fitted solution failed its sanity check.
    #[error("normal equations are singular or degenerate")]
    SingularSystem,
    /// The search completed without a single acceptable hypothesis.
    #[error("no consistent correspondence found")]
    MatchNotFound,
}

// ── Result ──────────────────────────────────────────────────────────────────

/// A successful match: the fitted transform plus the correspondence map.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Best-fitting similarity transform mapping reference onto input.
    pub transform: SimilarityTransform,
    /// Number of reference points with a claimed input point.
    pub matched_count: usize,
    /// Sum of squared residuals over the claimed pairs, in squared pixels.
    pub sum_sq_residual: f64,
    /// Per reference point (full set, original order): the claimed input point
    /// index, or `None` if unassigned. Claims are unique — each input point is
    /// assigned to at most one reference point.
    pub cross_reference: Vec<Option<usize>>,
}

// ── Orchestration ───────────────────────────────────────────────────────────

/// Match `input` against `reference`: find the best correspondence between
/// subsets of the two point sets and the best-fitting similarity transform.
///
/// Pure function of its arguments; synchronous and stateless across calls.
/// See the [crate documentation](crate) for the algorithm and a worked
/// example.
pub fn match_point_sets(
    reference: &PointSet,
    input: &PointSet,
    config: &MatchConfig,
) -> Result<MatchResult, MatchError> {
    config.validate()?;

    let refs = reference.working(config.max_points);
    let ins = input.working(config.max_points);
    let smaller = refs.len().min(ins.len());

    let strategy = match config.strategy {
        Strategy::Auto => {
            if smaller < AUTO_SPARSE_FACTOR * config.seed_size {
                Strategy::Simple
            } else {
                Strategy::Standard
            }
        }
        s => s,
    };

    let needed = match strategy {
        Strategy::Standard => config.seed_size,
        _ => 1,
    };
    if smaller < needed {
        return Err(MatchError::InsufficientPoints {
            needed,
            got: smaller,
        });
    }

    debug!(
        ?strategy,
        reference = refs.len(),
        input = ins.len(),
        seed_size = config.seed_size,
        "starting match"
    );

    let mut ledger = HypothesisLedger::new();
    match strategy {
        Strategy::Standard => standard::search(refs, ins, config, &mut ledger),
        _ => simple::search(refs, ins, config, &mut ledger),
    }

    if ledger.is_empty() {
        debug!("search produced no hypotheses");
        return Err(MatchError::MatchNotFound);
    }
    let best = ledger.best().ok_or(MatchError::MatchNotFound)?;
    debug!(
        vertex_count = best.vertex_count,
        votes = best.votes,
        matched = best.matched_count,
        hypotheses = ledger.len(),
        "selected best hypothesis"
    );

    // ── Final assignment: greedy, order-dependent, unique-claim ──
    let tol = residual_tolerance(
        config.clip_sigma,
        best.sum_sq_residual / best.matched_count.max(1) as f64,
    );

    let mut cross_reference: Vec<Option<usize>> = vec![None; reference.len()];
    let mut claimed = vec![false; ins.len()];
    let mut matched_count = 0usize;
    let mut sum_sq_residual = 0.0;

    for (r, &p) in refs.iter().enumerate() {
        let mapped = best.transform.apply(p);
        let mut nearest: Option<(usize, f64)> = None;
        for (l, &q) in ins.iter().enumerate() {
            if claimed[l] {
                continue;
            }
            let d2 = dist2(mapped, q);
            if nearest.map_or(true, |(_, b)| d2 < b) {
                nearest = Some((l, d2));
            }
        }
        if let Some((l, d2)) = nearest {
            if d2 <= tol {
                claimed[l] = true;
                cross_reference[r] = Some(l);
                matched_count += 1;
                sum_sq_residual += d2;
            }
        }
    }

    if matched_count == 0 {
        return Err(MatchError::MatchNotFound);
    }

    debug!(matched_count, sum_sq_residual, "match complete");

    Ok(MatchResult {
        transform: best.transform,
        matched_count,
        sum_sq_residual,
        cross_reference,
    })
}
