//! # starmatch
//!
//! A **point-pattern matching and similarity registration engine** for star-field
//! centroid lists, written in Rust.
//!
//! Given two unordered sets of 2-D point positions — "reference" and "input" star
//! centroids extracted from two images — `starmatch` finds the best correspondence
//! between subsets of the two sets and the best-fitting similarity transform
//! (one scale, one rotation, optional mirror, translation) mapping the reference
//! onto the input, with no prior knowledge of point ordering or which points
//! correspond.
//!
//! ## Features
//!
//! - **Order-free matching** — no initial correspondence or alignment guess required
//! - **Geometric-invariant pruning** — distance ratios and triangle shape coordinates
//!   reject false seeds cheaply before any fitting is attempted
//! - **Robust** — an M-estimator with Hampel's redescending influence function keeps
//!   outlier correspondences from corrupting the fit
//! - **Two search strategies** — pair-seeded for dense fields, point-seeded for sparse
//!   fields down to a single star, or automatic selection by point count
//! - **Deterministic** — exhaustive enumeration by default, with explicit early-exit
//!   and seed-budget knobs that preserve reproducibility for a given budget
//!
//! ## Example
//!
//! ```
//! use starmatch::{match_point_sets, MatchConfig, PointSet, Strategy};
//!
//! let reference = PointSet::from_xy(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (7.0, 7.0)]);
//! // The same field imaged at 2x scale and shifted by (5, -3)
//! let input = PointSet::from_xy(&[(5.0, -3.0), (25.0, -3.0), (5.0, 17.0), (19.0, 11.0)]);
//!
//! let config = MatchConfig {
//!     seed_size: 3,
//!     max_offset: 50.0,
//!     strategy: Strategy::Standard,
//!     ..Default::default()
//! };
//!
//! let result = match_point_sets(&reference, &input, &config).unwrap();
//! assert_eq!(result.matched_count, 4);
//! assert!((result.transform.scale() - 2.0).abs() < 1e-6);
//! assert!((result.transform.x0 - 5.0).abs() < 1e-6);
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Seed enumeration** — hypothesize a correspondence from a pair of reference
//!    points and a pair of input points (standard strategy), or from a single
//!    point on each side (simple strategy)
//! 2. **Polygon growth** — extend the seed vertex-by-vertex through nearest-neighbor
//!    order, accepting only candidates whose normalized center distance and triangle
//!    shape coordinates match the reference side
//! 3. **Fit & validate** — gate on robust distance-ratio and angle-ratio invariants,
//!    then solve the 4-parameter weighted normal equations by Cholesky decomposition
//!    and refine through global association passes
//! 4. **Voting** — accepted hypotheses are merged into a deduplicating ledger; the
//!    same correspondence rediscovered from another seed increments its vote count
//! 5. **Assignment** — the best hypothesis (most vertices, then most votes) drives a
//!    greedy unique-claim nearest-neighbor assignment producing the final
//!    cross-reference
//!
//! Star detection (pixels → centroids), catalog lookup, image warping, and WCS
//! fitting are external collaborators: this crate consumes two point lists plus a
//! configuration and produces a transform plus a correspondence map.

pub mod matcher;
mod point;
mod transform;

pub use matcher::{match_point_sets, MatchConfig, MatchError, MatchResult, Strategy};
pub use point::{Point, PointSet};
pub use transform::SimilarityTransform;
