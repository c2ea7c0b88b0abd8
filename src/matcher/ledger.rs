//! The hypothesis ledger: a deduplicating, voting collection of candidate
//! correspondence sets.
//!
//! Each accepted seed produces a hypothesis carrying its vertex pair-list, the
//! fitted transform, and residual statistics. The same correspondence set is
//! routinely rediscovered from many different seeds; instead of storing
//! duplicates, the ledger merges them and counts votes — independent
//! rediscovery is a confidence signal used to break ties at selection time.

use std::collections::HashMap;

use crate::transform::SimilarityTransform;

/// A candidate correspondence set with its fitted transform.
#[derive(Debug, Clone)]
pub(crate) struct Hypothesis {
    /// `(reference_index, input_index)` vertex pairs in discovery order.
    pub pairs: Vec<(usize, usize)>,
    /// Transform fitted and validated for this correspondence.
    pub transform: SimilarityTransform,
    /// Number of seed vertices (`pairs.len()`).
    pub vertex_count: usize,
    /// Points matched in the final scoring pass of the fit.
    pub matched_count: usize,
    /// Weighted residual sum-of-squares over the matched points.
    pub sum_sq_residual: f64,
    /// How many times this correspondence set was independently discovered.
    pub votes: u32,
}

impl Hypothesis {
    /// Canonical content key: the pair-list as a set (sorted).
    fn key(&self) -> Vec<(usize, usize)> {
        let mut key = self.pairs.clone();
        key.sort_unstable();
        key
    }
}

/// Insertion-ordered hypothesis collection with content-based merge.
///
/// Owns all entries; created fresh for every top-level match call, so no state
/// survives across calls.
#[derive(Debug, Default)]
pub(crate) struct HypothesisLedger {
    entries: Vec<Hypothesis>,
    index: HashMap<Vec<(usize, usize)>, usize>,
}

impl HypothesisLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a hypothesis, merging with an existing entry if one has the same
    /// vertex count and the same pair-list as a set. On merge the earlier
    /// entry's transform and residuals are retained (first-writer-wins) and its
    /// vote count incremented.
    pub(crate) fn insert(&mut self, hypothesis: Hypothesis) {
        let key = hypothesis.key();
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].votes += 1;
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push(hypothesis);
        }
    }

    /// Best hypothesis: greatest vertex count, ties broken by greatest votes,
    /// remaining ties by insertion order (earliest wins).
    pub(crate) fn best(&self) -> Option<&Hypothesis> {
        let mut best: Option<&Hypothesis> = None;
        for h in &self.entries {
            let better = match best {
                None => true,
                Some(b) => {
                    h.vertex_count > b.vertex_count
                        || (h.vertex_count == b.vertex_count && h.votes > b.votes)
                }
            };
            if better {
                best = Some(h);
            }
        }
        best
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Greatest vertex count currently in the ledger (0 when empty). Used by
    /// the early-exit knob.
    pub(crate) fn max_vertex_count(&self) -> usize {
        self.entries.iter().map(|h| h.vertex_count).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyp(pairs: &[(usize, usize)], x0: f64) -> Hypothesis {
        Hypothesis {
            pairs: pairs.to_vec(),
            transform: SimilarityTransform {
                x0,
                ..SimilarityTransform::identity()
            },
            vertex_count: pairs.len(),
            matched_count: pairs.len(),
            sum_sq_residual: 0.0,
            votes: 1,
        }
    }

    #[test]
    fn identical_pair_sets_merge_regardless_of_order() {
        let mut ledger = HypothesisLedger::new();
        ledger.insert(hyp(&[(0, 1), (2, 3), (4, 5)], 1.0));
        ledger.insert(hyp(&[(4, 5), (0, 1), (2, 3)], 2.0));
        assert_eq!(ledger.len(), 1);

        let best = ledger.best().unwrap();
        assert_eq!(best.votes, 2);
        // First-writer-wins: the earlier transform is retained.
        assert_eq!(best.transform.x0, 1.0);
    }

    #[test]
    fn distinct_pair_sets_do_not_merge() {
        let mut ledger = HypothesisLedger::new();
        ledger.insert(hyp(&[(0, 1), (2, 3)], 0.0));
        ledger.insert(hyp(&[(0, 1), (2, 4)], 0.0));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn best_prefers_vertex_count_then_votes() {
        let mut ledger = HypothesisLedger::new();
        ledger.insert(hyp(&[(0, 0), (1, 1)], 1.0));
        ledger.insert(hyp(&[(0, 0), (1, 1)], 1.0)); // 2 vertices, 2 votes
        ledger.insert(hyp(&[(0, 0), (1, 1), (2, 2)], 2.0)); // 3 vertices, 1 vote
        assert_eq!(ledger.best().unwrap().vertex_count, 3);

        // Same vertex count: votes decide.
        let mut ledger = HypothesisLedger::new();
        ledger.insert(hyp(&[(0, 0), (1, 1), (2, 2)], 1.0));
        ledger.insert(hyp(&[(3, 3), (4, 4), (5, 5)], 2.0));
        ledger.insert(hyp(&[(3, 3), (4, 4), (5, 5)], 2.0));
        assert_eq!(ledger.best().unwrap().transform.x0, 2.0);
    }

    #[test]
    fn full_tie_keeps_earliest_entry() {
        let mut ledger = HypothesisLedger::new();
        ledger.insert(hyp(&[(0, 0), (1, 1)], 1.0));
        ledger.insert(hyp(&[(2, 2), (3, 3)], 2.0));
        assert_eq!(ledger.best().unwrap().transform.x0, 1.0);
    }

    #[test]
    fn empty_ledger_has_no_best() {
        assert!(HypothesisLedger::new().best().is_none());
        assert!(HypothesisLedger::new().is_empty());
    }
}
