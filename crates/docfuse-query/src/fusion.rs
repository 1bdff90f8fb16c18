//! Weighted score fusion of the two sub-index rankings.

use std::collections::HashMap;

use docfuse_core::{ChunkId, FuseError, FusedResult, RankedResult, Result};

/// Relative weight of each sub-index in the fused score.
///
/// A configuration surface, not a hardcoded constant: any non-negative
/// pair summing to 1 is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f32,
    pub dense: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            dense: 0.5,
        }
    }
}

impl FusionWeights {
    pub fn new(lexical: f32, dense: f32) -> Result<Self> {
        let weights = Self { lexical, dense };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lexical < 0.0 || self.dense < 0.0 {
            return Err(FuseError::config("fusion weights must be non-negative"));
        }
        if (self.lexical + self.dense - 1.0).abs() > 1e-6 {
            return Err(FuseError::config(format!(
                "fusion weights must sum to 1.0, got {}",
                self.lexical + self.dense
            )));
        }
        Ok(())
    }
}

/// Fuse the two sub-index rankings into one, returning at most `k` results.
///
/// Each list's scores are min-max normalized to [0, 1] independently, then
/// combined as `w_lex * norm_lex + w_dense * norm_dense` over the union of
/// chunk ids. Absence from one list contributes 0 for that component only;
/// a chunk found by a single retriever is not zeroed overall. Ties are
/// broken by first appearance, lexical list before dense, so repeated calls
/// over the same inputs return identical orderings.
///
/// Two empty inputs produce an empty output: a valid "no relevant content"
/// result, not an error.
pub fn weighted_score_fusion(
    lexical: &[RankedResult],
    dense: &[RankedResult],
    weights: FusionWeights,
    k: usize,
) -> Vec<FusedResult> {
    let norm_lexical = min_max_normalize(lexical);
    let norm_dense = min_max_normalize(dense);

    // Union of ids, remembering the order each id first appeared.
    let mut first_seen: HashMap<&ChunkId, usize> = HashMap::new();
    let mut order: Vec<&ChunkId> = Vec::new();
    for result in lexical.iter().chain(dense.iter()) {
        first_seen.entry(&result.chunk_id).or_insert_with(|| {
            order.push(&result.chunk_id);
            order.len() - 1
        });
    }

    let mut fused: Vec<(usize, FusedResult)> = order
        .into_iter()
        .map(|id| {
            let lex = norm_lexical.get(id).copied().unwrap_or(0.0);
            let den = norm_dense.get(id).copied().unwrap_or(0.0);
            (
                first_seen[id],
                FusedResult {
                    chunk_id: id.clone(),
                    fused_score: weights.lexical * lex + weights.dense * den,
                },
            )
        })
        .collect();

    fused.sort_by(|a, b| {
        b.1.fused_score
            .partial_cmp(&a.1.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    fused.truncate(k);

    fused.into_iter().map(|(_, result)| result).collect()
}

/// Min-max normalize a ranked list to [0, 1].
///
/// An empty list yields an empty map. When every score is equal (including
/// a single-element list) all entries normalize to 1.0: each of them is the
/// list's best match.
fn min_max_normalize(results: &[RankedResult]) -> HashMap<&ChunkId, f32> {
    if results.is_empty() {
        return HashMap::new();
    }
    let min = results.iter().map(|r| r.score).fold(f32::INFINITY, f32::min);
    let max = results
        .iter()
        .map(|r| r.score)
        .fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    results
        .iter()
        .map(|r| {
            let norm = if range > 0.0 {
                (r.score - min) / range
            } else {
                1.0
            };
            (&r.chunk_id, norm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ChunkId {
        ChunkId::from_string(name)
    }

    fn ranked(ids_scores: &[(&str, f32)]) -> Vec<RankedResult> {
        ids_scores
            .iter()
            .enumerate()
            .map(|(i, (name, score))| RankedResult {
                chunk_id: id(name),
                score: *score,
                rank: i as u32 + 1,
            })
            .collect()
    }

    #[test]
    fn test_both_empty_returns_empty() {
        let fused = weighted_score_fusion(&[], &[], FusionWeights::default(), 5);
        assert!(fused.is_empty());
    }

    #[test]
    fn test_single_list_passthrough_order() {
        let lexical = ranked(&[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let fused = weighted_score_fusion(&lexical, &[], FusionWeights::default(), 5);
        assert_eq!(fused[0].chunk_id, id("a"));
        assert_eq!(fused[2].chunk_id, id("c"));
    }

    #[test]
    fn test_chunk_in_both_lists_wins() {
        // "c" tops both lists; "a" and "b" each appear in one.
        let lexical = ranked(&[("c", 5.0), ("a", 2.0)]);
        let dense = ranked(&[("c", 0.9), ("b", 0.4)]);
        let fused = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 3);
        assert_eq!(fused[0].chunk_id, id("c"));
        assert!((fused[0].fused_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_apple_banana_scenario() {
        // Corpus: A "apple pie recipe", B "banana smoothie",
        // C "apple banana salad"; query "apple banana", k=2.
        // Both retrievers score C highest because it matches both terms.
        let lexical = ranked(&[("C", 2.1), ("A", 1.0), ("B", 0.9)]);
        let dense = ranked(&[("C", 0.82), ("A", 0.41), ("B", 0.40)]);
        let fused = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 2);

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].chunk_id, id("C"));
    }

    #[test]
    fn test_missing_component_scores_zero_not_penalized() {
        // "b" is dense-only; its lexical component is 0 but its dense
        // component survives at half weight.
        let lexical = ranked(&[("a", 1.0)]);
        let dense = ranked(&[("b", 1.0)]);
        let fused = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 5);

        assert_eq!(fused.len(), 2);
        for result in &fused {
            assert!((result.fused_score - 0.5).abs() < 1e-6);
        }
        // Tie broken by first appearance: lexical list first.
        assert_eq!(fused[0].chunk_id, id("a"));
    }

    #[test]
    fn test_weight_monotonicity() {
        // "lex" found only lexically, "den" only densely with a lower
        // component score. Raising the lexical weight must never drop
        // "lex" below "den".
        let lexical = ranked(&[("lex", 2.0), ("other", 1.0)]);
        let dense = ranked(&[("den", 0.6), ("other2", 0.5)]);

        let mut previous_gap = f32::NEG_INFINITY;
        for w_lex in [0.3, 0.5, 0.7, 0.9] {
            let weights = FusionWeights::new(w_lex, 1.0 - w_lex).unwrap();
            let fused = weighted_score_fusion(&lexical, &dense, weights, 10);
            let score_of = |name: &str| {
                fused
                    .iter()
                    .find(|r| r.chunk_id == id(name))
                    .unwrap()
                    .fused_score
            };
            let gap = score_of("lex") - score_of("den");
            assert!(gap >= previous_gap);
            previous_gap = gap;
        }
    }

    #[test]
    fn test_truncates_to_k() {
        let lexical = ranked(&[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let dense = ranked(&[("d", 0.9), ("e", 0.8)]);
        let fused = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 2);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let lexical = ranked(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        let dense = ranked(&[("c", 0.5), ("d", 0.5)]);
        let first = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 10);
        let second = weighted_score_fusion(&lexical, &dense, FusionWeights::default(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        assert!(FusionWeights::new(-0.1, 1.1).is_err());
        assert!(FusionWeights::new(0.6, 0.6).is_err());
        assert!(FusionWeights::new(0.25, 0.75).is_ok());
    }
}
