//! Dense vector index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use docfuse_core::{ChunkId, FuseError, RankedResult, Result, VectorEntry};

/// Exact nearest-neighbour index under cosine similarity.
///
/// Vectors are L2-normalized at insertion so scoring reduces to a dot
/// product. `add` appends in O(new) without touching existing entries;
/// `query` scans the whole corpus, which is O(total corpus) per query —
/// adequate at the corpus sizes this engine targets, and the documented
/// scaling limitation of the exact scan.
///
/// The dimension is fixed at construction. Feeding a vector of any other
/// width is a configuration error and fails fast; vectors are never
/// silently truncated or padded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseIndex {
    dimension: usize,
    /// Normalized vectors in insertion order.
    entries: Vec<VectorEntry>,
    #[serde(skip)]
    slot_of: HashMap<ChunkId, usize>,
}

impl DenseIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            slot_of: HashMap::new(),
        }
    }

    /// Build an index from scratch.
    pub fn build(dimension: usize, entries: Vec<VectorEntry>) -> Result<Self> {
        let mut index = Self::new(dimension);
        index.add(entries)?;
        Ok(index)
    }

    /// Append new vectors. Entries with an already-indexed id are skipped.
    pub fn add(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        for mut entry in entries {
            if entry.vector.len() != self.dimension {
                return Err(FuseError::DimensionMismatch {
                    expected: self.dimension,
                    actual: entry.vector.len(),
                });
            }
            if self.slot_of.contains_key(&entry.chunk_id) {
                continue;
            }
            normalize(&mut entry.vector);
            self.slot_of.insert(entry.chunk_id.clone(), self.entries.len());
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Query with an embedded vector, returning at most `k` results.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>> {
        if vector.len() != self.dimension {
            return Err(FuseError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query = vector.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| (slot, dot(&query, &entry.vector)))
            .collect();

        // Similarity descending, ties by insertion order for determinism.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (slot, score))| RankedResult {
                chunk_id: self.entries[slot].chunk_id.clone(),
                score,
                rank: i as u32 + 1,
            })
            .collect())
    }

    /// Ids of all indexed vectors in insertion order.
    pub fn ids(&self) -> Vec<ChunkId> {
        self.entries.iter().map(|e| e.chunk_id.clone()).collect()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restore the slot map after deserialization.
    pub(crate) fn rebuild_slot_map(&mut self) {
        self.slot_of = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.chunk_id.clone(), i))
            .collect();
    }
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: u32, vector: Vec<f32>) -> VectorEntry {
        VectorEntry {
            chunk_id: ChunkId::derive("test.pdf", 0, offset),
            vector,
        }
    }

    #[test]
    fn test_nearest_neighbour_order() {
        let index = DenseIndex::build(
            2,
            vec![
                entry(0, vec![1.0, 0.0]),
                entry(100, vec![0.0, 1.0]),
                entry(200, vec![0.7, 0.7]),
            ],
        )
        .unwrap();

        let results = index.query(&[1.0, 0.1], 3).unwrap();
        assert_eq!(results[0].chunk_id, ChunkId::derive("test.pdf", 0, 0));
        assert_eq!(results[0].rank, 1);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_query_respects_k() {
        let entries = (0..10).map(|i| entry(i * 100, vec![1.0, i as f32])).collect();
        let index = DenseIndex::build(2, entries).unwrap();
        assert!(index.query(&[1.0, 0.0], 4).unwrap().len() <= 4);
    }

    #[test]
    fn test_dimension_mismatch_fails_fast() {
        let mut index = DenseIndex::new(3);
        let err = index.add(vec![entry(0, vec![1.0, 2.0])]).unwrap_err();
        assert!(matches!(
            err,
            FuseError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));

        let err = index.query(&[1.0], 5).unwrap_err();
        assert!(matches!(err, FuseError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = DenseIndex::new(2);
        assert!(index.query(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_existing_id_is_noop() {
        let mut index = DenseIndex::new(2);
        index.add(vec![entry(0, vec![1.0, 0.0])]).unwrap();
        index.add(vec![entry(0, vec![0.0, 1.0])]).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_scores_are_cosine() {
        // Unnormalized input must score identically to its normalized form.
        let index = DenseIndex::build(2, vec![entry(0, vec![10.0, 0.0])]).unwrap();
        let results = index.query(&[3.0, 0.0], 1).unwrap();
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_broken_by_insertion_order() {
        let first = entry(0, vec![1.0, 0.0]);
        let second = entry(100, vec![1.0, 0.0]);
        let index = DenseIndex::build(2, vec![first.clone(), second]).unwrap();
        let results = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk_id, first.chunk_id);
    }

    #[test]
    fn test_serde_round_trip() {
        let index = DenseIndex::build(2, vec![entry(0, vec![1.0, 0.0])]).unwrap();
        let json = serde_json::to_string(&index).unwrap();
        let mut back: DenseIndex = serde_json::from_str(&json).unwrap();
        back.rebuild_slot_map();

        assert_eq!(back.dimension(), 2);
        assert_eq!(back.len(), 1);
        // Re-add after restore must still be a no-op.
        back.add(vec![entry(0, vec![0.0, 1.0])]).unwrap();
        assert_eq!(back.len(), 1);
    }
}
