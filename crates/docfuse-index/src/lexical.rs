//! BM25 lexical index.
//!
//! A hand-rolled inverted index scored with BM25 (k1 = 1.2, b = 0.75).
//! Indexing and querying share one tokenizer; diverging tokenization
//! silently degrades recall, so [`tokenize`] is the single source of truth
//! for both sides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use docfuse_core::{Chunk, ChunkId, RankedResult};

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// Common English words excluded from both indexing and queries.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Tokenize text for lexical indexing and querying.
///
/// Lowercases, splits on non-alphanumeric boundaries, and drops stopwords.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(String::from)
        .collect()
}

/// A term occurrence in one indexed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Posting {
    /// Slot of the chunk in insertion order.
    slot: u32,
    /// Term frequency within the chunk.
    tf: u32,
}

/// BM25 inverted index over tokenized chunk text.
///
/// `add` touches only postings for newly added chunks (O(new), not
/// O(corpus)); already-indexed chunks are never re-scored. Results are
/// ordered by score descending with ties broken by insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalIndex {
    postings: HashMap<String, Vec<Posting>>,
    /// Chunk ids by slot, in insertion order.
    slots: Vec<ChunkId>,
    /// Token count per slot.
    doc_len: Vec<u32>,
    total_len: u64,
    #[serde(skip)]
    slot_of: HashMap<ChunkId, u32>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from scratch.
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut index = Self::new();
        index.add(chunks);
        index
    }

    /// Add new chunks, merging postings into the existing structure.
    ///
    /// Chunks whose id is already indexed are skipped (idempotent re-add).
    pub fn add(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            if self.slot_of.contains_key(&chunk.id) {
                continue;
            }
            let slot = self.slots.len() as u32;
            self.slot_of.insert(chunk.id.clone(), slot);
            self.slots.push(chunk.id.clone());

            let tokens = tokenize(&chunk.text);
            let mut tf: HashMap<&str, u32> = HashMap::new();
            for token in &tokens {
                *tf.entry(token.as_str()).or_default() += 1;
            }
            for (term, count) in tf {
                self.postings
                    .entry(term.to_string())
                    .or_default()
                    .push(Posting { slot, tf: count });
            }
            self.doc_len.push(tokens.len() as u32);
            self.total_len += tokens.len() as u64;
        }
    }

    /// Query the index, returning at most `k` results.
    ///
    /// An empty corpus or a query with no indexable terms yields an empty
    /// list, never an error.
    pub fn query(&self, text: &str, k: usize) -> Vec<RankedResult> {
        if self.slots.is_empty() || k == 0 {
            return Vec::new();
        }

        let terms = tokenize(text);
        if terms.is_empty() {
            return Vec::new();
        }

        let n = self.slots.len() as f32;
        let avg_len = self.total_len as f32 / n;

        let mut scores: HashMap<u32, f32> = HashMap::new();
        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for posting in postings {
                let tf = posting.tf as f32;
                let len_norm =
                    1.0 - BM25_B + BM25_B * self.doc_len[posting.slot as usize] as f32 / avg_len;
                let weight = idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * len_norm);
                *scores.entry(posting.slot).or_default() += weight;
            }
        }

        let mut ranked: Vec<(u32, f32)> = scores.into_iter().collect();
        // Score descending, ties by insertion order for determinism.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (slot, score))| RankedResult {
                chunk_id: self.slots[slot as usize].clone(),
                score,
                rank: i as u32 + 1,
            })
            .collect()
    }

    /// Ids of all indexed chunks in insertion order.
    pub fn ids(&self) -> Vec<ChunkId> {
        self.slots.clone()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Restore the slot map after deserialization.
    pub(crate) fn rebuild_slot_map(&mut self) {
        self.slot_of = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();
    }
}
