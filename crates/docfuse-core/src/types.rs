//! Core domain types for the hybrid retrieval engine.

use serde::{Deserialize, Serialize};

/// Stable identifier for a chunk.
///
/// Derived deterministically from `(source, page, start_offset)`, so
/// re-ingesting an unchanged chunk always produces the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Derive the id for a chunk at the given position within a source.
    pub fn derive(source: &str, page: u32, start_offset: u32) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(&page.to_le_bytes());
        hasher.update(&start_offset.to_le_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest.as_bytes()[..8]))
    }

    /// Wrap an already-derived id (e.g. read back from a snapshot).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded span of source-document text, the atomic retrievable unit.
///
/// Immutable once created. Identity is position-derived, not content-derived,
/// so the same span of the same document always maps to the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier.
    pub id: ChunkId,

    /// Chunk text content.
    pub text: String,

    /// Origin document name.
    pub source: String,

    /// Page number within the source (0-based).
    pub page: u32,

    /// Character offset of the chunk start within the page.
    pub start_offset: u32,
}

impl Chunk {
    /// Create a chunk, deriving its id from position.
    pub fn new(source: &str, page: u32, start_offset: u32, text: impl Into<String>) -> Self {
        Self {
            id: ChunkId::derive(source, page, start_offset),
            text: text.into(),
            source: source.to_string(),
            page,
            start_offset,
        }
    }
}

/// An embedded chunk vector, one-to-one with a [`Chunk`].
///
/// Vectors are never mutated after insertion, only added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Chunk this vector belongs to.
    pub chunk_id: ChunkId,

    /// Fixed-length embedding vector.
    pub vector: Vec<f32>,
}

/// Output of a single sub-index query.
///
/// Score scales differ between indices (unbounded BM25 weight vs bounded
/// cosine similarity) and are normalized before fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Matched chunk.
    pub chunk_id: ChunkId,

    /// Raw sub-index score (higher is better).
    pub score: f32,

    /// Position in the sub-index ranking (1-based).
    pub rank: u32,
}

/// Output of the fusion stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Matched chunk.
    pub chunk_id: ChunkId,

    /// Weighted combination of normalized sub-index scores.
    pub fused_score: f32,
}

/// A fully hydrated retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Final rank after fusion (and reranking, when enabled), 1-based.
    pub rank: u32,

    /// Fused relevance score.
    pub score: f32,

    /// The matched chunk with its metadata.
    pub chunk: Chunk,
}

/// Retrieval response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutput {
    /// The original query.
    pub query: String,

    /// Total results returned.
    pub total_results: usize,

    /// Retrieval latency in milliseconds.
    pub latency_ms: u64,

    /// Individual results, best first.
    pub results: Vec<RetrievedPassage>,
}

/// Statistics about the indexed corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of chunks in the store.
    pub chunks: usize,

    /// Number of chunks in the lexical index.
    pub lexical_entries: usize,

    /// Number of vectors in the dense index.
    pub dense_entries: usize,

    /// Embedding dimension.
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_deterministic() {
        let a = ChunkId::derive("report.pdf", 3, 120);
        let b = ChunkId::derive("report.pdf", 3, 120);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_id_position_sensitive() {
        let a = ChunkId::derive("report.pdf", 3, 120);
        assert_ne!(a, ChunkId::derive("report.pdf", 3, 121));
        assert_ne!(a, ChunkId::derive("report.pdf", 4, 120));
        assert_ne!(a, ChunkId::derive("other.pdf", 3, 120));
    }

    #[test]
    fn test_chunk_new_derives_id() {
        let chunk = Chunk::new("report.pdf", 0, 0, "quarterly revenue grew");
        assert_eq!(chunk.id, ChunkId::derive("report.pdf", 0, 0));
        assert_eq!(chunk.page, 0);
    }

    #[test]
    fn test_chunk_id_serde_transparent() {
        let id = ChunkId::derive("a", 0, 0);
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.starts_with('"'));
        let back: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
