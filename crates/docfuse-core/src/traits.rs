//! Boundary traits between the retrieval core and its collaborators.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::{Chunk, ChunkId, RankedResult};

/// Embedding model boundary.
///
/// Implementations map text to fixed-width vectors. Document and query
/// embedding are separate operations because asymmetric retrieval models
/// use different instruction prefixes for each side.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, one vector per input in order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// The embedding dimension.
    fn dimension(&self) -> usize;
}

/// Cross-encoder reranker boundary.
///
/// An external network call with its own latency and failure profile.
/// Treated as a pure function from (query, candidates) to a reordered,
/// possibly truncated, list of chunk ids.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reorder candidates by relevance to the query, best first,
    /// returning at most `top_n` ids.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[(ChunkId, String)],
        top_n: usize,
    ) -> Result<Vec<ChunkId>>;
}

/// Document-to-chunk boundary, consumed at cold start and at ingest time.
pub trait Chunker: Send + Sync {
    /// Split one source document into chunks with stable positions.
    fn chunk(&self, source_path: &Path) -> Result<Vec<Chunk>>;

    /// Split every supported document under a directory.
    fn chunk_corpus(&self, corpus_dir: &Path) -> Result<Vec<Chunk>>;
}

/// Read access to the maintained index pair.
///
/// Implemented by the index maintenance manager; lets the retrieval
/// pipeline stay independent of index ownership and locking.
#[async_trait]
pub trait IndexReader: Send + Sync {
    /// Query the lexical index.
    async fn lexical_search(&self, query: &str, k: usize) -> Result<Vec<RankedResult>>;

    /// Query the dense index with an embedded query vector.
    async fn dense_search(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>>;

    /// Fetch a chunk by id.
    async fn get_chunk(&self, id: &ChunkId) -> Result<Option<Chunk>>;
}
