//! The retrieve -> fuse -> rerank pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info};

use docfuse_core::{
    Chunk, ChunkId, Embedder, FuseError, IndexReader, Reranker, Result, RetrievalOutput,
    RetrievedPassage,
};

use crate::fusion::{weighted_score_fusion, FusionWeights};

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone)]
pub struct RetrieveConfig {
    /// Recall budget per sub-index; identical for both sides.
    pub recall_k: usize,

    /// Fusion weights.
    pub weights: FusionWeights,

    /// Candidates kept after reranking.
    pub rerank_top_n: usize,

    /// Timeout for the query-embedding call.
    pub embed_timeout: Duration,

    /// Timeout for the rerank call.
    pub rerank_timeout: Duration,
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            recall_k: 6,
            weights: FusionWeights::default(),
            rerank_top_n: 6,
            embed_timeout: Duration::from_secs(30),
            rerank_timeout: Duration::from_secs(30),
        }
    }
}

/// Hybrid retriever over a lexical/dense index pair.
///
/// Issues the same query to both sub-indices concurrently, fuses the two
/// rankings with [`weighted_score_fusion`], and reorders the fused top
/// candidates through the external reranker. Upstream failures and
/// timeouts surface as [`FuseError::Upstream`]; they are never collapsed
/// into an empty result, which would be indistinguishable from a genuine
/// no-match.
pub struct FusionRetriever<I, E, R> {
    index: Arc<I>,
    embedder: Arc<E>,
    reranker: Arc<R>,
    config: RetrieveConfig,
}

impl<I, E, R> FusionRetriever<I, E, R>
where
    I: IndexReader,
    E: Embedder,
    R: Reranker,
{
    pub fn new(index: Arc<I>, embedder: Arc<E>, reranker: Arc<R>, config: RetrieveConfig) -> Result<Self> {
        config.weights.validate()?;
        if config.recall_k == 0 {
            return Err(FuseError::config("recall_k must be at least 1"));
        }
        Ok(Self {
            index,
            embedder,
            reranker,
            config,
        })
    }

    /// Run the full pipeline: fuse both sub-index rankings, then rerank.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalOutput> {
        let start = Instant::now();
        let candidates = self.fused_candidates(query).await?;

        if candidates.is_empty() {
            debug!(query, "No candidates from either sub-index");
            return Ok(Self::output(query, Vec::new(), start));
        }

        let pairs: Vec<(ChunkId, String)> = candidates
            .iter()
            .map(|(chunk, _)| (chunk.id.clone(), chunk.text.clone()))
            .collect();

        let reranked = timeout(
            self.config.rerank_timeout,
            self.reranker.rerank(query, &pairs, self.config.rerank_top_n),
        )
        .await
        .map_err(|_| {
            FuseError::upstream(
                "reranker",
                format!("timed out after {:?}", self.config.rerank_timeout),
            )
        })??;

        // Reorder candidates per the reranker, keeping fused scores.
        let mut results = Vec::with_capacity(reranked.len());
        for id in reranked {
            if let Some((chunk, score)) = candidates.iter().find(|(c, _)| c.id == id) {
                results.push(RetrievedPassage {
                    rank: results.len() as u32 + 1,
                    score: *score,
                    chunk: chunk.clone(),
                });
            }
        }

        info!(
            query,
            results = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );
        Ok(Self::output(query, results, start))
    }

    /// Fusion-only retrieval, skipping the reranker.
    pub async fn retrieve_unranked(&self, query: &str) -> Result<RetrievalOutput> {
        let start = Instant::now();
        let candidates = self.fused_candidates(query).await?;
        let results = candidates
            .into_iter()
            .enumerate()
            .map(|(i, (chunk, score))| RetrievedPassage {
                rank: i as u32 + 1,
                score,
                chunk,
            })
            .collect();
        Ok(Self::output(query, results, start))
    }

    /// Query both sub-indices concurrently and fuse their rankings.
    async fn fused_candidates(&self, query: &str) -> Result<Vec<(Chunk, f32)>> {
        let query_vector = timeout(
            self.config.embed_timeout,
            self.embedder.embed_query(query),
        )
        .await
        .map_err(|_| {
            FuseError::upstream(
                "embedder",
                format!("timed out after {:?}", self.config.embed_timeout),
            )
        })??;

        let k = self.config.recall_k;
        let (lexical, dense) = tokio::join!(
            self.index.lexical_search(query, k),
            self.index.dense_search(&query_vector, k)
        );
        let lexical = lexical?;
        let dense = dense?;

        debug!(
            lexical = lexical.len(),
            dense = dense.len(),
            "Sub-index results"
        );

        let fused = weighted_score_fusion(&lexical, &dense, self.config.weights, k);

        let mut candidates = Vec::with_capacity(fused.len());
        for result in fused {
            // Indices never reference chunks missing from the store; a gap
            // here is an internal consistency violation.
            let chunk = self.index.get_chunk(&result.chunk_id).await?.ok_or_else(|| {
                FuseError::corrupt(format!(
                    "index references unknown chunk {}",
                    result.chunk_id
                ))
            })?;
            candidates.push((chunk, result.fused_score));
        }
        Ok(candidates)
    }

    fn output(query: &str, results: Vec<RetrievedPassage>, start: Instant) -> RetrievalOutput {
        RetrievalOutput {
            query: query.to_string(),
            total_results: results.len(),
            latency_ms: start.elapsed().as_millis() as u64,
            results,
        }
    }
}
