//! Cross-encoder reranking adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docfuse_core::{ChunkId, FuseError, Reranker, RerankConfig, Result};

/// HTTP cross-encoder rerank client.
///
/// Speaks the `/v1/rerank` shape used by SiliconFlow and compatible
/// providers: candidates go out as plain document strings, the response
/// maps indices back with relevance scores. Only the reordered chunk ids
/// are returned; the caller keeps its own scores.
pub struct HttpReranker {
    client: reqwest::Client,
    config: RerankConfig,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultItem>,
}

#[derive(Deserialize)]
struct RerankResultItem {
    index: usize,
    #[allow(dead_code)]
    relevance_score: f32,
}

impl HttpReranker {
    pub fn new(config: RerankConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FuseError::upstream("reranker", format!("client setup failed: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[(ChunkId, String)],
        top_n: usize,
    ) -> Result<Vec<ChunkId>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/rerank", self.config.endpoint);
        let request = RerankRequest {
            model: &self.config.model,
            query,
            documents: candidates.iter().map(|(_, text)| text.as_str()).collect(),
            top_n,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FuseError::upstream("reranker", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FuseError::upstream(
                "reranker",
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| FuseError::upstream("reranker", format!("bad response: {}", e)))?;

        let mut ordered = Vec::with_capacity(body.results.len().min(top_n));
        for item in body.results.into_iter().take(top_n) {
            let (chunk_id, _) = candidates.get(item.index).ok_or_else(|| {
                FuseError::upstream(
                    "reranker",
                    format!("result index {} out of range", item.index),
                )
            })?;
            ordered.push(chunk_id.clone());
        }

        debug!(query, candidates = candidates.len(), kept = ordered.len(), "Reranked");
        Ok(ordered)
    }
}

/// Keeps the incoming (fused) order, truncated to `top_n`.
///
/// Useful in tests and when no reranking service is configured.
pub struct PassthroughReranker;

#[async_trait]
impl Reranker for PassthroughReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: &[(ChunkId, String)],
        top_n: usize,
    ) -> Result<Vec<ChunkId>> {
        Ok(candidates
            .iter()
            .take(top_n)
            .map(|(id, _)| id.clone())
            .collect())
    }
}
