//! Embedding service adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docfuse_core::{Embedder, EmbeddingConfig, FuseError, Result};

/// Texts per request; hosted embedding APIs cap batch sizes.
const BATCH_SIZE: usize = 32;

/// OpenAI-compatible HTTP embedding client.
///
/// Document and query texts are prepended with their configured prefixes
/// before the call, supporting asymmetric retrieval models whose query
/// instruction differs from the document one.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FuseError::upstream("embedder", format!("client setup failed: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.endpoint);
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest {
                model: &self.config.model,
                input: batch.to_vec(),
            };

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| FuseError::upstream("embedder", e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(FuseError::upstream(
                    "embedder",
                    format!("HTTP {}: {}", status, body),
                ));
            }

            let body: EmbedResponse = response
                .json()
                .await
                .map_err(|e| FuseError::upstream("embedder", format!("bad response: {}", e)))?;

            if body.data.len() != batch.len() {
                return Err(FuseError::upstream(
                    "embedder",
                    format!(
                        "requested {} embeddings, received {}",
                        batch.len(),
                        body.data.len()
                    ),
                ));
            }

            for data in body.data {
                if data.embedding.len() != self.config.dimension {
                    return Err(FuseError::DimensionMismatch {
                        expected: self.config.dimension,
                        actual: data.embedding.len(),
                    });
                }
                all.push(data.embedding);
            }
        }

        debug!(count = all.len(), "Embedded texts");
        Ok(all)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let prefixed = texts
            .iter()
            .map(|t| format!("{}{}", self.config.document_prefix, t))
            .collect();
        self.embed_texts(prefixed).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let prefixed = format!("{}{}", self.config.query_prefix, text);
        let mut vectors = self.embed_texts(vec![prefixed]).await?;
        vectors
            .pop()
            .ok_or_else(|| FuseError::upstream("embedder", "no embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Deterministic in-process embedder for tests and offline runs.
///
/// Hashes each token into a dimension bucket and L2-normalizes the counts,
/// so texts sharing more vocabulary score higher under cosine similarity.
/// Crude, but directionally faithful to a real embedding model and fully
/// reproducible.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dimension: 64 }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = token
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed_query("quarterly revenue").await.unwrap();
        let b = embedder.embed_query("quarterly revenue").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_embedder_vectors_are_normalized() {
        let embedder = MockEmbedder::new();
        let v = embedder.embed_query("alpha beta gamma").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = MockEmbedder::new();
        let query = embedder.embed_query("apple banana").await.unwrap();
        let docs = embedder
            .embed_documents(&["apple banana salad", "apple pie recipe", "carrot soup"])
            .await
            .unwrap();

        let both = cosine(&query, &docs[0]);
        let one = cosine(&query, &docs[1]);
        let none = cosine(&query, &docs[2]);
        assert!(both > one);
        assert!(one > none);
    }

    #[tokio::test]
    async fn test_mock_dimension() {
        let embedder = MockEmbedder::with_dimension(16);
        assert_eq!(embedder.dimension(), 16);
        let v = embedder.embed_query("text").await.unwrap();
        assert_eq!(v.len(), 16);
    }
}
