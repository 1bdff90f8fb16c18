//! Configuration types for the retrieval engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FuseError, Result};

/// Main configuration for the retrieval engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuseConfig {
    /// Index and persistence configuration.
    #[serde(default)]
    pub index: IndexConfig,

    /// Fusion configuration.
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Embedding service configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Reranker service configuration.
    #[serde(default)]
    pub rerank: RerankConfig,
}

/// Index and persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Snapshot directory for persisted index state.
    pub data_dir: PathBuf,

    /// Source corpus directory, chunked on cold start when no snapshot
    /// exists. Optional; an empty engine is valid.
    #[serde(default)]
    pub corpus_dir: Option<PathBuf>,

    /// Recall budget per sub-index. Identical for both indices so that
    /// fusion weighting stays meaningful.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            corpus_dir: None,
            recall_k: 6,
        }
    }
}

/// Fusion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of the lexical sub-index score.
    #[serde(default = "default_weight")]
    pub lexical_weight: f32,

    /// Weight of the dense sub-index score.
    #[serde(default = "default_weight")]
    pub dense_weight: f32,

    /// Number of candidates kept after reranking.
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.5,
            dense_weight: 0.5,
            rerank_top_n: 6,
        }
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (bearer auth). Empty for unauthenticated endpoints.
    #[serde(default)]
    pub api_key: String,

    /// Embedding dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Prefix prepended to document texts before embedding.
    #[serde(default)]
    pub document_prefix: String,

    /// Prefix prepended to query texts before embedding. May differ from
    /// the document prefix for asymmetric retrieval models.
    #[serde(default)]
    pub query_prefix: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_embedding_model(),
            api_key: String::new(),
            dimension: 1024,
            document_prefix: String::new(),
            query_prefix: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Reranker service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Base URL of the rerank API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// API key (bearer auth).
    #[serde(default)]
    pub api_key: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_rerank_model(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

// Default value functions

fn default_recall_k() -> usize {
    6
}

fn default_weight() -> f32 {
    0.5
}

fn default_rerank_top_n() -> usize {
    6
}

fn default_dimension() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_endpoint() -> String {
    "https://api.siliconflow.cn".to_string()
}

fn default_embedding_model() -> String {
    "BAAI/bge-m3".to_string()
}

fn default_rerank_model() -> String {
    "BAAI/bge-reranker-v2-m3".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docfuse")
        .join("index")
}

impl FuseConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| FuseError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths, falling back to defaults.
    pub fn load_default() -> Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docfuse").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("docfuse.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Validate fatal configuration invariants. Called at load time and at
    /// engine construction so a bad config never reaches the query path.
    pub fn validate(&self) -> Result<()> {
        if self.index.recall_k == 0 {
            return Err(FuseError::config("recall_k must be at least 1"));
        }
        if self.embedding.dimension == 0 {
            return Err(FuseError::config("embedding dimension must be at least 1"));
        }
        let w_lex = self.fusion.lexical_weight;
        let w_dense = self.fusion.dense_weight;
        if w_lex < 0.0 || w_dense < 0.0 {
            return Err(FuseError::config("fusion weights must be non-negative"));
        }
        if (w_lex + w_dense - 1.0).abs() > 1e-6 {
            return Err(FuseError::config(format!(
                "fusion weights must sum to 1.0, got {}",
                w_lex + w_dense
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FuseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.index.recall_k, 6);
        assert_eq!(config.fusion.lexical_weight, 0.5);
        assert_eq!(config.fusion.rerank_top_n, 6);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = FuseConfig::default();
        config.fusion.lexical_weight = -0.2;
        config.fusion.dense_weight = 1.2;
        assert!(matches!(
            config.validate(),
            Err(FuseError::Config { .. })
        ));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = FuseConfig::default();
        config.fusion.lexical_weight = 0.7;
        config.fusion.dense_weight = 0.7;
        assert!(config.validate().is_err());

        config.fusion.lexical_weight = 0.3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_recall_k_rejected() {
        let mut config = FuseConfig::default();
        config.index.recall_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[index]
data_dir = "/tmp/docfuse-test"
recall_k = 8

[fusion]
lexical_weight = 0.3
dense_weight = 0.7
"#,
        )
        .unwrap();

        let config = FuseConfig::load(&path).unwrap();
        assert_eq!(config.index.recall_k, 8);
        assert_eq!(config.fusion.dense_weight, 0.7);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.embedding.dimension, 1024);
    }
}
