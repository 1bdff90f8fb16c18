//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias using FuseError.
pub type Result<T> = std::result::Result<T, FuseError>;

/// Errors that can occur in the retrieval engine.
///
/// The variants map onto distinct handling policies: `Config` and
/// `DimensionMismatch` are fatal and fail fast; `Corrupt` is recovered
/// internally by a full rebuild; `Upstream` is surfaced to the caller as a
/// retrieval failure, distinct from an empty result.
#[derive(Error, Debug)]
pub enum FuseError {
    /// Invalid configuration (bad weights, zero recall budget, ...).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Query or document vector does not match the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted index state is unreadable or internally inconsistent.
    #[error("Index corruption: {message}")]
    Corrupt { message: String },

    /// Embedder or reranker call failed or timed out.
    #[error("Upstream {service} unavailable: {reason}")]
    Upstream { service: String, reason: String },

    /// A single malformed chunk; fails its entire ingest batch.
    #[error("Chunk {chunk_id} rejected: {reason}")]
    ChunkRejected { chunk_id: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FuseError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Create an upstream failure for the named service.
    pub fn upstream(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a chunk rejection error.
    pub fn chunk_rejected(chunk_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ChunkRejected {
            chunk_id: chunk_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is recovered internally by a full rebuild.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FuseError::upstream("reranker", "request timed out after 30s");
        let msg = err.to_string();
        assert!(msg.contains("reranker"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_chunk_rejected_names_chunk() {
        let err = FuseError::chunk_rejected("abc123", "empty text");
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_recoverable() {
        assert!(FuseError::corrupt("bad snapshot").is_recoverable());
        assert!(!FuseError::config("bad weights").is_recoverable());
        assert!(!FuseError::upstream("embedder", "503").is_recoverable());
    }
}
