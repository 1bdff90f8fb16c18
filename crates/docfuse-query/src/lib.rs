//! docfuse-query - Fusion retrieval pipeline
//!
//! This crate combines the two sub-index rankings into one via weighted
//! score fusion, then hands the fused candidates to an external reranker.
//!
//! # Pipeline
//!
//! embed query -> lexical + dense search (concurrent) -> min-max normalize
//! and fuse -> hydrate chunks -> rerank -> [`RetrievalOutput`]
//!
//! # Example
//!
//! ```rust,ignore
//! use docfuse_query::{FusionRetriever, RetrieveConfig};
//! use std::sync::Arc;
//!
//! let retriever = FusionRetriever::new(index, embedder, reranker, RetrieveConfig::default());
//! let output = retriever.retrieve("how did revenue change").await?;
//! ```

mod fusion;
mod retriever;

pub use fusion::{weighted_score_fusion, FusionWeights};
pub use retriever::{FusionRetriever, RetrieveConfig};

// Re-export for convenience
pub use docfuse_core::{RetrievalOutput, RetrievedPassage};
