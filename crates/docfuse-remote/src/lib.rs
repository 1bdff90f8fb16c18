//! docfuse-remote - External embedding and reranking services
//!
//! HTTP adapters for the two external scoring collaborators:
//!
//! - [`HttpEmbedder`]: OpenAI-compatible `/v1/embeddings` endpoint with
//!   configurable document/query instruction prefixes.
//! - [`HttpReranker`]: cross-encoder `/v1/rerank` endpoint
//!   (SiliconFlow-style request/response shapes).
//!
//! Both surface network failures and non-2xx responses as
//! [`FuseError::Upstream`](docfuse_core::FuseError). Deterministic
//! in-process substitutes ([`MockEmbedder`], [`PassthroughReranker`]) are
//! provided for tests and offline use.

mod embedder;
mod reranker;

pub use embedder::{HttpEmbedder, MockEmbedder};
pub use reranker::{HttpReranker, PassthroughReranker};

// Re-export the boundary traits for convenience
pub use docfuse_core::{Embedder, Reranker};
