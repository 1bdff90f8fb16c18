//! docfuse-engine - Index maintenance
//!
//! [`IndexManager`] is the single authority for mutating the chunk store
//! and both indices. It owns cold-start load-or-build (executed at most
//! once per process), all-or-nothing ingest of new chunks into both
//! indices, and the single-writer/many-reader access discipline the query
//! path relies on.

mod manager;

pub use manager::{IndexManager, IngestSummary};

// Re-export for convenience
pub use docfuse_core::{EngineStats, IndexReader};
