//! docfuse-index - Index structures for hybrid retrieval
//!
//! This crate provides the three structures the maintenance manager keeps
//! in lockstep:
//!
//! - [`ChunkStore`]: insertion-ordered collection of chunks.
//! - [`LexicalIndex`]: BM25 inverted index over tokenized chunk text.
//! - [`DenseIndex`]: exact cosine nearest-neighbour search over
//!   L2-normalized embedding vectors.
//!
//! [`Snapshot`] persists and restores all three together; partial state is
//! never reused.

mod dense;
mod lexical;
mod snapshot;
mod store;

pub use dense::DenseIndex;
pub use lexical::LexicalIndex;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use store::ChunkStore;
