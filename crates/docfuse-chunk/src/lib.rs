//! docfuse-chunk - Plain-text chunking
//!
//! Default implementation of the [`Chunker`] boundary. Splits extracted
//! text into page-aware fixed-size windows with stable `(page,
//! start_offset)` positions, so chunk ids stay identical across repeated
//! ingestion of the same document.
//!
//! Document *format* parsing (PDF extraction etc.) is out of scope; this
//! crate consumes text files a converter has already produced.

mod text;

pub use text::TextChunker;

// Re-export for convenience
pub use docfuse_core::{Chunk, Chunker};
