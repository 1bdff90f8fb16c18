//! Page-aware fixed-window text chunker.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use docfuse_core::{Chunk, Chunker, FuseError, Result};

/// Extensions the chunker will pick up when walking a corpus directory.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Chunks plain text into fixed-size windows, one page at a time.
///
/// Pages are delimited by form-feed characters (the page separator emitted
/// by common PDF-to-text converters). Within a page, windows are cut at
/// word boundaries, so they normally stay within `max_chars` bytes; a
/// single word longer than the cap is emitted whole rather than split.
/// `start_offset` is the byte offset of the window within its page, which
/// keeps chunk identity stable across repeated runs over the same file.
pub struct TextChunker {
    max_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    fn chunk_page(&self, source: &str, page: u32, page_text: &str, out: &mut Vec<Chunk>) {
        let mut window_start: Option<usize> = None;
        let mut window_end = 0usize;

        let mut flush = |start: Option<usize>, end: usize, out: &mut Vec<Chunk>| {
            if let Some(start) = start {
                let text = page_text[start..end].trim();
                if !text.is_empty() {
                    out.push(Chunk::new(source, page, start as u32, text));
                }
            }
        };

        for (offset, word) in split_words(page_text) {
            let word_end = offset + word.len();
            match window_start {
                None => {
                    window_start = Some(offset);
                    window_end = word_end;
                }
                Some(start) => {
                    if word_end - start > self.max_chars {
                        flush(Some(start), window_end, out);
                        window_start = Some(offset);
                    }
                    window_end = word_end;
                }
            }
        }
        flush(window_start, window_end, out);
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Chunker for TextChunker {
    fn chunk(&self, source_path: &Path) -> Result<Vec<Chunk>> {
        let text = fs::read_to_string(source_path)?;
        let source = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FuseError::config(format!("invalid source path: {}", source_path.display()))
            })?;

        let mut chunks = Vec::new();
        for (page, page_text) in text.split('\u{c}').enumerate() {
            self.chunk_page(source, page as u32, page_text, &mut chunks);
        }

        debug!(source, chunks = chunks.len(), "Chunked document");
        Ok(chunks)
    }

    fn chunk_corpus(&self, corpus_dir: &Path) -> Result<Vec<Chunk>> {
        let mut files = Vec::new();
        collect_files(corpus_dir, &mut files)?;
        // Deterministic ingest order regardless of directory iteration.
        files.sort();

        let mut chunks = Vec::new();
        for file in files {
            match self.chunk(&file) {
                Ok(mut file_chunks) => chunks.append(&mut file_chunks),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable file");
                }
            }
        }
        Ok(chunks)
    }
}

/// Words with their byte offsets within `text`.
fn split_words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace()
        .map(move |word| (word.as_ptr() as usize - text.as_ptr() as usize, word))
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if is_supported(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
