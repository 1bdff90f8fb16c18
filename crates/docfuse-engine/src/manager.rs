//! Single mutation authority over the chunk store and both indices.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::timeout;
use tracing::{info, warn};

use docfuse_core::{
    Chunk, ChunkId, Chunker, Embedder, EngineStats, FuseConfig, FuseError, IndexReader,
    RankedResult, Result, VectorEntry,
};
use docfuse_index::{ChunkStore, DenseIndex, LexicalIndex, Snapshot};

/// The three structures that must stay in lockstep.
struct IndexSet {
    store: ChunkStore,
    lexical: LexicalIndex,
    dense: DenseIndex,
}

impl IndexSet {
    fn empty(dimension: usize) -> Self {
        Self {
            store: ChunkStore::new(),
            lexical: LexicalIndex::new(),
            dense: DenseIndex::new(dimension),
        }
    }
}

/// Outcome of one ingest batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Chunks newly committed to both indices.
    pub added: usize,

    /// Chunks skipped because their id was already indexed.
    pub skipped: usize,
}

/// Coordinates both indices as a unit.
///
/// Queries take shared read access and run fully in parallel; ingest and
/// rebuild take exclusive write access, so readers never observe the two
/// indices out of sync or a half-built replacement. Cold-start
/// initialization runs at most once per manager regardless of how many
/// concurrent callers trigger it: all first callers await the same
/// in-flight load-or-build.
pub struct IndexManager<E, C> {
    inner: RwLock<IndexSet>,
    ready: OnceCell<()>,
    embedder: Arc<E>,
    chunker: Arc<C>,
    data_dir: PathBuf,
    corpus_dir: Option<PathBuf>,
    embed_timeout: Duration,
}

impl<E, C> std::fmt::Debug for IndexManager<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("data_dir", &self.data_dir)
            .field("corpus_dir", &self.corpus_dir)
            .field("embed_timeout", &self.embed_timeout)
            .finish_non_exhaustive()
    }
}

impl<E, C> IndexManager<E, C>
where
    E: Embedder,
    C: Chunker,
{
    /// Create a manager. Cheap; no IO happens until the first operation
    /// triggers [`ensure_ready`](Self::ensure_ready).
    ///
    /// Fails fast when the configuration is invalid or the embedder's
    /// dimension disagrees with the configured one.
    pub fn new(config: &FuseConfig, embedder: Arc<E>, chunker: Arc<C>) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != config.embedding.dimension {
            return Err(FuseError::config(format!(
                "embedder dimension {} does not match configured dimension {}",
                embedder.dimension(),
                config.embedding.dimension
            )));
        }
        Ok(Self {
            inner: RwLock::new(IndexSet::empty(config.embedding.dimension)),
            ready: OnceCell::new(),
            embedder,
            chunker,
            data_dir: config.index.data_dir.clone(),
            corpus_dir: config.index.corpus_dir.clone(),
            embed_timeout: Duration::from_secs(config.embedding.timeout_secs),
        })
    }

    /// One-time initialization barrier.
    ///
    /// Loads the persisted snapshot, or falls back to a full rebuild from
    /// the corpus directory when the snapshot is absent or corrupt. A
    /// failed initialization (e.g. embedder unavailable during rebuild) is
    /// retried by the next caller.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.load_or_build())
            .await
            .map(|_| ())
    }

    async fn load_or_build(&self) -> Result<()> {
        let dimension = self.embedder.dimension();

        match Snapshot::load(&self.data_dir) {
            Ok(snapshot) => {
                if snapshot.dense.dimension() != dimension {
                    warn!(
                        persisted = snapshot.dense.dimension(),
                        expected = dimension,
                        "Snapshot dimension mismatch, rebuilding"
                    );
                    return self.rebuild().await;
                }
                let mut inner = self.inner.write().await;
                *inner = IndexSet {
                    store: snapshot.store,
                    lexical: snapshot.lexical,
                    dense: snapshot.dense,
                };
                info!(chunks = inner.store.len(), "Indices loaded from snapshot");
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Snapshot unusable, rebuilding from corpus");
                self.rebuild().await
            }
            Err(e) => Err(e),
        }
    }

    /// Full rebuild from the external chunker, then persist before serving.
    async fn rebuild(&self) -> Result<()> {
        let chunks = match &self.corpus_dir {
            Some(dir) => self.chunker.chunk_corpus(dir)?,
            None => Vec::new(),
        };

        let mut fresh = IndexSet::empty(self.embedder.dimension());
        if !chunks.is_empty() {
            let new_chunks = self.dedupe(&fresh.store, chunks);
            let entries = self.embed_chunks(&new_chunks).await?;
            commit(&mut fresh, new_chunks, entries)?;
        }

        Snapshot::write(&self.data_dir, &fresh.store, &fresh.lexical, &fresh.dense)?;
        info!(chunks = fresh.store.len(), "Indices rebuilt and persisted");

        // Swap in the fresh set wholesale; readers never see it half-built.
        let mut inner = self.inner.write().await;
        *inner = fresh;
        Ok(())
    }

    /// Ingest a batch of new chunks into both indices as a unit.
    ///
    /// All-or-nothing: validation and embedding happen before any commit,
    /// so an embedding failure for any chunk leaves both indices exactly
    /// as they were. Chunks whose id is already indexed are skipped, which
    /// makes re-ingestion of an unchanged document a no-op.
    pub async fn ingest(&self, chunks: Vec<Chunk>) -> Result<IngestSummary> {
        self.ensure_ready().await?;

        let total = chunks.len();
        let new_chunks = {
            let inner = self.inner.read().await;
            self.dedupe(&inner.store, chunks)
        };
        let skipped = total - new_chunks.len();

        if new_chunks.is_empty() {
            return Ok(IngestSummary { added: 0, skipped });
        }

        for chunk in &new_chunks {
            if chunk.text.trim().is_empty() {
                return Err(FuseError::chunk_rejected(
                    chunk.id.to_string(),
                    "empty text",
                ));
            }
        }

        let entries = self.embed_chunks(&new_chunks).await?;

        let mut inner = self.inner.write().await;
        let added = new_chunks.len();
        commit(&mut inner, new_chunks, entries)?;
        Snapshot::write(&self.data_dir, &inner.store, &inner.lexical, &inner.dense)?;

        info!(added, skipped, "Ingest committed");
        Ok(IngestSummary { added, skipped })
    }

    /// Drop chunks already present in the store and duplicates within the
    /// batch itself, preserving order.
    fn dedupe(&self, store: &ChunkStore, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut seen: HashSet<ChunkId> = HashSet::new();
        chunks
            .into_iter()
            .filter(|c| !store.contains(&c.id) && seen.insert(c.id.clone()))
            .collect()
    }

    /// Embed all chunk texts under the configured timeout.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<VectorEntry>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = timeout(self.embed_timeout, self.embedder.embed_documents(&texts))
            .await
            .map_err(|_| {
                FuseError::upstream(
                    "embedder",
                    format!("timed out after {:?}", self.embed_timeout),
                )
            })??;

        if vectors.len() != chunks.len() {
            return Err(FuseError::upstream(
                "embedder",
                format!(
                    "requested {} embeddings, received {}",
                    chunks.len(),
                    vectors.len()
                ),
            ));
        }

        let dimension = self.embedder.dimension();
        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(FuseError::chunk_rejected(
                    chunk.id.to_string(),
                    format!(
                        "embedding dimension {} does not match index dimension {}",
                        vector.len(),
                        dimension
                    ),
                ));
            }
            entries.push(VectorEntry {
                chunk_id: chunk.id.clone(),
                vector,
            });
        }
        Ok(entries)
    }

    /// All chunk ids currently indexed, in insertion order.
    pub async fn ids(&self) -> Result<Vec<ChunkId>> {
        self.ensure_ready().await?;
        Ok(self.inner.read().await.store.ids())
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        self.ensure_ready().await?;
        let inner = self.inner.read().await;
        Ok(EngineStats {
            chunks: inner.store.len(),
            lexical_entries: inner.lexical.len(),
            dense_entries: inner.dense.len(),
            dimension: inner.dense.dimension(),
        })
    }
}

/// Apply one batch to all three structures. The fallible step (dense
/// dimension check) ran during embedding, so this cannot leave the set
/// partially updated in practice.
fn commit(inner: &mut IndexSet, chunks: Vec<Chunk>, entries: Vec<VectorEntry>) -> Result<()> {
    inner.lexical.add(&chunks);
    inner.dense.add(entries)?;
    for chunk in chunks {
        inner.store.upsert(chunk);
    }
    debug_assert_eq!(inner.store.len(), inner.lexical.len());
    debug_assert_eq!(inner.store.len(), inner.dense.len());
    Ok(())
}

#[async_trait]
impl<E, C> IndexReader for IndexManager<E, C>
where
    E: Embedder,
    C: Chunker,
{
    async fn lexical_search(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        self.ensure_ready().await?;
        Ok(self.inner.read().await.lexical.query(query, k))
    }

    async fn dense_search(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>> {
        self.ensure_ready().await?;
        self.inner.read().await.dense.query(vector, k)
    }

    async fn get_chunk(&self, id: &ChunkId) -> Result<Option<Chunk>> {
        self.ensure_ready().await?;
        Ok(self.inner.read().await.store.get(id).cloned())
    }
}
