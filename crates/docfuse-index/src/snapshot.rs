//! Persisted snapshot of the chunk store and both indices.
//!
//! Layout: a directory holding `chunks.json` (all chunks in insertion
//! order), `lexical.json`, and `dense.json`. The three files are written
//! together and loaded together; a missing file, a parse failure, or a
//! version mismatch between any of them invalidates the whole snapshot.
//! Partial reuse of persisted state is never attempted — the caller falls
//! back to a full rebuild instead.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use docfuse_core::{FuseError, Result};

use crate::dense::DenseIndex;
use crate::lexical::LexicalIndex;
use crate::store::ChunkStore;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

const CHUNKS_FILE: &str = "chunks.json";
const LEXICAL_FILE: &str = "lexical.json";
const DENSE_FILE: &str = "dense.json";

#[derive(Serialize, Deserialize)]
struct Versioned<T> {
    version: u32,
    payload: T,
}

/// A consistent, loaded-or-loadable triple of persisted state.
#[derive(Debug)]
pub struct Snapshot {
    pub store: ChunkStore,
    pub lexical: LexicalIndex,
    pub dense: DenseIndex,
}

impl Snapshot {
    /// Load all three files from `dir`.
    ///
    /// Any missing file, parse failure, or version mismatch yields
    /// [`FuseError::Corrupt`]; the caller recovers by rebuilding.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut store: ChunkStore = read_versioned(&dir.join(CHUNKS_FILE))?;
        let mut lexical: LexicalIndex = read_versioned(&dir.join(LEXICAL_FILE))?;
        let mut dense: DenseIndex = read_versioned(&dir.join(DENSE_FILE))?;

        store.rebuild_id_map();
        lexical.rebuild_slot_map();
        dense.rebuild_slot_map();

        // The three files must describe the same chunk set.
        let store_ids = store.ids();
        if lexical.ids() != store_ids || dense.ids() != store_ids {
            return Err(FuseError::corrupt(
                "snapshot files disagree on the chunk set",
            ));
        }

        info!(chunks = store.len(), "Loaded index snapshot");
        Ok(Self {
            store,
            lexical,
            dense,
        })
    }

    /// Write all three files to `dir`, creating it if needed.
    ///
    /// Each file is written to a temp path then renamed so a crash never
    /// leaves a truncated file behind.
    pub fn write(
        dir: &Path,
        store: &ChunkStore,
        lexical: &LexicalIndex,
        dense: &DenseIndex,
    ) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_versioned(&dir.join(CHUNKS_FILE), store)?;
        write_versioned(&dir.join(LEXICAL_FILE), lexical)?;
        write_versioned(&dir.join(DENSE_FILE), dense)?;
        debug!(chunks = store.len(), dir = %dir.display(), "Wrote index snapshot");
        Ok(())
    }

    /// Whether a snapshot directory appears present (all three files exist).
    pub fn exists(dir: &Path) -> bool {
        [CHUNKS_FILE, LEXICAL_FILE, DENSE_FILE]
            .iter()
            .all(|f| dir.join(f).exists())
    }
}

fn read_versioned<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| FuseError::corrupt(format!("cannot read {}: {}", path.display(), e)))?;
    let versioned: Versioned<T> = serde_json::from_str(&content)
        .map_err(|e| FuseError::corrupt(format!("cannot parse {}: {}", path.display(), e)))?;
    if versioned.version != SNAPSHOT_VERSION {
        return Err(FuseError::corrupt(format!(
            "{} has schema version {}, expected {}",
            path.display(),
            versioned.version,
            SNAPSHOT_VERSION
        )));
    }
    Ok(versioned.payload)
}

fn write_versioned<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    let versioned = Versioned {
        version: SNAPSHOT_VERSION,
        payload,
    };
    let json = serde_json::to_string(&versioned)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfuse_core::{Chunk, VectorEntry};

    fn populated() -> (ChunkStore, LexicalIndex, DenseIndex) {
        let chunk = Chunk::new("a.pdf", 0, 0, "alpha beta");
        let mut store = ChunkStore::new();
        store.upsert(chunk.clone());
        let lexical = LexicalIndex::build(std::slice::from_ref(&chunk));
        let dense = DenseIndex::build(
            2,
            vec![VectorEntry {
                chunk_id: chunk.id,
                vector: vec![1.0, 0.0],
            }],
        )
        .unwrap();
        (store, lexical, dense)
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (store, lexical, dense) = populated();
        Snapshot::write(dir.path(), &store, &lexical, &dense).unwrap();
        assert!(Snapshot::exists(dir.path()));

        let snapshot = Snapshot::load(dir.path()).unwrap();
        assert_eq!(snapshot.store.ids(), store.ids());
        assert_eq!(snapshot.lexical.ids(), store.ids());
        assert_eq!(snapshot.dense.ids(), store.ids());
        assert!(!snapshot.lexical.query("alpha", 1).is_empty());
    }

    #[test]
    fn test_missing_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (store, lexical, dense) = populated();
        Snapshot::write(dir.path(), &store, &lexical, &dense).unwrap();
        fs::remove_file(dir.path().join(DENSE_FILE)).unwrap();

        assert!(!Snapshot::exists(dir.path()));
        let err = Snapshot::load(dir.path()).unwrap_err();
        assert!(matches!(err, FuseError::Corrupt { .. }));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (store, lexical, dense) = populated();
        Snapshot::write(dir.path(), &store, &lexical, &dense).unwrap();
        fs::write(dir.path().join(LEXICAL_FILE), "not json").unwrap();

        let err = Snapshot::load(dir.path()).unwrap_err();
        assert!(matches!(err, FuseError::Corrupt { .. }));
    }

    #[test]
    fn test_version_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (store, lexical, dense) = populated();
        Snapshot::write(dir.path(), &store, &lexical, &dense).unwrap();

        // Rewrite one file with a bumped version field.
        let path = dir.path().join(CHUNKS_FILE);
        let content = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&content).unwrap();
        value["version"] = serde_json::json!(SNAPSHOT_VERSION + 1);
        fs::write(&path, value.to_string()).unwrap();

        let err = Snapshot::load(dir.path()).unwrap_err();
        assert!(matches!(err, FuseError::Corrupt { .. }));
    }

    #[test]
    fn test_disagreeing_chunk_sets_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (store, lexical, _) = populated();
        // Dense index persisted empty while the others hold one chunk.
        let empty_dense = DenseIndex::new(2);
        Snapshot::write(dir.path(), &store, &lexical, &empty_dense).unwrap();

        let err = Snapshot::load(dir.path()).unwrap_err();
        assert!(matches!(err, FuseError::Corrupt { .. }));
    }
}
