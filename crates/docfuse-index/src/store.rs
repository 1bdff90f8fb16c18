//! Insertion-ordered chunk store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use docfuse_core::{Chunk, ChunkId};

/// In-memory collection of chunks with stable identifiers.
///
/// Preserves insertion order (the order chunks were first ingested), which
/// both indices rely on for deterministic tie-breaking. Upserting an
/// existing id is a no-op: chunk content for a given id never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    #[serde(skip)]
    by_id: HashMap<ChunkId, usize>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk if its id is not already present.
    ///
    /// Returns `true` when the chunk was newly inserted.
    pub fn upsert(&mut self, chunk: Chunk) -> bool {
        if self.by_id.contains_key(&chunk.id) {
            return false;
        }
        self.by_id.insert(chunk.id.clone(), self.chunks.len());
        self.chunks.push(chunk);
        true
    }

    pub fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }

    pub fn contains(&self, id: &ChunkId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All chunk ids in insertion order.
    pub fn ids(&self) -> Vec<ChunkId> {
        self.chunks.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Restore the id map after deserialization.
    pub(crate) fn rebuild_id_map(&mut self) {
        self.by_id = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, offset: u32, text: &str) -> Chunk {
        Chunk::new(source, 0, offset, text)
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = ChunkStore::new();
        let c = chunk("a.pdf", 0, "hello");
        assert!(store.upsert(c.clone()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&c.id).unwrap().text, "hello");
    }

    #[test]
    fn test_upsert_existing_is_noop() {
        let mut store = ChunkStore::new();
        let c = chunk("a.pdf", 0, "hello");
        assert!(store.upsert(c.clone()));
        assert!(!store.upsert(c.clone()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_preserve_insertion_order() {
        let mut store = ChunkStore::new();
        let c1 = chunk("a.pdf", 0, "first");
        let c2 = chunk("a.pdf", 100, "second");
        store.upsert(c1.clone());
        store.upsert(c2.clone());
        assert_eq!(store.ids(), vec![c1.id, c2.id]);
    }

    #[test]
    fn test_serde_round_trip_restores_lookup() {
        let mut store = ChunkStore::new();
        let c = chunk("a.pdf", 0, "hello");
        store.upsert(c.clone());

        let json = serde_json::to_string(&store).unwrap();
        let mut back: ChunkStore = serde_json::from_str(&json).unwrap();
        back.rebuild_id_map();
        assert!(back.contains(&c.id));
    }
}
