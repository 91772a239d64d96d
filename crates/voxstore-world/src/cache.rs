//! Write-back buffer of loaded chunks.
//!
//! The cache is unbounded: chunks stay resident until they are removed
//! explicitly. The dirty set records which keys need writing on the next
//! save; [`ChunkCache::sync_dirty`] folds in chunks that were edited in place
//! through their own dirty flags.

use std::collections::hash_map::Entry;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::chunk::Chunk;
use crate::coords::ChunkKey;

/// Loaded chunks keyed by [`ChunkKey`], plus the set of dirty keys.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: FxHashMap<ChunkKey, Chunk>,
    dirty: FxHashSet<ChunkKey>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn get(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn get_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        self.chunks.get_mut(&key)
    }

    /// Inserts or replaces the chunk at `key`. A dirty chunk joins the dirty
    /// set.
    pub fn insert(&mut self, key: ChunkKey, chunk: Chunk) -> &mut Chunk {
        if chunk.is_dirty() {
            self.dirty.insert(key);
        }
        match self.chunks.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(chunk);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(chunk),
        }
    }

    /// Evicts the chunk at `key` and drops it from the dirty set.
    pub fn remove(&mut self, key: ChunkKey) -> Option<Chunk> {
        self.dirty.remove(&key);
        self.chunks.remove(&key)
    }

    /// Adds a resident chunk to the dirty set. Returns `false` if `key` is
    /// not resident.
    pub fn mark_dirty(&mut self, key: ChunkKey) -> bool {
        match self.chunks.get_mut(&key) {
            Some(chunk) => {
                chunk.mark_dirty();
                self.dirty.insert(key);
                true
            }
            None => false,
        }
    }

    /// Adds every resident chunk whose own dirty flags are set to the dirty
    /// set.
    pub fn sync_dirty(&mut self) {
        self.dirty.extend(
            self.chunks
                .iter()
                .filter(|(_, chunk)| chunk.is_dirty())
                .map(|(&key, _)| key),
        );
    }

    /// Dirty keys in ascending order.
    pub fn dirty_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.dirty.iter().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, key: ChunkKey) -> bool {
        self.dirty.contains(&key)
    }

    /// Empties the dirty set and clears the flags of the chunks in it.
    pub fn clear_dirty(&mut self) {
        for key in self.dirty.drain() {
            if let Some(chunk) = self.chunks.get_mut(&key) {
                chunk.clear_dirty();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
