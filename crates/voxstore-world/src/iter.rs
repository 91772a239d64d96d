//! Lazy traversal of every stored chunk.
//!
//! Regions are visited in the order the backend lists them (ascending key
//! for both bundled backends), and within a region slots are visited
//! row-major: outer local x, inner local z. Empty slots are skipped. Nothing
//! beyond the region key list is materialized.

use std::iter::FusedIterator;

use crate::Result;
use crate::coords::{REGION_SLOTS, RegionKey, slot_local};
use crate::error::WorldError;
use crate::manager::ChunkRef;
use crate::region::{Region, RegionStore};

/// Explicit traversal state: a region index and the next slot to probe.
///
/// The cursor does not borrow the store, so the store is passed to every
/// step. Mutating the store between steps is allowed; slots are probed as
/// the cursor reaches them.
#[derive(Clone, Debug)]
pub struct ChunkCursor {
    regions: Vec<RegionKey>,
    region: usize,
    next_slot: usize,
    current: Option<ChunkRef>,
}

impl ChunkCursor {
    /// A cursor positioned before the first chunk of `store`.
    pub fn new<S: RegionStore>(store: &S) -> Self {
        Self {
            regions: store.region_keys(),
            region: 0,
            next_slot: 0,
            current: None,
        }
    }

    /// Moves to the next stored chunk. Returns `false` once every region is
    /// exhausted, and keeps returning `false` afterwards.
    pub fn advance<S: RegionStore>(&mut self, store: &S) -> bool {
        while let Some(&key) = self.regions.get(self.region) {
            if let Some(region) = store.region(key) {
                while self.next_slot < REGION_SLOTS {
                    let (lx, lz) = slot_local(self.next_slot);
                    self.next_slot += 1;
                    if region.slot_exists(lx, lz) {
                        self.current = Some(ChunkRef::new(key.chunk_key(lx, lz)));
                        return true;
                    }
                }
            }
            self.region += 1;
            self.next_slot = 0;
        }
        self.current = None;
        false
    }

    /// The chunk the cursor is on.
    ///
    /// # Errors
    ///
    /// [`WorldError::IteratorMisuse`] before the first successful
    /// [`advance`](Self::advance) and after exhaustion.
    pub fn current(&self) -> Result<ChunkRef> {
        self.current.ok_or(WorldError::IteratorMisuse)
    }

    /// Rewinds to before the first chunk, re-reading the region list.
    pub fn reset<S: RegionStore>(&mut self, store: &S) {
        self.regions = store.region_keys();
        self.region = 0;
        self.next_slot = 0;
        self.current = None;
    }
}

/// [`Iterator`] adapter over a [`ChunkCursor`].
pub struct ChunkIter<'a, S: RegionStore> {
    store: &'a S,
    cursor: ChunkCursor,
}

impl<'a, S: RegionStore> ChunkIter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cursor: ChunkCursor::new(store),
        }
    }

    /// Restarts the traversal from the first chunk.
    pub fn reset(&mut self) {
        self.cursor.reset(self.store);
    }
}

impl<S: RegionStore> Iterator for ChunkIter<'_, S> {
    type Item = ChunkRef;

    fn next(&mut self) -> Option<ChunkRef> {
        if self.cursor.advance(self.store) {
            self.cursor.current().ok()
        } else {
            None
        }
    }
}

impl<S: RegionStore> FusedIterator for ChunkIter<'_, S> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
