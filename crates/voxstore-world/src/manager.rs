//! The chunk manager: chunk CRUD, caching and batched persistence on top of
//! a [`RegionStore`].
//!
//! Regions are created on the first write inside them and deleted when their
//! last chunk is deleted, so a region exists exactly when it holds a chunk.
//! Every payload handed to a region is first stamped with its true address.

use std::sync::Arc;

use voxstore_light::Edge;
use voxstore_voxel::BlockRegistry;

use crate::Result;
use crate::cache::ChunkCache;
use crate::chunk::Chunk;
use crate::coords::{ChunkKey, RegionKey, local_index};
use crate::iter::{ChunkCursor, ChunkIter};
use crate::region::{Region, RegionStore};

/// Lightweight handle to a chunk that existed when the handle was issued.
///
/// The payload itself is reached through [`ChunkManager::chunk`] and
/// [`ChunkManager::chunk_mut`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkRef {
    key: ChunkKey,
}

impl ChunkRef {
    pub(crate) fn new(key: ChunkKey) -> Self {
        Self { key }
    }

    pub fn key(self) -> ChunkKey {
        self.key
    }

    /// Global chunk x.
    pub fn x(self) -> i32 {
        self.key.x
    }

    /// Global chunk z.
    pub fn z(self) -> i32 {
        self.key.z
    }

    /// Local x within the owning region.
    pub fn local_x(self) -> usize {
        local_index(self.key.x)
    }

    /// Local z within the owning region.
    pub fn local_z(self) -> usize {
        local_index(self.key.z)
    }

    /// Key of the chunk across `edge`.
    pub fn neighbor_key(self, edge: Edge) -> ChunkKey {
        self.key.neighbor(edge)
    }
}

/// Owner of a world's region backend and chunk cache.
///
/// All mutation goes through `&mut self`; wrap the manager in a lock to share
/// it between threads.
pub struct ChunkManager<S: RegionStore> {
    pub(crate) store: S,
    pub(crate) cache: ChunkCache,
    pub(crate) registry: Arc<BlockRegistry>,
}

impl<S: RegionStore> ChunkManager<S> {
    pub fn new(store: S, registry: Arc<BlockRegistry>) -> Self {
        Self {
            store,
            cache: ChunkCache::new(),
            registry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the manager, discarding unsaved cache state.
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    // -- lookup ------------------------------------------------------------

    /// Returns an owned copy of the chunk at `(cx, cz)`.
    ///
    /// Cached state wins over the stored payload, so unsaved edits are
    /// visible. Returns `None` if the chunk does not exist.
    pub fn get_chunk(&self, cx: i32, cz: i32) -> Result<Option<Chunk>> {
        let key = ChunkKey::new(cx, cz);
        if let Some(chunk) = self.cache.get(key) {
            return Ok(Some(chunk.clone()));
        }
        let (lx, lz) = key.local();
        match self.store.region(key.region()) {
            Some(region) => region.load_chunk(lx, lz),
            None => Ok(None),
        }
    }

    /// A handle to the chunk at `(cx, cz)` if it exists. Does not load it.
    pub fn get_chunk_handle(&self, cx: i32, cz: i32) -> Option<ChunkRef> {
        let key = ChunkKey::new(cx, cz);
        (self.cache.contains(key) || self.chunk_exists(cx, cz)).then(|| ChunkRef::new(key))
    }

    /// The payload behind `handle`, loading it into the cache on first
    /// access. `None` if the chunk has been deleted since.
    pub fn chunk(&mut self, handle: ChunkRef) -> Result<Option<&Chunk>> {
        if !self.ensure_cached(handle.key)? {
            return Ok(None);
        }
        Ok(self.cache.get(handle.key))
    }

    /// Mutable access to the payload behind `handle`. Edits made through
    /// the chunk's own setters are picked up by the next save.
    pub fn chunk_mut(&mut self, handle: ChunkRef) -> Result<Option<&mut Chunk>> {
        if !self.ensure_cached(handle.key)? {
            return Ok(None);
        }
        Ok(self.cache.get_mut(handle.key))
    }

    /// `true` if the backend holds a chunk at `(cx, cz)`.
    pub fn chunk_exists(&self, cx: i32, cz: i32) -> bool {
        let key = ChunkKey::new(cx, cz);
        let (lx, lz) = key.local();
        self.store
            .region(key.region())
            .is_some_and(|region| region.chunk_exists(lx, lz))
    }

    /// Loads `key` into the cache if it is not already resident. Returns
    /// `false` when the chunk does not exist.
    pub(crate) fn ensure_cached(&mut self, key: ChunkKey) -> Result<bool> {
        if self.cache.contains(key) {
            return Ok(true);
        }
        let (lx, lz) = key.local();
        let Some(region) = self.store.region(key.region()) else {
            return Ok(false);
        };
        let Some(chunk) = region.load_chunk(lx, lz)? else {
            return Ok(false);
        };
        tracing::trace!(chunk = %key, "loaded chunk into cache");
        self.cache.insert(key, chunk);
        Ok(true)
    }

    // -- neighbors ---------------------------------------------------------

    /// The chunk across `edge` from `handle`, loading it into the cache.
    pub fn neighbor(&mut self, handle: ChunkRef, edge: Edge) -> Result<Option<ChunkRef>> {
        let key = handle.neighbor_key(edge);
        Ok(self.ensure_cached(key)?.then(|| ChunkRef::new(key)))
    }

    /// Neighbor at `x - 1`.
    pub fn north(&mut self, handle: ChunkRef) -> Result<Option<ChunkRef>> {
        self.neighbor(handle, Edge::North)
    }

    /// Neighbor at `x + 1`.
    pub fn south(&mut self, handle: ChunkRef) -> Result<Option<ChunkRef>> {
        self.neighbor(handle, Edge::South)
    }

    /// Neighbor at `z - 1`.
    pub fn east(&mut self, handle: ChunkRef) -> Result<Option<ChunkRef>> {
        self.neighbor(handle, Edge::East)
    }

    /// Neighbor at `z + 1`.
    pub fn west(&mut self, handle: ChunkRef) -> Result<Option<ChunkRef>> {
        self.neighbor(handle, Edge::West)
    }

    // -- create / write / delete -------------------------------------------

    /// Writes an empty chunk at `(cx, cz)`, creating the region if needed.
    ///
    /// An existing chunk at that address is overwritten; check
    /// [`chunk_exists`](Self::chunk_exists) first if that matters.
    pub fn create_chunk(&mut self, cx: i32, cz: i32) -> Result<ChunkRef> {
        let key = ChunkKey::new(cx, cz);
        let (lx, lz) = key.local();
        let chunk = self.write_into_region(key.region(), |region| region.create_chunk(lx, lz))?;
        self.replace_cached(key, chunk);
        tracing::debug!(chunk = %key, "created chunk");
        Ok(ChunkRef::new(key))
    }

    /// Stores `chunk` at `(cx, cz)`, overwriting whatever is there.
    ///
    /// The payload is re-stamped to `(cx, cz)` first, whatever location it
    /// recorded.
    pub fn set_chunk(&mut self, cx: i32, cz: i32, mut chunk: Chunk) -> Result<ChunkRef> {
        let key = ChunkKey::new(cx, cz);
        chunk.set_location(key);
        self.write_into_region(key.region(), |region| region.save_chunk(&chunk))?;
        chunk.clear_dirty();
        self.replace_cached(key, chunk);
        tracing::debug!(chunk = %key, "stored chunk");
        Ok(ChunkRef::new(key))
    }

    /// Writes a standalone payload into the region matching its recorded
    /// location. Returns `false` if that region does not exist.
    pub fn save_chunk(&mut self, chunk: &Chunk) -> Result<bool> {
        let key = chunk.key();
        let Some(region) = self.store.region_mut(key.region()) else {
            return Ok(false);
        };
        if !region.save_chunk(chunk)? {
            return Ok(false);
        }
        if self.cache.contains(key) {
            let mut fresh = chunk.clone();
            fresh.clear_dirty();
            self.replace_cached(key, fresh);
        }
        Ok(true)
    }

    /// Deletes the chunk at `(cx, cz)`, and its region if it was the last
    /// chunk there.
    ///
    /// Returns `false` if there was nothing to delete.
    pub fn delete_chunk(&mut self, cx: i32, cz: i32) -> Result<bool> {
        let key = ChunkKey::new(cx, cz);
        let (lx, lz) = key.local();
        let Some(region) = self.store.region_mut(key.region()) else {
            return Ok(false);
        };
        if !region.delete_chunk(lx, lz)? {
            return Ok(false);
        }
        self.cache.remove(key);
        tracing::debug!(chunk = %key, "deleted chunk");
        self.prune_region_if_empty(key.region())?;
        Ok(true)
    }

    /// Runs `write` against the region at `key`, creating the region first
    /// if needed. A region created here is removed again when the write
    /// fails.
    fn write_into_region<T>(
        &mut self,
        key: RegionKey,
        write: impl FnOnce(&mut S::Region) -> Result<T>,
    ) -> Result<T> {
        let created = !self.store.region_exists(key);
        let region = self.store.create_region(key)?;
        match write(region) {
            Ok(value) => Ok(value),
            Err(err) => {
                if created && let Err(prune_err) = self.prune_region_if_empty(key) {
                    tracing::warn!(
                        region = %key,
                        error = %prune_err,
                        "failed to remove empty region"
                    );
                }
                Err(err)
            }
        }
    }

    /// Deletes the region at `key` if it no longer holds any chunk.
    fn prune_region_if_empty(&mut self, key: RegionKey) -> Result<()> {
        let empty = self
            .store
            .region(key)
            .is_some_and(|region| region.chunk_count() == 0);
        if empty {
            self.store.delete_region(key)?;
            tracing::debug!(region = %key, "deleted empty region");
        }
        Ok(())
    }

    /// Copies the chunk at `(src_x, src_z)` to `(dst_x, dst_z)`.
    ///
    /// The destination receives an independent copy; later edits to either
    /// chunk never show up in the other. Returns `None` if the source does
    /// not exist.
    pub fn copy_chunk(
        &mut self,
        src_x: i32,
        src_z: i32,
        dst_x: i32,
        dst_z: i32,
    ) -> Result<Option<ChunkRef>> {
        let Some(copy) = self.get_chunk(src_x, src_z)? else {
            return Ok(None);
        };
        self.set_chunk(dst_x, dst_z, copy).map(Some)
    }

    fn replace_cached(&mut self, key: ChunkKey, chunk: Chunk) {
        self.cache.remove(key);
        self.cache.insert(key, chunk);
    }

    /// Marks the chunk behind `handle` for the next save, loading it if
    /// needed. Returns `false` if it no longer exists.
    pub fn mark_dirty(&mut self, handle: ChunkRef) -> Result<bool> {
        Ok(self.ensure_cached(handle.key)? && self.cache.mark_dirty(handle.key))
    }

    // -- timestamps and addressing -----------------------------------------

    /// Slot timestamp of `(cx, cz)`, 0 when the region or chunk is absent.
    pub fn get_chunk_timestamp(&self, cx: i32, cz: i32) -> u32 {
        let key = ChunkKey::new(cx, cz);
        let (lx, lz) = key.local();
        self.store
            .region(key.region())
            .map_or(0, |region| region.timestamp(lx, lz))
    }

    /// Overwrites the slot timestamp of `(cx, cz)`. Ignored when the region
    /// is absent.
    pub fn set_chunk_timestamp(&mut self, cx: i32, cz: i32, timestamp: u32) -> Result<()> {
        let key = ChunkKey::new(cx, cz);
        let (lx, lz) = key.local();
        match self.store.region_mut(key.region()) {
            Some(region) => region.set_timestamp(lx, lz, timestamp),
            None => Ok(()),
        }
    }

    pub fn chunk_global_x(&self, cx: i32) -> i32 {
        cx
    }

    pub fn chunk_global_z(&self, cz: i32) -> i32 {
        cz
    }

    pub fn chunk_local_x(&self, cx: i32) -> usize {
        local_index(cx)
    }

    pub fn chunk_local_z(&self, cz: i32) -> usize {
        local_index(cz)
    }

    // -- persistence -------------------------------------------------------

    /// Writes every dirty chunk to its region and returns how many were
    /// written.
    ///
    /// Dirty chunks whose region no longer exists are skipped. The dirty set
    /// is cleared afterwards, skipped entries included. On an I/O error the
    /// flush stops and the dirty set is left as it was.
    pub fn save(&mut self) -> Result<usize> {
        self.cache.sync_dirty();
        let mut written = 0;
        for key in self.cache.dirty_keys() {
            let Some(chunk) = self.cache.get_mut(key) else {
                continue;
            };
            let Some(region) = self.store.region_mut(key.region()) else {
                tracing::debug!(chunk = %key, "skipping dirty chunk without a region");
                continue;
            };
            if chunk.key() != key {
                chunk.set_location(key);
            }
            let (lx, lz) = key.local();
            let mut writer = region.slot_writer(lx, lz);
            chunk.save(&mut writer)?;
            writer.finish()?;
            written += 1;
        }
        self.cache.clear_dirty();
        tracing::debug!(written, "saved dirty chunks");
        Ok(written)
    }

    // -- traversal ---------------------------------------------------------

    /// Iterates over every stored chunk: regions in the order
    /// [`RegionStore::region_keys`] lists them, then slots row-major within
    /// each region.
    pub fn iter(&self) -> ChunkIter<'_, S> {
        ChunkIter::new(&self.store)
    }

    /// A manually driven cursor over the same sequence as [`iter`](Self::iter).
    pub fn cursor(&self) -> ChunkCursor {
        ChunkCursor::new(&self.store)
    }
}

impl<S: RegionStore + std::fmt::Debug> std::fmt::Debug for ChunkManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("store", &self.store)
            .field("cached", &self.cache.len())
            .field("dirty", &self.cache.dirty_len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
