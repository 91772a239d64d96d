//! Relighting of dirty chunks.
//!
//! Runs in three passes over a sorted snapshot of the dirty set:
//!
//! 1. **Reset** block and sky light of every dirty chunk.
//! 2. **Rebuild** each dirty chunk from its own blocks, ignoring neighbors.
//! 3. **Stitch** each dirty chunk against every clean neighbor, pulling
//!    light in across the shared edge.
//!
//! Two dirty chunks that share an edge are not stitched to each other in the
//! same pass, so light does not yet cross between them. Relighting again
//! once one side has been saved closes the seam.

use voxstore_light::{Edge, EdgeLight};

use crate::Result;
use crate::coords::ChunkKey;
use crate::manager::ChunkManager;
use crate::region::RegionStore;

impl<S: RegionStore> ChunkManager<S> {
    /// Recomputes light for every dirty chunk and returns how many were
    /// relit.
    ///
    /// Clean neighbors are loaded into the cache as needed; missing ones are
    /// skipped. Relit chunks stay dirty so the next save persists their new
    /// light.
    pub fn relight_dirty_chunks(&mut self) -> Result<usize> {
        self.cache.sync_dirty();
        let dirty = self.cache.dirty_keys();
        if dirty.is_empty() {
            return Ok(0);
        }

        for &key in &dirty {
            if let Some(chunk) = self.cache.get_mut(key) {
                chunk.reset_light();
            }
        }

        for &key in &dirty {
            if let Some(chunk) = self.cache.get_mut(key) {
                chunk.rebuild_light(&self.registry);
            }
        }

        let mut stitched = 0usize;
        for &key in &dirty {
            for edge in Edge::ALL {
                let neighbor = key.neighbor(edge);
                if self.cache.is_dirty(neighbor) {
                    continue;
                }
                let Some(border) = self.neighbor_border(neighbor, edge.opposite())? else {
                    continue;
                };
                if let Some(chunk) = self.cache.get_mut(key) {
                    chunk.stitch_light(edge, &border, &self.registry);
                    stitched += 1;
                }
            }
        }

        tracing::debug!(chunks = dirty.len(), edges = stitched, "relit dirty chunks");
        Ok(dirty.len())
    }

    /// Border light on `face` of the chunk at `key`, loading it if needed.
    fn neighbor_border(&mut self, key: ChunkKey, face: Edge) -> Result<Option<EdgeLight>> {
        if !self.ensure_cached(key)? {
            return Ok(None);
        }
        Ok(self.cache.get(key).map(|chunk| chunk.edge_light(face)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use voxstore_voxel::{BlockDef, BlockId, BlockRegistry, Transparency};

    use crate::manager::ChunkManager;
    use crate::region::MemoryRegionStore;

    const STONE: BlockId = BlockId(1);
    const TORCH: BlockId = BlockId(2);

    fn manager() -> ChunkManager<MemoryRegionStore> {
        let registry = BlockRegistry::from_defs([
            BlockDef::new("stone", Transparency::Opaque),
            BlockDef::new("torch", Transparency::FullyTransparent).with_emission(14),
        ])
        .unwrap();
        ChunkManager::new(MemoryRegionStore::new(), Arc::new(registry))
    }

    #[test]
    fn test_nothing_dirty_is_a_no_op() {
        let mut mgr = manager();
        mgr.create_chunk(0, 0).unwrap();
        assert_eq!(mgr.relight_dirty_chunks().unwrap(), 0);
    }

    #[test]
    fn test_relight_computes_internal_light() {
        let mut mgr = manager();
        let handle = mgr.create_chunk(0, 0).unwrap();
        {
            let chunk = mgr.chunk_mut(handle).unwrap().unwrap();
            chunk.set_block(8, 60, 8, STONE);
            chunk.set_block(8, 20, 8, TORCH);
        }
        assert_eq!(mgr.relight_dirty_chunks().unwrap(), 1);
        let chunk = mgr.chunk(handle).unwrap().unwrap();
        assert_eq!(chunk.light().get(8, 20, 8).block_light(), 14);
        assert_eq!(chunk.light().get(8, 61, 8).sky_light(), 15);
        assert!(chunk.is_dirty(), "relit chunks wait for the next save");
    }

    #[test]
    fn test_relight_is_repeatable() {
        let mut mgr = manager();
        let handle = mgr.create_chunk(0, 0).unwrap();
        mgr.chunk_mut(handle)
            .unwrap()
            .unwrap()
            .set_block(3, 3, 3, TORCH);
        mgr.relight_dirty_chunks().unwrap();
        let first = mgr.get_chunk(0, 0).unwrap().unwrap();
        mgr.relight_dirty_chunks().unwrap();
        let second = mgr.get_chunk(0, 0).unwrap().unwrap();
        assert_eq!(first.light(), second.light());
    }
}
