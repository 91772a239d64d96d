//! The chunk payload: one column of blocks plus its light grid.

use voxstore_light::{Edge, EdgeLight, LightGrid};
use voxstore_voxel::{BlockColumn, BlockId, BlockRegistry};

use crate::coords::{ChunkKey, local_index};

/// Block data changed since the last save.
pub const BLOCKS_DIRTY: u8 = 1 << 0;
/// Light data changed since the last save.
pub const LIGHT_DIRTY: u8 = 1 << 1;

/// A chunk column with its recorded world location.
///
/// The location is what the payload believes its address is; the manager
/// re-stamps it to the true storage address before every write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    x: i32,
    z: i32,
    blocks: BlockColumn,
    light: LightGrid,
    dirty: u8,
}

impl Chunk {
    /// Creates an empty (all air, unlit) chunk at `key`.
    pub fn new(key: ChunkKey) -> Self {
        Self::from_parts(key, BlockColumn::new(), LightGrid::new_dark())
    }

    pub(crate) fn from_parts(key: ChunkKey, blocks: BlockColumn, light: LightGrid) -> Self {
        Self {
            x: key.x,
            z: key.z,
            blocks,
            light,
            dirty: 0,
        }
    }

    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.x, self.z)
    }

    /// Recorded global x.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Recorded global z.
    pub fn z(&self) -> i32 {
        self.z
    }

    /// Local x within the owning region.
    pub fn local_x(&self) -> usize {
        local_index(self.x)
    }

    /// Local z within the owning region.
    pub fn local_z(&self) -> usize {
        local_index(self.z)
    }

    /// Re-stamps the recorded location.
    pub fn set_location(&mut self, key: ChunkKey) {
        self.x = key.x;
        self.z = key.z;
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks.get(x, y, z)
    }

    /// Writes a block, marking the chunk dirty if the cell changed.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) -> bool {
        let changed = self.blocks.set(x, y, z, block);
        if changed {
            self.dirty |= BLOCKS_DIRTY;
        }
        changed
    }

    /// Sets every cell to `block` and marks the chunk dirty.
    pub fn fill(&mut self, block: BlockId) {
        self.blocks.fill(block);
        self.dirty |= BLOCKS_DIRTY;
    }

    pub fn blocks(&self) -> &BlockColumn {
        &self.blocks
    }

    pub fn light(&self) -> &LightGrid {
        &self.light
    }

    /// Direct light access; callers are responsible for marking dirty.
    pub fn light_mut(&mut self) -> &mut LightGrid {
        &mut self.light
    }

    /// Clears both light channels.
    pub fn reset_light(&mut self) {
        self.light.reset_block_light();
        self.light.reset_sky_light();
        self.dirty |= LIGHT_DIRTY;
    }

    /// Recomputes both light channels from this chunk's own blocks.
    pub fn rebuild_light(&mut self, registry: &BlockRegistry) {
        self.light.rebuild_block_light(&self.blocks, registry);
        self.light.rebuild_sky_light(&self.blocks, registry);
        self.dirty |= LIGHT_DIRTY;
    }

    /// Border light on `edge`, for handing to the neighbor across it.
    pub fn edge_light(&self, edge: Edge) -> EdgeLight {
        self.light.extract_edge(edge)
    }

    /// Pulls block and sky light in across `edge` from the neighbor's
    /// facing border.
    pub fn stitch_light(&mut self, edge: Edge, neighbor: &EdgeLight, registry: &BlockRegistry) {
        self.light
            .stitch_block_light(&self.blocks, registry, edge, neighbor);
        self.light
            .stitch_sky_light(&self.blocks, registry, edge, neighbor);
        self.dirty |= LIGHT_DIRTY;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    /// Raw dirty flags ([`BLOCKS_DIRTY`], [`LIGHT_DIRTY`]).
    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty |= BLOCKS_DIRTY;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
