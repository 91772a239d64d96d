//! Per-cell light storage and in-column flood fill.
//!
//! Each cell packs two 4-bit levels into one byte: the high nibble is sky
//! light, the low nibble block (emissive) light. Light spreads by BFS with a
//! decay of 1 per step, 2 when entering a semi-transparent block, and never
//! enters an opaque block.

use std::collections::VecDeque;

use voxstore_voxel::{
    BlockColumn, BlockRegistry, CHUNK_HEIGHT, CHUNK_WIDTH, COLUMN_VOLUME, RleError, Transparency,
    column_index, rle_decode, rle_encode, rle_from_bytes, rle_to_bytes,
};

/// Packed light value: high nibble = sky light, low nibble = block light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoxelLight(pub u8);

impl VoxelLight {
    /// Maximum level for either channel.
    pub const MAX_LEVEL: u8 = 15;

    /// Sky light level (0–15).
    pub fn sky_light(self) -> u8 {
        (self.0 >> 4) & 0xF
    }

    /// Block light level (0–15).
    pub fn block_light(self) -> u8 {
        self.0 & 0xF
    }

    pub fn set_sky_light(&mut self, level: u8) {
        debug_assert!(level <= Self::MAX_LEVEL);
        self.0 = (self.0 & 0x0F) | (level << 4);
    }

    pub fn set_block_light(&mut self, level: u8) {
        debug_assert!(level <= Self::MAX_LEVEL);
        self.0 = (self.0 & 0xF0) | (level & 0x0F);
    }
}

/// Selects one of the two packed light channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Channel {
    Block,
    Sky,
}

impl Channel {
    pub(crate) fn level(self, light: VoxelLight) -> u8 {
        match self {
            Channel::Block => light.block_light(),
            Channel::Sky => light.sky_light(),
        }
    }

    pub(crate) fn set(self, light: &mut VoxelLight, level: u8) {
        match self {
            Channel::Block => light.set_block_light(level),
            Channel::Sky => light.set_sky_light(level),
        }
    }
}

/// Cost of moving light into a block, or `None` if light cannot enter it.
pub(crate) fn entry_decay(registry: &BlockRegistry, blocks: &BlockColumn, cell: Cell) -> Option<u8> {
    let (x, y, z) = cell;
    match registry.transparency(blocks.get(x, y, z)) {
        Transparency::Opaque => None,
        Transparency::SemiTransparent => Some(2),
        Transparency::FullyTransparent => Some(1),
    }
}

pub(crate) type Cell = (usize, usize, usize);

const NEIGHBORS_6: [(isize, isize, isize); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn neighbors((x, y, z): Cell) -> impl Iterator<Item = Cell> {
    NEIGHBORS_6.into_iter().filter_map(move |(dx, dy, dz)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        let nz = z.checked_add_signed(dz)?;
        (nx < CHUNK_WIDTH && ny < CHUNK_HEIGHT && nz < CHUNK_WIDTH).then_some((nx, ny, nz))
    })
}

/// Light levels for every cell of a chunk column.
#[derive(Clone, PartialEq, Eq)]
pub struct LightGrid {
    data: Box<[VoxelLight]>,
}

impl LightGrid {
    /// Creates a grid with both channels at zero.
    pub fn new_dark() -> Self {
        Self {
            data: vec![VoxelLight(0); COLUMN_VOLUME].into_boxed_slice(),
        }
    }

    /// Light at `(x, y, z)`. Each coordinate must be in range.
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelLight {
        self.data[column_index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, light: VoxelLight) {
        self.data[column_index(x, y, z)] = light;
    }

    /// Zeroes the block-light channel, leaving sky light untouched.
    pub fn reset_block_light(&mut self) {
        for light in self.data.iter_mut() {
            light.set_block_light(0);
        }
    }

    /// Zeroes the sky-light channel, leaving block light untouched.
    pub fn reset_sky_light(&mut self) {
        for light in self.data.iter_mut() {
            light.set_sky_light(0);
        }
    }

    /// Recomputes block light from the emitters inside this column.
    ///
    /// Existing levels are only ever raised, so call
    /// [`reset_block_light`](Self::reset_block_light) first for a clean
    /// rebuild.
    pub fn rebuild_block_light(&mut self, blocks: &BlockColumn, registry: &BlockRegistry) {
        let mut queue = VecDeque::new();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                for (y, &block) in blocks.column(x, z).iter().enumerate() {
                    let emission = registry.light_emission(block);
                    if emission == 0 {
                        continue;
                    }
                    let mut light = self.get(x, y, z);
                    if emission > light.block_light() {
                        light.set_block_light(emission);
                        self.set(x, y, z, light);
                    }
                    queue.push_back((x, y, z));
                }
            }
        }
        self.flood(&mut queue, blocks, registry, Channel::Block);
    }

    /// Recomputes sky light for this column in isolation.
    ///
    /// Sky light enters every vertical column at full strength from the top
    /// and falls without decay until it meets an opaque block; each
    /// semi-transparent block on the way down dims it by one. The result then
    /// spreads sideways by flood fill.
    pub fn rebuild_sky_light(&mut self, blocks: &BlockColumn, registry: &BlockRegistry) {
        let mut queue = VecDeque::new();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                let mut level = VoxelLight::MAX_LEVEL;
                for (y, &block) in blocks.column(x, z).iter().enumerate().rev() {
                    match registry.transparency(block) {
                        Transparency::Opaque => break,
                        Transparency::SemiTransparent => level = level.saturating_sub(1),
                        Transparency::FullyTransparent => {}
                    }
                    if level == 0 {
                        break;
                    }
                    let mut light = self.get(x, y, z);
                    if level > light.sky_light() {
                        light.set_sky_light(level);
                        self.set(x, y, z, light);
                    }
                    if level > 1 {
                        queue.push_back((x, y, z));
                    }
                }
            }
        }
        self.flood(&mut queue, blocks, registry, Channel::Sky);
    }

    /// Spreads `channel` outward from every queued cell until it settles.
    pub(crate) fn flood(
        &mut self,
        queue: &mut VecDeque<Cell>,
        blocks: &BlockColumn,
        registry: &BlockRegistry,
        channel: Channel,
    ) {
        while let Some(cell) = queue.pop_front() {
            let level = channel.level(self.get(cell.0, cell.1, cell.2));
            if level <= 1 {
                continue;
            }
            for next in neighbors(cell) {
                let Some(decay) = entry_decay(registry, blocks, next) else {
                    continue;
                };
                if level <= decay {
                    continue;
                }
                let (nx, ny, nz) = next;
                let mut light = self.get(nx, ny, nz);
                if channel.level(light) >= level - decay {
                    continue;
                }
                channel.set(&mut light, level - decay);
                self.set(nx, ny, nz, light);
                queue.push_back(next);
            }
        }
    }

    /// Appends the run-length encoded grid to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let raw: Vec<u8> = self.data.iter().map(|light| light.0).collect();
        rle_to_bytes(&rle_encode(&raw), buf);
    }

    /// Decodes a grid from the front of `data`, returning it with the number
    /// of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), RleError> {
        let (runs, consumed) = rle_from_bytes::<u8>(data)?;
        let raw = rle_decode(&runs, COLUMN_VOLUME)?;
        let data = raw.into_iter().map(VoxelLight).collect();
        Ok((Self { data }, consumed))
    }
}

impl Default for LightGrid {
    fn default() -> Self {
        Self::new_dark()
    }
}

impl std::fmt::Debug for LightGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.data.iter().filter(|light| light.0 != 0).count();
        f.debug_struct("LightGrid").field("lit_cells", &lit).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
