//! Dense block storage for one chunk column (16 × 128 × 16).
//!
//! Cells are laid out with `y` varying fastest so that a vertical column is a
//! contiguous slice, which keeps sky-light passes and run-length encoding
//! cheap.

use crate::registry::BlockId;
use crate::rle::{RleError, rle_decode, rle_encode, rle_from_bytes, rle_to_bytes};

/// Horizontal side length of a column in blocks.
pub const CHUNK_WIDTH: usize = 16;

/// Vertical extent of a column in blocks.
pub const CHUNK_HEIGHT: usize = 128;

/// Number of cells in a column.
pub const COLUMN_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

/// Linear index of `(x, y, z)` within a column.
///
/// Each coordinate must be in range; checked in debug builds only.
#[inline]
pub fn column_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_WIDTH);
    (x * CHUNK_WIDTH + z) * CHUNK_HEIGHT + y
}

fn in_bounds(x: usize, y: usize, z: usize) -> bool {
    x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_WIDTH
}

/// Block IDs for every cell of a chunk column.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockColumn {
    blocks: Box<[BlockId]>,
}

impl BlockColumn {
    /// Creates a column of air.
    pub fn new() -> Self {
        Self::new_filled(BlockId::AIR)
    }

    /// Creates a column where every cell holds `block`.
    pub fn new_filled(block: BlockId) -> Self {
        Self {
            blocks: vec![block; COLUMN_VOLUME].into_boxed_slice(),
        }
    }

    /// Returns the block at `(x, y, z)`, or air when out of bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockId {
        if !in_bounds(x, y, z) {
            tracing::warn!("BlockColumn::get out of bounds: ({}, {}, {})", x, y, z);
            return BlockId::AIR;
        }
        self.blocks[column_index(x, y, z)]
    }

    /// Writes `block` at `(x, y, z)`.
    ///
    /// Returns `true` if the stored value changed. Out-of-bounds writes are
    /// ignored with a warning.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockId) -> bool {
        if !in_bounds(x, y, z) {
            tracing::warn!("BlockColumn::set out of bounds: ({}, {}, {})", x, y, z);
            return false;
        }
        let cell = &mut self.blocks[column_index(x, y, z)];
        let changed = *cell != block;
        *cell = block;
        changed
    }

    /// Sets every cell to `block`.
    pub fn fill(&mut self, block: BlockId) {
        self.blocks.fill(block);
    }

    /// The vertical slice of cells at `(x, z)`, bottom first.
    pub fn column(&self, x: usize, z: usize) -> &[BlockId] {
        let start = column_index(x, 0, z);
        &self.blocks[start..start + CHUNK_HEIGHT]
    }

    /// Height of the topmost block at `(x, z)` for which `is_opaque` holds.
    pub fn highest_opaque(
        &self,
        x: usize,
        z: usize,
        is_opaque: impl Fn(BlockId) -> bool,
    ) -> Option<usize> {
        self.column(x, z).iter().rposition(|&block| is_opaque(block))
    }

    /// Number of cells holding something other than air.
    pub fn count_non_air(&self) -> usize {
        self.blocks.iter().filter(|&&b| b != BlockId::AIR).count()
    }

    /// Appends the run-length encoded cells to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let raw: Vec<u16> = self.blocks.iter().map(|b| b.0).collect();
        rle_to_bytes(&rle_encode(&raw), buf);
    }

    /// Decodes a column from the front of `data`.
    ///
    /// Returns the column and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), RleError> {
        let (runs, consumed) = rle_from_bytes::<u16>(data)?;
        let raw = rle_decode(&runs, COLUMN_VOLUME)?;
        let blocks = raw.into_iter().map(BlockId).collect();
        Ok((Self { blocks }, consumed))
    }
}

impl Default for BlockColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockColumn")
            .field("non_air", &self.count_non_air())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_column_is_air() {
        let column = BlockColumn::new();
        assert_eq!(column.get(0, 0, 0), BlockId::AIR);
        assert_eq!(column.get(15, 127, 15), BlockId::AIR);
        assert_eq!(column.count_non_air(), 0);
    }

    #[test]
    fn test_set_then_get() {
        let mut column = BlockColumn::new();
        assert!(column.set(3, 64, 9, BlockId(5)));
        assert_eq!(column.get(3, 64, 9), BlockId(5));
        assert_eq!(column.get(3, 65, 9), BlockId::AIR);
        assert!(!column.set(3, 64, 9, BlockId(5)), "same value is not a change");
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut column = BlockColumn::new_filled(BlockId(2));
        assert!(!column.set(16, 0, 0, BlockId(1)));
        assert!(!column.set(0, 128, 0, BlockId(1)));
        assert_eq!(column.get(0, 0, 16), BlockId::AIR);
        assert_eq!(column.count_non_air(), COLUMN_VOLUME);
    }

    #[test]
    fn test_vertical_slice_is_contiguous() {
        let mut column = BlockColumn::new();
        column.set(4, 0, 7, BlockId(1));
        column.set(4, 127, 7, BlockId(2));
        let slice = column.column(4, 7);
        assert_eq!(slice.len(), CHUNK_HEIGHT);
        assert_eq!(slice[0], BlockId(1));
        assert_eq!(slice[127], BlockId(2));
    }

    #[test]
    fn test_highest_opaque_scans_from_top() {
        let mut column = BlockColumn::new();
        column.set(2, 10, 2, BlockId(1));
        column.set(2, 70, 2, BlockId(2));
        column.set(2, 90, 2, BlockId(3));
        let solid = |b: BlockId| b == BlockId(1) || b == BlockId(2);
        assert_eq!(column.highest_opaque(2, 2, solid), Some(70));
        assert_eq!(column.highest_opaque(3, 3, solid), None);
    }

    #[test]
    fn test_encode_decode_preserves_cells() {
        let mut column = BlockColumn::new();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                for y in 0..(x + z) {
                    column.set(x, y, z, BlockId(1 + (y % 3) as u16));
                }
            }
        }
        let mut buf = Vec::new();
        column.encode(&mut buf);
        let (decoded, consumed) = BlockColumn::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, column);
    }

    #[test]
    fn test_empty_column_encodes_small() {
        let mut buf = Vec::new();
        BlockColumn::new().encode(&mut buf);
        assert_eq!(buf.len(), 4 + 4, "one run plus the run count");
    }
}
