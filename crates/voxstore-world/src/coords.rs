//! Chunk and region addressing.
//!
//! A chunk coordinate `c` lives in region `c >> 5` at local slot `c & 31`.
//! The shift is arithmetic, so negative coordinates round toward negative
//! infinity and `region * 32 + local == c` holds over the whole `i32` range:
//! chunk `-1` is local slot 31 of region `-1`, chunk `-33` is local slot 31
//! of region `-2`.

use voxstore_light::Edge;

/// Bits of a chunk coordinate that select the local slot.
pub const REGION_SHIFT: u32 = 5;

/// Chunks along one side of a region.
pub const REGION_SIZE: usize = 1 << REGION_SHIFT;

/// Mask extracting the local slot from a chunk coordinate.
pub const REGION_MASK: i32 = (1 << REGION_SHIFT) - 1;

/// Chunk slots per region.
pub const REGION_SLOTS: usize = REGION_SIZE * REGION_SIZE;

/// Region coordinate containing chunk coordinate `c`.
#[inline]
pub fn region_index(c: i32) -> i32 {
    c >> REGION_SHIFT
}

/// Local slot coordinate (0..32) of chunk coordinate `c` within its region.
#[inline]
pub fn local_index(c: i32) -> usize {
    (c & REGION_MASK) as usize
}

/// Chunk coordinate of local slot `local` in region `region`.
///
/// Wrapping arithmetic keeps the reassembly exact at the `i32` extremes.
#[inline]
pub fn global_coordinate(region: i32, local: usize) -> i32 {
    debug_assert!(local < REGION_SIZE);
    region.wrapping_shl(REGION_SHIFT).wrapping_add(local as i32)
}

/// Global chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region holding this chunk.
    pub fn region(self) -> RegionKey {
        RegionKey::new(region_index(self.x), region_index(self.z))
    }

    /// Local `(x, z)` slot within [`region`](Self::region).
    pub fn local(self) -> (usize, usize) {
        (local_index(self.x), local_index(self.z))
    }

    /// The chunk across `edge`.
    pub fn neighbor(self, edge: Edge) -> ChunkKey {
        let (dx, dz) = edge.offset();
        ChunkKey::new(self.x.wrapping_add(dx), self.z.wrapping_add(dz))
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Region coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey {
    pub x: i32,
    pub z: i32,
}

impl RegionKey {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Global key of local slot `(lx, lz)`.
    pub fn chunk_key(self, lx: usize, lz: usize) -> ChunkKey {
        ChunkKey::new(global_coordinate(self.x, lx), global_coordinate(self.z, lz))
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r({}, {})", self.x, self.z)
    }
}

/// Row-major slot number of local `(lx, lz)`: outer x, inner z.
#[inline]
pub(crate) fn slot_index(lx: usize, lz: usize) -> usize {
    debug_assert!(lx < REGION_SIZE && lz < REGION_SIZE);
    lx * REGION_SIZE + lz
}

/// Inverse of [`slot_index`].
#[inline]
pub(crate) fn slot_local(slot: usize) -> (usize, usize) {
    (slot / REGION_SIZE, slot % REGION_SIZE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_coordinates() {
        assert_eq!(region_index(0), 0);
        assert_eq!(local_index(0), 0);
        assert_eq!(region_index(31), 0);
        assert_eq!(local_index(31), 31);
        assert_eq!(region_index(32), 1);
        assert_eq!(local_index(32), 0);
        assert_eq!(region_index(100), 3);
        assert_eq!(local_index(100), 4);
    }

    #[test]
    fn test_negative_coordinates_floor() {
        assert_eq!(region_index(-1), -1);
        assert_eq!(local_index(-1), 31);
        assert_eq!(region_index(-32), -1);
        assert_eq!(local_index(-32), 0);
        assert_eq!(region_index(-33), -2);
        assert_eq!(local_index(-33), 31);
        assert_eq!(global_coordinate(-2, 31), -33);
    }

    #[test]
    fn test_extremes_round_trip() {
        for c in [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX] {
            assert_eq!(global_coordinate(region_index(c), local_index(c)), c, "c = {c}");
        }
        assert_eq!(region_index(i32::MIN), i32::MIN >> 5);
        assert_eq!(local_index(i32::MAX), 31);
    }

    #[test]
    fn test_chunk_key_region_and_local() {
        let key = ChunkKey::new(-33, 65);
        assert_eq!(key.region(), RegionKey::new(-2, 2));
        assert_eq!(key.local(), (31, 1));
        assert_eq!(key.region().chunk_key(31, 1), key);
    }

    #[test]
    fn test_neighbor_offsets() {
        let key = ChunkKey::new(0, 0);
        assert_eq!(key.neighbor(Edge::North), ChunkKey::new(-1, 0));
        assert_eq!(key.neighbor(Edge::South), ChunkKey::new(1, 0));
        assert_eq!(key.neighbor(Edge::East), ChunkKey::new(0, -1));
        assert_eq!(key.neighbor(Edge::West), ChunkKey::new(0, 1));
        // Stepping west from local z = 31 crosses into the next region.
        let edge = ChunkKey::new(5, 31);
        assert_eq!(edge.neighbor(Edge::West).region(), RegionKey::new(0, 1));
    }

    #[test]
    fn test_slot_index_is_row_major() {
        assert_eq!(slot_index(0, 0), 0);
        assert_eq!(slot_index(0, 31), 31);
        assert_eq!(slot_index(1, 0), 32);
        assert_eq!(slot_index(31, 31), REGION_SLOTS - 1);
        for slot in [0, 7, 32, 500, REGION_SLOTS - 1] {
            let (lx, lz) = slot_local(slot);
            assert_eq!(slot_index(lx, lz), slot);
        }
    }
}
