//! Chunk persistence for a column-based voxel world.
//!
//! World space is cut into 16 × 128 × 16 chunk columns addressed by `(x, z)`,
//! and chunks are grouped 32 × 32 into regions for storage. The
//! [`ChunkManager`] sits on top of a [`RegionStore`] backend and a write-back
//! [`ChunkCache`], and provides:
//!
//! - chunk CRUD with regions created on first write and removed when their
//!   last chunk is deleted,
//! - batched saving of dirty chunks,
//! - relighting of dirty chunks, including stitching across chunk edges,
//! - a lazy, restartable walk over every stored chunk.

pub mod cache;
pub mod chunk;
pub mod chunk_serial;
pub mod coords;
pub mod error;
pub mod iter;
pub mod manager;
pub mod region;
mod relight;

pub use cache::ChunkCache;
pub use chunk::Chunk;
pub use chunk_serial::ChunkSerError;
pub use coords::{
    ChunkKey, REGION_MASK, REGION_SHIFT, REGION_SIZE, REGION_SLOTS, RegionKey, global_coordinate,
    local_index, region_index,
};
pub use error::WorldError;
pub use iter::{ChunkCursor, ChunkIter};
pub use manager::{ChunkManager, ChunkRef};
pub use region::{
    FileRegion, FileRegionStore, MemoryRegion, MemoryRegionStore, Region, RegionStore, SlotWriter,
};

pub use voxstore_light::Edge;

/// Result alias used throughout the crate.
pub type Result<T, E = WorldError> = std::result::Result<T, E>;
