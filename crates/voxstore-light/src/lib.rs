//! Per-column block light and sky light: storage, in-column rebuilds and
//! stitching across the horizontal edges shared with neighboring columns.

pub mod edge;
pub mod grid;

pub use edge::{EDGE_CELLS, Edge, EdgeLight};
pub use grid::{LightGrid, VoxelLight};
