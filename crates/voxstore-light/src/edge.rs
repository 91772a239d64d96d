//! Horizontal column edges and light stitching across them.
//!
//! A column only sees its own cells when it rebuilds light, so light that
//! should bleed in from a neighbor is added afterwards: the neighbor's border
//! cells are copied out as an [`EdgeLight`] and fed into
//! [`LightGrid::stitch_block_light`] / [`LightGrid::stitch_sky_light`], which
//! raise the receiving border and flood inward.

use std::collections::VecDeque;

use voxstore_voxel::{BlockColumn, BlockRegistry, CHUNK_HEIGHT, CHUNK_WIDTH};

use crate::grid::{Channel, LightGrid, VoxelLight, entry_decay};

/// Number of cells on one vertical face of a column.
pub const EDGE_CELLS: usize = CHUNK_WIDTH * CHUNK_HEIGHT;

/// Light values along one face, indexed by `a * CHUNK_HEIGHT + y` where `a`
/// runs along the face.
pub type EdgeLight = Box<[VoxelLight; EDGE_CELLS]>;

/// One of the four horizontal faces of a column.
///
/// North/South face along the x axis, East/West along the z axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Faces `x - 1`; border cells sit at local `x = 0`.
    North,
    /// Faces `x + 1`; border cells sit at local `x = 15`.
    South,
    /// Faces `z - 1`; border cells sit at local `z = 0`.
    East,
    /// Faces `z + 1`; border cells sit at local `z = 15`.
    West,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::North, Edge::South, Edge::East, Edge::West];

    /// Chunk-coordinate offset `(dx, dz)` to the neighbor across this edge.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Edge::North => (-1, 0),
            Edge::South => (1, 0),
            Edge::East => (0, -1),
            Edge::West => (0, 1),
        }
    }

    /// The face of the neighbor that touches this one.
    pub fn opposite(self) -> Edge {
        match self {
            Edge::North => Edge::South,
            Edge::South => Edge::North,
            Edge::East => Edge::West,
            Edge::West => Edge::East,
        }
    }

    /// Local `(x, y, z)` of the border cell at position `a` along this face.
    pub fn cell(self, a: usize, y: usize) -> (usize, usize, usize) {
        const LAST: usize = CHUNK_WIDTH - 1;
        match self {
            Edge::North => (0, y, a),
            Edge::South => (LAST, y, a),
            Edge::East => (a, y, 0),
            Edge::West => (a, y, LAST),
        }
    }
}

impl LightGrid {
    /// Copies out the border cells on `edge`.
    pub fn extract_edge(&self, edge: Edge) -> EdgeLight {
        let mut out: EdgeLight = Box::new([VoxelLight(0); EDGE_CELLS]);
        for a in 0..CHUNK_WIDTH {
            for y in 0..CHUNK_HEIGHT {
                let (x, y, z) = edge.cell(a, y);
                out[a * CHUNK_HEIGHT + y] = self.get(x, y, z);
            }
        }
        out
    }

    /// Pulls block light in across `edge` from the neighbor's facing border.
    ///
    /// `neighbor` must come from the neighbor's `edge.opposite()` face.
    pub fn stitch_block_light(
        &mut self,
        blocks: &BlockColumn,
        registry: &BlockRegistry,
        edge: Edge,
        neighbor: &EdgeLight,
    ) {
        self.stitch(blocks, registry, edge, neighbor, Channel::Block);
    }

    /// Pulls sky light in across `edge` from the neighbor's facing border.
    pub fn stitch_sky_light(
        &mut self,
        blocks: &BlockColumn,
        registry: &BlockRegistry,
        edge: Edge,
        neighbor: &EdgeLight,
    ) {
        self.stitch(blocks, registry, edge, neighbor, Channel::Sky);
    }

    fn stitch(
        &mut self,
        blocks: &BlockColumn,
        registry: &BlockRegistry,
        edge: Edge,
        neighbor: &EdgeLight,
        channel: Channel,
    ) {
        let mut queue = VecDeque::new();
        for a in 0..CHUNK_WIDTH {
            for y in 0..CHUNK_HEIGHT {
                let source = channel.level(neighbor[a * CHUNK_HEIGHT + y]);
                let cell = edge.cell(a, y);
                let Some(decay) = entry_decay(registry, blocks, cell) else {
                    continue;
                };
                if source <= decay {
                    continue;
                }
                let (x, y, z) = cell;
                let mut light = self.get(x, y, z);
                if channel.level(light) >= source - decay {
                    continue;
                }
                channel.set(&mut light, source - decay);
                self.set(x, y, z, light);
                queue.push_back(cell);
            }
        }
        if !queue.is_empty() {
            tracing::trace!(?edge, ?channel, seeds = queue.len(), "stitching edge light");
        }
        self.flood(&mut queue, blocks, registry, channel);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
