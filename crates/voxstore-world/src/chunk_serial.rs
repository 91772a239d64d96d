//! Binary serialization for [`Chunk`] payloads.
//!
//! The VXCH format is a small versioned container around the run-length
//! encoded block and light arrays.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `[0x56, 0x58, 0x43, 0x48]` ("VXCH") |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 4 | Chunk x (`i32`, little-endian) |
//! | 9 | 4 | Chunk z (`i32`, little-endian) |
//! | 13 | 2 | Column height (`u16`, little-endian, must be 128) |
//! | 15 | B | Block RLE table (`u16` values) |
//! | 15+B | L | Light RLE table (`u8` packed values) |

use std::io::{self, Write};

use voxstore_light::LightGrid;
use voxstore_voxel::{BlockColumn, CHUNK_HEIGHT, RleError};

use crate::chunk::Chunk;
use crate::coords::ChunkKey;

/// Magic bytes identifying the VXCH format.
const MAGIC: [u8; 4] = *b"VXCH";

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header preceding the RLE sections.
const HEADER_LEN: usize = 15;

/// Errors that can occur during chunk deserialization.
#[derive(Debug, thiserror::Error)]
pub enum ChunkSerError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than expected.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// The stored column height differs from this build's.
    #[error("column height {0} does not match {CHUNK_HEIGHT}")]
    HeightMismatch(u16),
    /// A run-length section is malformed.
    #[error("bad run-length section: {0}")]
    Rle(#[from] RleError),
}

impl Chunk {
    /// Serializes this chunk to a byte vector in the VXCH format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + 64);
        buf.extend_from_slice(&MAGIC);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&self.x().to_le_bytes());
        buf.extend_from_slice(&self.z().to_le_bytes());
        buf.extend_from_slice(&(CHUNK_HEIGHT as u16).to_le_bytes());
        self.blocks().encode(&mut buf);
        self.light().encode(&mut buf);
        buf
    }

    /// Writes the VXCH encoding of this chunk to `out`.
    pub fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.to_bytes())
    }

    /// Deserializes a chunk from a byte slice in the VXCH format.
    ///
    /// The loaded chunk is clean: its dirty flags are cleared.
    pub fn load(data: &[u8]) -> Result<Self, ChunkSerError> {
        if data.len() < MAGIC.len() || data[..4] != MAGIC {
            return Err(ChunkSerError::InvalidMagic);
        }
        if data.len() < HEADER_LEN {
            return Err(ChunkSerError::Truncated {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        let version = data[4];
        if version != FORMAT_VERSION {
            return Err(ChunkSerError::UnsupportedVersion(version));
        }

        let x = i32::from_le_bytes([data[5], data[6], data[7], data[8]]);
        let z = i32::from_le_bytes([data[9], data[10], data[11], data[12]]);
        let height = u16::from_le_bytes([data[13], data[14]]);
        if height as usize != CHUNK_HEIGHT {
            return Err(ChunkSerError::HeightMismatch(height));
        }

        let mut offset = HEADER_LEN;
        let (blocks, used) = BlockColumn::decode(&data[offset..])?;
        offset += used;
        let (light, _) = LightGrid::decode(&data[offset..])?;

        Ok(Chunk::from_parts(ChunkKey::new(x, z), blocks, light))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use voxstore_voxel::{BlockDef, BlockId, BlockRegistry, Transparency};

    fn lit_chunk() -> Chunk {
        let registry = BlockRegistry::from_defs([
            BlockDef::new("stone", Transparency::Opaque),
            BlockDef::new("torch", Transparency::FullyTransparent).with_emission(14),
        ])
        .unwrap();
        let mut chunk = Chunk::new(ChunkKey::new(-7, 12));
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_block(x, 40, z, BlockId(1));
            }
        }
        chunk.set_block(8, 20, 8, BlockId(2));
        chunk.rebuild_light(&registry);
        chunk.clear_dirty();
        chunk
    }

    #[test]
    fn test_save_then_load_preserves_chunk() {
        let chunk = lit_chunk();
        let mut out = Vec::new();
        chunk.save(&mut out).unwrap();
        assert_eq!(&out[..4], b"VXCH");
        let loaded = Chunk::load(&out).unwrap();
        assert_eq!(loaded, chunk);
        assert_eq!(loaded.key(), ChunkKey::new(-7, 12));
    }

    #[test]
    fn test_load_is_clean() {
        let mut chunk = Chunk::new(ChunkKey::new(0, 0));
        chunk.set_block(0, 0, 0, BlockId(3));
        assert!(chunk.is_dirty());
        let loaded = Chunk::load(&chunk.to_bytes()).unwrap();
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.get_block(0, 0, 0), BlockId(3));
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(matches!(Chunk::load(b"NOPE"), Err(ChunkSerError::InvalidMagic)));
        assert!(matches!(Chunk::load(b""), Err(ChunkSerError::InvalidMagic)));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = Chunk::new(ChunkKey::new(0, 0)).to_bytes();
        bytes[4] = 9;
        assert!(matches!(
            Chunk::load(&bytes),
            Err(ChunkSerError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_rejects_height_mismatch() {
        let mut bytes = Chunk::new(ChunkKey::new(0, 0)).to_bytes();
        bytes[13..15].copy_from_slice(&256u16.to_le_bytes());
        assert!(matches!(
            Chunk::load(&bytes),
            Err(ChunkSerError::HeightMismatch(256))
        ));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = lit_chunk().to_bytes();
        assert!(matches!(
            Chunk::load(&bytes[..10]),
            Err(ChunkSerError::Truncated { expected: 15, actual: 10 })
        ));
        assert!(matches!(
            Chunk::load(&bytes[..bytes.len() - 1]),
            Err(ChunkSerError::Rle(_))
        ));
    }
}
