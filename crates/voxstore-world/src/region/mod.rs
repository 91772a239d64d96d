//! Region backends: containers of up to 32 × 32 chunk slots.
//!
//! A [`RegionStore`] owns regions by [`RegionKey`]; a [`Region`] owns raw
//! slot bytes plus a per-slot timestamp. Slots are addressed by local
//! `(lx, lz)` in `0..32`. The chunk-level helpers on [`Region`] are provided
//! methods layered over the raw slot operations, so a backend only has to
//! store bytes.

mod file;
mod memory;

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

pub use file::{FileRegion, FileRegionStore};
pub use memory::{MemoryRegion, MemoryRegionStore};

use crate::Result;
use crate::chunk::Chunk;
use crate::coords::RegionKey;
use crate::error::WorldError;

/// Storage for the chunk slots of a single region.
pub trait Region {
    fn key(&self) -> RegionKey;

    /// `true` if slot `(lx, lz)` holds a chunk.
    fn slot_exists(&self, lx: usize, lz: usize) -> bool;

    /// Number of occupied slots.
    fn chunk_count(&self) -> usize;

    /// Raw payload of slot `(lx, lz)`, or `None` if it is empty.
    fn read_slot(&self, lx: usize, lz: usize) -> Result<Option<Vec<u8>>>;

    /// Replaces the payload of slot `(lx, lz)` and stamps it with the
    /// current time.
    fn write_slot(&mut self, lx: usize, lz: usize, data: &[u8]) -> Result<()>;

    /// Empties slot `(lx, lz)`. Returns `false` if it was already empty.
    fn delete_slot(&mut self, lx: usize, lz: usize) -> Result<bool>;

    /// Last-write timestamp of slot `(lx, lz)` in seconds since the epoch;
    /// 0 for empty slots.
    fn timestamp(&self, lx: usize, lz: usize) -> u32;

    /// Overwrites the timestamp of an occupied slot. Empty slots are left
    /// untouched.
    fn set_timestamp(&mut self, lx: usize, lz: usize, timestamp: u32) -> Result<()>;

    fn chunk_exists(&self, lx: usize, lz: usize) -> bool {
        self.slot_exists(lx, lz)
    }

    /// A write destination for slot `(lx, lz)`; nothing reaches the region
    /// until [`SlotWriter::finish`].
    fn slot_writer(&mut self, lx: usize, lz: usize) -> SlotWriter<'_, Self>
    where
        Self: Sized,
    {
        SlotWriter {
            region: self,
            lx,
            lz,
            buf: Vec::new(),
        }
    }

    /// Decodes the chunk in slot `(lx, lz)`.
    ///
    /// A payload whose recorded location disagrees with the slot is
    /// re-stamped to the slot's address.
    fn load_chunk(&self, lx: usize, lz: usize) -> Result<Option<Chunk>> {
        let key = self.key().chunk_key(lx, lz);
        let Some(bytes) = self.read_slot(lx, lz)? else {
            return Ok(None);
        };
        let mut chunk = Chunk::load(&bytes).map_err(|source| WorldError::Decode {
            x: key.x,
            z: key.z,
            source,
        })?;
        if chunk.key() != key {
            tracing::warn!(
                recorded = %chunk.key(),
                slot = %key,
                "chunk location disagrees with its slot; re-stamping"
            );
            chunk.set_location(key);
        }
        Ok(Some(chunk))
    }

    /// Writes an empty chunk into slot `(lx, lz)`, overwriting any chunk
    /// already there, and returns it.
    fn create_chunk(&mut self, lx: usize, lz: usize) -> Result<Chunk>
    where
        Self: Sized,
    {
        let chunk = Chunk::new(self.key().chunk_key(lx, lz));
        let mut writer = self.slot_writer(lx, lz);
        chunk.save(&mut writer)?;
        writer.finish()?;
        Ok(chunk)
    }

    /// Writes `chunk` into its slot. Returns `false` if the chunk's recorded
    /// location belongs to a different region.
    fn save_chunk(&mut self, chunk: &Chunk) -> Result<bool>
    where
        Self: Sized,
    {
        if chunk.key().region() != self.key() {
            return Ok(false);
        }
        let mut writer = self.slot_writer(chunk.local_x(), chunk.local_z());
        chunk.save(&mut writer)?;
        writer.finish()?;
        Ok(true)
    }

    fn delete_chunk(&mut self, lx: usize, lz: usize) -> Result<bool> {
        self.delete_slot(lx, lz)
    }
}

/// Owner of every region of a world.
pub trait RegionStore {
    type Region: Region;

    fn region(&self, key: RegionKey) -> Option<&Self::Region>;

    fn region_mut(&mut self, key: RegionKey) -> Option<&mut Self::Region>;

    /// Returns the region at `key`, creating an empty one if absent.
    fn create_region(&mut self, key: RegionKey) -> Result<&mut Self::Region>;

    /// Removes the region at `key`. Returns `false` if it did not exist.
    fn delete_region(&mut self, key: RegionKey) -> Result<bool>;

    /// Keys of every region in a stable order. Both bundled backends list
    /// them in ascending key order.
    fn region_keys(&self) -> Vec<RegionKey>;

    fn region_exists(&self, key: RegionKey) -> bool {
        self.region(key).is_some()
    }
}

/// Buffered write destination for one slot.
///
/// Dropping a writer without calling [`finish`](Self::finish) discards the
/// buffered bytes.
pub struct SlotWriter<'a, R: Region> {
    region: &'a mut R,
    lx: usize,
    lz: usize,
    buf: Vec<u8>,
}

impl<R: Region> SlotWriter<'_, R> {
    /// Commits the buffered payload to the slot.
    pub fn finish(self) -> Result<()> {
        self.region.write_slot(self.lx, self.lz, &self.buf)
    }
}

impl<R: Region> Write for SlotWriter<'_, R> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Seconds since the Unix epoch, saturating into `u32`.
pub(crate) fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs().min(u32::MAX as u64) as u32)
}
