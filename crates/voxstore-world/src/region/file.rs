//! File-backed regions: one `r.<x>.<z>.vxr` file per region.
//!
//! ## File Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes "VXRG" |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 1024 × 12 | Slot table, row-major over local `(x, z)` |
//! | 12293 | … | Slot payloads, appended |
//!
//! Each slot table entry is `offset: u32`, `length: u32`, `timestamp: u32`,
//! all little-endian. An offset of 0 marks an empty slot. Rewriting a slot
//! appends the new payload and repoints the entry; the old bytes are left
//! behind as dead space.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{Region, RegionStore, unix_timestamp};
use crate::Result;
use crate::coords::{REGION_SLOTS, RegionKey, slot_index};
use crate::error::WorldError;

const MAGIC: [u8; 4] = *b"VXRG";
const FORMAT_VERSION: u8 = 1;
const ENTRY_LEN: usize = 12;
const TABLE_OFFSET: usize = 5;
const HEADER_LEN: usize = TABLE_OFFSET + REGION_SLOTS * ENTRY_LEN;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SlotEntry {
    offset: u32,
    length: u32,
    timestamp: u32,
}

impl SlotEntry {
    fn is_occupied(self) -> bool {
        self.offset != 0
    }

    fn to_bytes(self) -> [u8; ENTRY_LEN] {
        let mut out = [0u8; ENTRY_LEN];
        out[0..4].copy_from_slice(&self.offset.to_le_bytes());
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out[8..12].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let word = |i: usize| {
            u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        Self {
            offset: word(0),
            length: word(4),
            timestamp: word(8),
        }
    }
}

/// File name of the region at `key`.
pub(crate) fn region_file_name(key: RegionKey) -> String {
    format!("r.{}.{}.vxr", key.x, key.z)
}

/// Parses `r.<x>.<z>.vxr`.
fn parse_region_file_name(name: &str) -> Option<RegionKey> {
    let rest = name.strip_prefix("r.")?.strip_suffix(".vxr")?;
    let (x, z) = rest.split_once('.')?;
    Some(RegionKey::new(x.parse().ok()?, z.parse().ok()?))
}

/// A region stored in its own file.
#[derive(Debug)]
pub struct FileRegion {
    key: RegionKey,
    path: PathBuf,
    file: File,
    entries: Box<[SlotEntry]>,
    count: usize,
    sync_writes: bool,
}

impl FileRegion {
    /// Creates a new, empty region file at `path`, truncating any existing
    /// file.
    pub fn create(path: impl Into<PathBuf>, key: RegionKey, sync_writes: bool) -> Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(&MAGIC);
        header.push(FORMAT_VERSION);
        header.resize(HEADER_LEN, 0);
        file.write_all(&header)?;
        if sync_writes {
            file.sync_all()?;
        }
        tracing::debug!(region = %key, path = %path.display(), "created region file");
        Ok(Self {
            key,
            path,
            file,
            entries: vec![SlotEntry::default(); REGION_SLOTS].into_boxed_slice(),
            count: 0,
            sync_writes,
        })
    }

    /// Opens an existing region file and validates its slot table.
    pub fn open(path: impl Into<PathBuf>, key: RegionKey, sync_writes: bool) -> Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_len = file.metadata()?.len();
        let corrupt = |reason: String| WorldError::CorruptRegion {
            path: path.clone(),
            reason,
        };

        if file_len < HEADER_LEN as u64 {
            return Err(corrupt(format!(
                "file is {file_len} bytes, header needs {HEADER_LEN}"
            )));
        }
        let mut header = vec![0u8; HEADER_LEN];
        file.read_exact(&mut header)?;
        if header[..4] != MAGIC {
            return Err(corrupt("invalid magic bytes".into()));
        }
        if header[4] != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported version {}", header[4])));
        }

        let mut entries = Vec::with_capacity(REGION_SLOTS);
        for (slot, bytes) in header[TABLE_OFFSET..].chunks_exact(ENTRY_LEN).enumerate() {
            let entry = SlotEntry::from_bytes(bytes);
            if entry.is_occupied() {
                let end = entry.offset as u64 + entry.length as u64;
                if (entry.offset as usize) < HEADER_LEN || end > file_len {
                    return Err(corrupt(format!(
                        "slot {slot} points outside the payload area ({}..{end})",
                        entry.offset
                    )));
                }
            }
            entries.push(entry);
        }
        let count = entries.iter().filter(|entry| entry.is_occupied()).count();
        tracing::debug!(region = %key, chunks = count, "opened region file");

        Ok(Self {
            key,
            path,
            file,
            entries: entries.into_boxed_slice(),
            count,
            sync_writes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&mut self, slot: usize, entry: SlotEntry) -> Result<()> {
        let at = (TABLE_OFFSET + slot * ENTRY_LEN) as u64;
        self.file.seek(SeekFrom::Start(at))?;
        self.file.write_all(&entry.to_bytes())?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        self.entries[slot] = entry;
        Ok(())
    }
}

impl Region for FileRegion {
    fn key(&self) -> RegionKey {
        self.key
    }

    fn slot_exists(&self, lx: usize, lz: usize) -> bool {
        self.entries[slot_index(lx, lz)].is_occupied()
    }

    fn chunk_count(&self) -> usize {
        self.count
    }

    fn read_slot(&self, lx: usize, lz: usize) -> Result<Option<Vec<u8>>> {
        let entry = self.entries[slot_index(lx, lz)];
        if !entry.is_occupied() {
            return Ok(None);
        }
        let mut file = &self.file;
        file.seek(SeekFrom::Start(entry.offset as u64))?;
        let mut data = vec![0u8; entry.length as usize];
        file.read_exact(&mut data)?;
        Ok(Some(data))
    }

    fn write_slot(&mut self, lx: usize, lz: usize, data: &[u8]) -> Result<()> {
        let slot = slot_index(lx, lz);
        let end = self.file.seek(SeekFrom::End(0))?;
        let (Ok(offset), Ok(length)) = (u32::try_from(end), u32::try_from(data.len())) else {
            return Err(WorldError::CorruptRegion {
                path: self.path.clone(),
                reason: "region file exceeds 4 GiB".into(),
            });
        };
        self.file.write_all(data)?;

        let was_occupied = self.entries[slot].is_occupied();
        self.write_entry(
            slot,
            SlotEntry {
                offset,
                length,
                timestamp: unix_timestamp(),
            },
        )?;
        if !was_occupied {
            self.count += 1;
        }
        tracing::trace!(region = %self.key, lx, lz, bytes = data.len(), "wrote slot");
        Ok(())
    }

    fn delete_slot(&mut self, lx: usize, lz: usize) -> Result<bool> {
        let slot = slot_index(lx, lz);
        if !self.entries[slot].is_occupied() {
            return Ok(false);
        }
        self.write_entry(slot, SlotEntry::default())?;
        self.count -= 1;
        Ok(true)
    }

    fn timestamp(&self, lx: usize, lz: usize) -> u32 {
        self.entries[slot_index(lx, lz)].timestamp
    }

    fn set_timestamp(&mut self, lx: usize, lz: usize, timestamp: u32) -> Result<()> {
        let slot = slot_index(lx, lz);
        let entry = self.entries[slot];
        if !entry.is_occupied() {
            return Ok(());
        }
        self.write_entry(slot, SlotEntry { timestamp, ..entry })
    }
}

/// A world directory of region files.
#[derive(Debug)]
pub struct FileRegionStore {
    dir: PathBuf,
    sync_writes: bool,
    regions: BTreeMap<RegionKey, FileRegion>,
}

impl FileRegionStore {
    /// Opens (creating if needed) the world directory `dir` and loads the
    /// header of every region file in it.
    ///
    /// Files whose names do not follow `r.<x>.<z>.vxr` are ignored. Region
    /// files holding no chunk, as left by an interrupted first write, are
    /// removed.
    pub fn open(dir: impl Into<PathBuf>, sync_writes: bool) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut regions = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(parse_region_file_name) else {
                tracing::debug!(file = ?name, "skipping non-region file");
                continue;
            };
            let region = FileRegion::open(entry.path(), key, sync_writes)?;
            if region.chunk_count() == 0 {
                tracing::warn!(
                    region = %key,
                    path = %region.path.display(),
                    "removing region file without chunks"
                );
                drop(region);
                fs::remove_file(entry.path())?;
                continue;
            }
            regions.insert(key, region);
        }
        tracing::info!(
            dir = %dir.display(),
            regions = regions.len(),
            "opened world directory"
        );

        Ok(Self {
            dir,
            sync_writes,
            regions,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RegionStore for FileRegionStore {
    type Region = FileRegion;

    fn region(&self, key: RegionKey) -> Option<&FileRegion> {
        self.regions.get(&key)
    }

    fn region_mut(&mut self, key: RegionKey) -> Option<&mut FileRegion> {
        self.regions.get_mut(&key)
    }

    fn create_region(&mut self, key: RegionKey) -> Result<&mut FileRegion> {
        match self.regions.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.dir.join(region_file_name(key));
                Ok(entry.insert(FileRegion::create(path, key, self.sync_writes)?))
            }
        }
    }

    fn delete_region(&mut self, key: RegionKey) -> Result<bool> {
        let Some(region) = self.regions.remove(&key) else {
            return Ok(false);
        };
        let path = region.path.clone();
        drop(region);
        fs::remove_file(&path)?;
        tracing::debug!(region = %key, path = %path.display(), "deleted region file");
        Ok(true)
    }

    fn region_keys(&self) -> Vec<RegionKey> {
        self.regions.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
