use std::collections::BTreeMap;

use super::{Region, RegionStore, unix_timestamp};
use crate::Result;
use crate::coords::{REGION_SLOTS, RegionKey, slot_index};

#[derive(Clone, Debug)]
struct Slot {
    data: Vec<u8>,
    timestamp: u32,
}

/// A region held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryRegion {
    key: RegionKey,
    slots: Vec<Option<Slot>>,
    count: usize,
}

impl MemoryRegion {
    pub fn new(key: RegionKey) -> Self {
        Self {
            key,
            slots: vec![None; REGION_SLOTS],
            count: 0,
        }
    }
}

impl Region for MemoryRegion {
    fn key(&self) -> RegionKey {
        self.key
    }

    fn slot_exists(&self, lx: usize, lz: usize) -> bool {
        self.slots[slot_index(lx, lz)].is_some()
    }

    fn chunk_count(&self) -> usize {
        self.count
    }

    fn read_slot(&self, lx: usize, lz: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.slots[slot_index(lx, lz)]
            .as_ref()
            .map(|slot| slot.data.clone()))
    }

    fn write_slot(&mut self, lx: usize, lz: usize, data: &[u8]) -> Result<()> {
        let slot = &mut self.slots[slot_index(lx, lz)];
        if slot.is_none() {
            self.count += 1;
        }
        *slot = Some(Slot {
            data: data.to_vec(),
            timestamp: unix_timestamp(),
        });
        Ok(())
    }

    fn delete_slot(&mut self, lx: usize, lz: usize) -> Result<bool> {
        let removed = self.slots[slot_index(lx, lz)].take().is_some();
        if removed {
            self.count -= 1;
        }
        Ok(removed)
    }

    fn timestamp(&self, lx: usize, lz: usize) -> u32 {
        self.slots[slot_index(lx, lz)]
            .as_ref()
            .map_or(0, |slot| slot.timestamp)
    }

    fn set_timestamp(&mut self, lx: usize, lz: usize, timestamp: u32) -> Result<()> {
        if let Some(slot) = self.slots[slot_index(lx, lz)].as_mut() {
            slot.timestamp = timestamp;
        }
        Ok(())
    }
}

/// Region store without persistence, for tests and scratch worlds.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegionStore {
    regions: BTreeMap<RegionKey, MemoryRegion>,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionStore for MemoryRegionStore {
    type Region = MemoryRegion;

    fn region(&self, key: RegionKey) -> Option<&MemoryRegion> {
        self.regions.get(&key)
    }

    fn region_mut(&mut self, key: RegionKey) -> Option<&mut MemoryRegion> {
        self.regions.get_mut(&key)
    }

    fn create_region(&mut self, key: RegionKey) -> Result<&mut MemoryRegion> {
        Ok(self.regions.entry(key).or_insert_with(|| {
            tracing::debug!(region = %key, "created in-memory region");
            MemoryRegion::new(key)
        }))
    }

    fn delete_region(&mut self, key: RegionKey) -> Result<bool> {
        Ok(self.regions.remove(&key).is_some())
    }

    fn region_keys(&self) -> Vec<RegionKey> {
        self.regions.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
