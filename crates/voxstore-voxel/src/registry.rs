//! Block type registry: maps compact [`BlockId`] values to the [`BlockDef`]
//! metadata the light engine needs (opacity and emission).
//!
//! Air is always ID 0 so that a zeroed column is empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Highest block light level a block type may emit.
pub const MAX_EMISSION: u8 = 15;

/// Compact identifier stored in every block cell (2 bytes).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The empty block.
    pub const AIR: BlockId = BlockId(0);
}

/// How a block interacts with light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transparency {
    /// Stops light entirely.
    Opaque,
    /// Lets light through with one extra level of attenuation (water, leaves).
    SemiTransparent,
    /// No extra attenuation (air, glass).
    FullyTransparent,
}

/// Descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDef {
    /// Unique name, e.g. "stone" or "torch".
    pub name: String,
    /// Light transmission mode.
    pub transparency: Transparency,
    /// Emitted block light level (0 = none, 15 = max).
    #[serde(default)]
    pub light_emission: u8,
}

impl BlockDef {
    /// Shorthand for a non-emissive definition.
    pub fn new(name: impl Into<String>, transparency: Transparency) -> Self {
        Self {
            name: name.into(),
            transparency,
            light_emission: 0,
        }
    }

    /// Sets the emitted light level, clamped to 15.
    pub fn with_emission(mut self, level: u8) -> Self {
        self.light_emission = level.min(MAX_EMISSION);
        self
    }
}

/// Errors that can occur during block type registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate block type name: {0}")]
    DuplicateName(String),
    /// Every ID in the `u16` space is taken.
    #[error("block registry is full (max 65536 types)")]
    RegistryFull,
    /// The emitted light level is above the maximum of 15.
    #[error("block type {name} emits light level {level}, max is 15")]
    EmissionOutOfRange { name: String, level: u8 },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] to [`BlockDef`] with O(1) lookup by index and by name.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    /// Dense array where `index == BlockId.0`.
    types: Vec<BlockDef>,
    name_to_id: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Creates a registry holding only air.
    pub fn new() -> Self {
        let air = BlockDef::new("air", Transparency::FullyTransparent);
        let mut name_to_id = HashMap::new();
        name_to_id.insert(air.name.clone(), BlockId::AIR);
        Self {
            types: vec![air],
            name_to_id,
        }
    }

    /// Builds a registry from a list of definitions, assigning IDs 1.. in order.
    pub fn from_defs<I>(defs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = BlockDef>,
    {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Registers a new block type and returns its assigned ID.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken,
    /// [`RegistryError::EmissionOutOfRange`] if the emission exceeds 15,
    /// [`RegistryError::RegistryFull`] if all IDs are consumed.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if def.light_emission > MAX_EMISSION {
            return Err(RegistryError::EmissionOutOfRange {
                level: def.light_emission,
                name: def.name,
            });
        }
        if self.types.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.types.len() as u16);
        tracing::debug!(name = %def.name, id = id.0, "registered block type");
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for `id`, or `None` for unknown IDs.
    pub fn get(&self, id: BlockId) -> Option<&BlockDef> {
        self.types.get(id.0 as usize)
    }

    /// Returns the ID registered under `name`.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Number of registered types, air included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Transparency of `id`. Unknown IDs are treated like air.
    pub fn transparency(&self, id: BlockId) -> Transparency {
        self.get(id)
            .map_or(Transparency::FullyTransparent, |def| def.transparency)
    }

    /// `true` if light cannot enter the block.
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.transparency(id) == Transparency::Opaque
    }

    /// `true` if light passes the block at all, attenuated or not.
    pub fn is_transparent(&self, id: BlockId) -> bool {
        !self.is_opaque(id)
    }

    /// Block light emitted by `id` (0 for unknown IDs).
    pub fn light_emission(&self, id: BlockId) -> u8 {
        self.get(id).map_or(0, |def| def.light_emission)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_is_id_zero() {
        let registry = BlockRegistry::new();
        let air = registry.get(BlockId::AIR).expect("air is always registered");
        assert_eq!(air.name, "air");
        assert_eq!(air.transparency, Transparency::FullyTransparent);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut registry = BlockRegistry::new();
        let stone = registry
            .register(BlockDef::new("stone", Transparency::Opaque))
            .unwrap();
        let water = registry
            .register(BlockDef::new("water", Transparency::SemiTransparent))
            .unwrap();
        assert_eq!(stone, BlockId(1));
        assert_eq!(water, BlockId(2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = BlockRegistry::new();
        registry
            .register(BlockDef::new("stone", Transparency::Opaque))
            .unwrap();
        let result = registry.register(BlockDef::new("stone", Transparency::Opaque));
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }

    #[test]
    fn test_from_defs_and_lookup() {
        let registry = BlockRegistry::from_defs([
            BlockDef::new("stone", Transparency::Opaque),
            BlockDef::new("torch", Transparency::FullyTransparent).with_emission(14),
        ])
        .unwrap();
        let torch = registry.lookup_by_name("torch").unwrap();
        assert_eq!(registry.light_emission(torch), 14);
        assert!(registry.is_opaque(registry.lookup_by_name("stone").unwrap()));
        assert_eq!(registry.lookup_by_name("lava"), None);
    }

    #[test]
    fn test_unknown_id_behaves_like_air() {
        let registry = BlockRegistry::new();
        assert!(!registry.is_opaque(BlockId(999)));
        assert!(registry.is_transparent(BlockId(999)));
        assert_eq!(registry.light_emission(BlockId(999)), 0);
    }

    #[test]
    fn test_emission_is_clamped() {
        let def = BlockDef::new("sun", Transparency::Opaque).with_emission(200);
        assert_eq!(def.light_emission, 15);
    }

    #[test]
    fn test_over_range_emission_rejected() {
        let mut registry = BlockRegistry::new();
        let lava = BlockDef {
            name: "lava".to_string(),
            transparency: Transparency::FullyTransparent,
            light_emission: 20,
        };
        assert!(matches!(
            registry.register(lava),
            Err(RegistryError::EmissionOutOfRange { level: 20, .. })
        ));
        assert!(registry.lookup_by_name("lava").is_none());

        let torch = BlockDef::new("torch", Transparency::FullyTransparent).with_emission(15);
        assert!(registry.register(torch).is_ok());
    }
}
