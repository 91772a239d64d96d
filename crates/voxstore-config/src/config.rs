//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxstore_voxel::{BlockDef, BlockRegistry, Transparency};

use crate::error::ConfigError;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where and how region files are stored.
    pub storage: StorageConfig,
    /// Block types and relighting behavior.
    pub lighting: LightingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the `r.<x>.<z>.vxr` region files.
    pub world_dir: PathBuf,
    /// Fsync region files after every write.
    pub sync_writes: bool,
}

/// Lighting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Relight dirty chunks before every save.
    pub relight_on_save: bool,
    /// Block types, assigned IDs 1.. in order (0 is always air).
    pub blocks: Vec<BlockDef>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            world_dir: PathBuf::from("world"),
            sync_writes: false,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            relight_on_save: true,
            blocks: vec![
                BlockDef::new("stone", Transparency::Opaque),
                BlockDef::new("dirt", Transparency::Opaque),
                BlockDef::new("water", Transparency::SemiTransparent),
                BlockDef::new("leaves", Transparency::SemiTransparent),
                BlockDef::new("glass", Transparency::FullyTransparent),
                BlockDef::new("torch", Transparency::FullyTransparent).with_emission(14),
            ],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config directory for the current user, if the platform has
    /// one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxstore"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-reads the file: returns `Some(new_config)` if it changed, `None`
    /// otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Builds the block registry described by `lighting.blocks`.
    pub fn block_registry(&self) -> Result<BlockRegistry, ConfigError> {
        BlockRegistry::from_defs(self.lighting.blocks.iter().cloned())
            .map_err(ConfigError::InvalidBlocks)
    }

    /// Resolves `storage.world_dir` against `base` when it is relative.
    pub fn world_dir(&self, base: &Path) -> PathBuf {
        if self.storage.world_dir.is_absolute() {
            self.storage.world_dir.clone()
        } else {
            base.join(&self.storage.world_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("sync_writes: false"));
        assert!(ron_str.contains("\"torch\""));
        assert!(ron_str.contains("SemiTransparent"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(storage: (sync_writes: true))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert!(config.storage.sync_writes);
        assert_eq!(config.storage.world_dir, PathBuf::from("world"));
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_block_without_emission_field() {
        let ron_str = r#"(lighting: (blocks: [(name: "ice", transparency: SemiTransparent)]))"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        let registry = config.block_registry().unwrap();
        let ice = registry.lookup_by_name("ice").unwrap();
        assert_eq!(registry.light_emission(ice), 0);
        assert!(!registry.is_opaque(ice));
    }

    #[test]
    fn test_over_range_emission_rejected() {
        let ron_str = r#"(lighting: (blocks: [
            (name: "lava", transparency: FullyTransparent, light_emission: 20),
        ]))"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        assert!(matches!(
            config.block_registry(),
            Err(ConfigError::InvalidBlocks(
                voxstore_voxel::RegistryError::EmissionOutOfRange { level: 20, .. }
            ))
        ));
    }

    #[test]
    fn test_duplicate_blocks_rejected() {
        let mut config = Config::default();
        config
            .lighting
            .blocks
            .push(BlockDef::new("stone", Transparency::Opaque));
        assert!(matches!(
            config.block_registry(),
            Err(ConfigError::InvalidBlocks(_))
        ));
    }

    #[test]
    fn test_default_registry_ids_follow_list_order() {
        let registry = Config::default().block_registry().unwrap();
        assert_eq!(registry.lookup_by_name("stone").map(|id| id.0), Some(1));
        assert_eq!(registry.lookup_by_name("torch").map(|id| id.0), Some(6));
    }

    #[test]
    fn test_world_dir_resolution() {
        let mut config = Config::default();
        let base = Path::new("/srv/voxstore");
        assert_eq!(config.world_dir(base), base.join("world"));
        let absolute = std::env::temp_dir().join("elsewhere");
        config.storage.world_dir = absolute.clone();
        assert_eq!(config.world_dir(base), absolute);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.sync_writes = true;
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.lighting.relight_on_save = false;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(!result.unwrap().lighting.relight_on_save);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
