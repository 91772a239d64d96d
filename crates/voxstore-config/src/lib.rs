//! Configuration for voxstore tools.
//!
//! Settings persist to disk as a RON file (`config.ron`) and can be
//! overridden from the command line. Missing fields fall back to defaults and
//! unknown fields are ignored, so config files stay usable across versions.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE, Config, DebugConfig, LightingConfig, StorageConfig};
pub use error::ConfigError;
