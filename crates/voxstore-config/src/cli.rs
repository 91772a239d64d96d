//! Command-line overrides for the persisted configuration.

use std::path::PathBuf;

use clap::Args;

use crate::Config;

/// Global command-line options shared by voxstore tools.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// World directory holding the region files.
    #[arg(long, global = true)]
    pub world: Option<PathBuf>,

    /// Fsync region files after every write.
    #[arg(long, global = true)]
    pub sync_writes: Option<bool>,

    /// Relight dirty chunks before saving.
    #[arg(long, global = true)]
    pub relight_on_save: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref world) = args.world {
            self.storage.world_dir = world.clone();
        }
        if let Some(sync) = args.sync_writes {
            self.storage.sync_writes = sync;
        }
        if let Some(relight) = args.relight_on_save {
            self.lighting.relight_on_save = relight;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
