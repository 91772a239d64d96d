//! `voxstore`: inspect and edit a world directory of region files.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use voxstore_config::{CliArgs, Config, ConfigError};
use voxstore_world::{ChunkManager, FileRegionStore};

use crate::commands::{Command, CommandError};

/// Voxel world chunk store tool.
#[derive(Parser, Debug)]
#[command(name = "voxstore", version, about = "Inspect and edit voxstore worlds")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("no config directory available; pass --config")]
    NoConfigDir,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    World(#[from] voxstore_world::WorldError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Resolve config directory
    let Some(config_dir) = cli.args.config.clone().or_else(Config::default_dir) else {
        eprintln!("{}", AppError::NoConfigDir);
        return ExitCode::FAILURE;
    };

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&cli.args);

    let log_dir = config_dir.join("logs");
    voxstore_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&cli.command, &config, config_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command, config: &Config, config_dir: PathBuf) -> Result<(), AppError> {
    let registry = config.block_registry()?;
    let world_dir = config.world_dir(&config_dir);
    tracing::debug!(
        world = %world_dir.display(),
        block_types = registry.len(),
        "opening world"
    );

    let store = FileRegionStore::open(world_dir, config.storage.sync_writes)?;
    let mut mgr = ChunkManager::new(store, Arc::new(registry));
    let stdout = std::io::stdout();
    commands::run(
        command,
        &mut mgr,
        config.lighting.relight_on_save,
        &mut stdout.lock(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from(["voxstore", "--world", "w", "info", "-3", "7"]).unwrap();
        assert_eq!(cli.args.world, Some(PathBuf::from("w")));
        assert_eq!(cli.command, Command::Info { x: -3, z: 7 });
    }

    #[test]
    fn test_parses_relight_pairs() {
        let cli = Cli::try_parse_from(["voxstore", "relight", "0,0", "-1,5"]).unwrap();
        let Command::Relight { chunks } = cli.command else {
            panic!("expected relight");
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].0, voxstore_world::ChunkKey::new(-1, 5));
    }

    #[test]
    fn test_run_against_temp_world() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.world_dir = dir.path().join("world");
        run(
            &Command::Create {
                x: 0,
                z: 0,
                force: false,
            },
            &config,
            dir.path().to_path_buf(),
        )
        .unwrap();
        assert!(dir.path().join("world").join("r.0.0.vxr").exists());
        let err = run(&Command::Delete { x: 9, z: 9 }, &config, dir.path().to_path_buf());
        assert!(matches!(
            err,
            Err(AppError::Command(CommandError::MissingChunk { x: 9, z: 9 }))
        ));
    }
}
