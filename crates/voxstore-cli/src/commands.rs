//! Subcommand definitions and their execution against a chunk manager.

use std::io::Write;

use clap::Subcommand;
use voxstore_voxel::CHUNK_HEIGHT;
use voxstore_world::{ChunkKey, ChunkManager, RegionStore, WorldError};

/// Errors a subcommand can fail with.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("no chunk at ({x}, {z})")]
    MissingChunk { x: i32, z: i32 },
    #[error("chunk ({x}, {z}) already exists; pass --force to overwrite")]
    ChunkExists { x: i32, z: i32 },
    #[error("unknown block type: {0}")]
    UnknownBlock(String),
    #[error("block position ({0}, {1}, {2}) is outside the chunk")]
    OutOfBounds(usize, usize, usize),
}

/// Chunk coordinate given on the command line as `x,z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkArg(pub ChunkKey);

impl std::str::FromStr for ChunkArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, z) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `x,z`, got `{s}`"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|e| format!("bad coordinate `{part}`: {e}"))
        };
        Ok(ChunkArg(ChunkKey::new(parse(x)?, parse(z)?)))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List every stored chunk with its slot timestamp.
    List {
        /// Stop after this many chunks.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show where a chunk is stored and what it holds.
    #[command(allow_negative_numbers = true)]
    Info { x: i32, z: i32 },
    /// Create an empty chunk.
    #[command(allow_negative_numbers = true)]
    Create {
        x: i32,
        z: i32,
        /// Overwrite an existing chunk.
        #[arg(long)]
        force: bool,
    },
    /// Delete a chunk, and its region if it was the last one there.
    #[command(allow_negative_numbers = true)]
    Delete { x: i32, z: i32 },
    /// Copy a chunk to another location.
    #[command(allow_negative_numbers = true)]
    Copy {
        src_x: i32,
        src_z: i32,
        dst_x: i32,
        dst_z: i32,
    },
    /// Set one block inside a chunk.
    #[command(allow_negative_numbers = true)]
    SetBlock {
        x: i32,
        z: i32,
        bx: usize,
        by: usize,
        bz: usize,
        /// Block type name from the config's block list, or `air`.
        block: String,
    },
    /// Relight the given chunks (`x,z`), or every chunk when none are given.
    Relight {
        #[arg(allow_hyphen_values = true)]
        chunks: Vec<ChunkArg>,
    },
    /// Read or overwrite a chunk's slot timestamp.
    #[command(allow_negative_numbers = true)]
    Timestamp {
        x: i32,
        z: i32,
        /// New timestamp in seconds since the Unix epoch.
        #[arg(long)]
        set: Option<u32>,
    },
}

impl Command {
    /// `true` if the command leaves chunks dirty in the cache.
    fn needs_save(&self) -> bool {
        matches!(self, Command::SetBlock { .. } | Command::Relight { .. })
    }
}

/// Runs `command`, writing human-readable output to `out`.
///
/// Commands that edit chunks in the cache save before returning, relighting
/// first when `relight_on_save` is set.
pub fn run<S: RegionStore>(
    command: &Command,
    mgr: &mut ChunkManager<S>,
    relight_on_save: bool,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    match command {
        Command::List { limit } => {
            let limit = limit.unwrap_or(usize::MAX);
            let mut shown = 0;
            for handle in mgr.iter().take(limit) {
                writeln!(
                    out,
                    "{}\t{}",
                    handle.key(),
                    mgr.get_chunk_timestamp(handle.x(), handle.z())
                )?;
                shown += 1;
            }
            tracing::info!(chunks = shown, "listed chunks");
        }
        Command::Info { x, z } => {
            let chunk = mgr
                .get_chunk(*x, *z)?
                .ok_or(CommandError::MissingChunk { x: *x, z: *z })?;
            let key = chunk.key();
            let (lx, lz) = key.local();
            writeln!(out, "chunk      {key}")?;
            writeln!(out, "region     {} slot ({lx}, {lz})", key.region())?;
            writeln!(out, "timestamp  {}", mgr.get_chunk_timestamp(*x, *z))?;
            writeln!(out, "blocks     {} non-air", chunk.blocks().count_non_air())?;
            let registry = mgr.registry();
            let surface = (0..16)
                .flat_map(|bx| (0..16).map(move |bz| (bx, bz)))
                .filter_map(|(bx, bz)| {
                    chunk
                        .blocks()
                        .highest_opaque(bx, bz, |b| registry.is_opaque(b))
                })
                .max();
            match surface {
                Some(y) => writeln!(out, "surface    y = {y} of {CHUNK_HEIGHT}")?,
                None => writeln!(out, "surface    none")?,
            }
        }
        Command::Create { x, z, force } => {
            if !force && mgr.chunk_exists(*x, *z) {
                return Err(CommandError::ChunkExists { x: *x, z: *z });
            }
            let handle = mgr.create_chunk(*x, *z)?;
            writeln!(out, "created {}", handle.key())?;
        }
        Command::Delete { x, z } => {
            if !mgr.delete_chunk(*x, *z)? {
                return Err(CommandError::MissingChunk { x: *x, z: *z });
            }
            writeln!(out, "deleted ({x}, {z})")?;
        }
        Command::Copy {
            src_x,
            src_z,
            dst_x,
            dst_z,
        } => {
            let handle = mgr
                .copy_chunk(*src_x, *src_z, *dst_x, *dst_z)?
                .ok_or(CommandError::MissingChunk {
                    x: *src_x,
                    z: *src_z,
                })?;
            writeln!(out, "copied ({src_x}, {src_z}) -> {}", handle.key())?;
        }
        Command::SetBlock {
            x,
            z,
            bx,
            by,
            bz,
            block,
        } => {
            let id = mgr
                .registry()
                .lookup_by_name(block)
                .ok_or_else(|| CommandError::UnknownBlock(block.clone()))?;
            if *bx >= 16 || *by >= CHUNK_HEIGHT || *bz >= 16 {
                return Err(CommandError::OutOfBounds(*bx, *by, *bz));
            }
            let handle = mgr
                .get_chunk_handle(*x, *z)
                .ok_or(CommandError::MissingChunk { x: *x, z: *z })?;
            let chunk = mgr
                .chunk_mut(handle)?
                .ok_or(CommandError::MissingChunk { x: *x, z: *z })?;
            chunk.set_block(*bx, *by, *bz, id);
            writeln!(out, "set ({bx}, {by}, {bz}) in {} to {block}", handle.key())?;
        }
        Command::Relight { chunks } => {
            let keys: Vec<ChunkKey> = if chunks.is_empty() {
                mgr.iter().map(|handle| handle.key()).collect()
            } else {
                chunks.iter().map(|arg| arg.0).collect()
            };
            for key in keys {
                let handle = mgr
                    .get_chunk_handle(key.x, key.z)
                    .ok_or(CommandError::MissingChunk { x: key.x, z: key.z })?;
                mgr.mark_dirty(handle)?;
            }
            let relit = mgr.relight_dirty_chunks()?;
            writeln!(out, "relit {relit} chunks")?;
        }
        Command::Timestamp { x, z, set } => {
            if !mgr.chunk_exists(*x, *z) {
                return Err(CommandError::MissingChunk { x: *x, z: *z });
            }
            if let Some(timestamp) = set {
                mgr.set_chunk_timestamp(*x, *z, *timestamp)?;
            }
            writeln!(out, "{}", mgr.get_chunk_timestamp(*x, *z))?;
        }
    }

    if command.needs_save() {
        if relight_on_save && !matches!(command, Command::Relight { .. }) {
            mgr.relight_dirty_chunks()?;
        }
        let written = mgr.save()?;
        tracing::info!(written, "saved chunks");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use voxstore_voxel::{BlockDef, BlockId, BlockRegistry, Transparency};
    use voxstore_world::MemoryRegionStore;

    fn manager() -> ChunkManager<MemoryRegionStore> {
        let registry = BlockRegistry::from_defs([
            BlockDef::new("stone", Transparency::Opaque),
            BlockDef::new("torch", Transparency::FullyTransparent).with_emission(14),
        ])
        .unwrap();
        ChunkManager::new(MemoryRegionStore::new(), Arc::new(registry))
    }

    fn run_ok(command: Command, mgr: &mut ChunkManager<MemoryRegionStore>) -> String {
        let mut out = Vec::new();
        run(&command, mgr, true, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_chunk_arg_parses_negative_pairs() {
        assert_eq!(
            "-3,40".parse::<ChunkArg>().unwrap(),
            ChunkArg(ChunkKey::new(-3, 40))
        );
        assert!("3".parse::<ChunkArg>().is_err());
        assert!("a,b".parse::<ChunkArg>().is_err());
    }

    #[test]
    fn test_create_refuses_overwrite_without_force() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 1, z: 1, force: false }, &mut mgr);
        let mut out = Vec::new();
        let err = run(
            &Command::Create { x: 1, z: 1, force: false },
            &mut mgr,
            true,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::ChunkExists { x: 1, z: 1 }));
        run_ok(Command::Create { x: 1, z: 1, force: true }, &mut mgr);
    }

    #[test]
    fn test_set_block_saves_and_relights() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 0, z: 0, force: false }, &mut mgr);
        run_ok(
            Command::SetBlock {
                x: 0,
                z: 0,
                bx: 4,
                by: 10,
                bz: 4,
                block: "torch".into(),
            },
            &mut mgr,
        );
        assert_eq!(mgr.cache().dirty_len(), 0);
        let chunk = mgr.get_chunk(0, 0).unwrap().unwrap();
        assert_eq!(chunk.get_block(4, 10, 4), BlockId(2));
        assert_eq!(chunk.light().get(4, 10, 4).block_light(), 14);
    }

    #[test]
    fn test_set_block_rejects_unknown_type() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 0, z: 0, force: false }, &mut mgr);
        let mut out = Vec::new();
        let err = run(
            &Command::SetBlock {
                x: 0,
                z: 0,
                bx: 0,
                by: 0,
                bz: 0,
                block: "lava".into(),
            },
            &mut mgr,
            false,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::UnknownBlock(name) if name == "lava"));
    }

    #[test]
    fn test_list_and_delete() {
        let mut mgr = manager();
        run_ok(Command::Create { x: -1, z: 0, force: false }, &mut mgr);
        run_ok(Command::Create { x: 5, z: 5, force: false }, &mut mgr);
        let listing = run_ok(Command::List { limit: None }, &mut mgr);
        assert_eq!(listing.lines().count(), 2);
        assert!(listing.starts_with("(-1, 0)"));

        run_ok(Command::Delete { x: -1, z: 0 }, &mut mgr);
        let listing = run_ok(Command::List { limit: Some(10) }, &mut mgr);
        assert_eq!(listing.lines().count(), 1);
        assert!(!mgr.store().region_exists(voxstore_world::RegionKey::new(-1, 0)));
    }

    #[test]
    fn test_copy_and_timestamp() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 0, z: 0, force: false }, &mut mgr);
        let copied = run_ok(
            Command::Copy {
                src_x: 0,
                src_z: 0,
                dst_x: 100,
                dst_z: 100,
            },
            &mut mgr,
        );
        assert!(copied.contains("(100, 100)"));
        let stamp = run_ok(
            Command::Timestamp {
                x: 100,
                z: 100,
                set: Some(77),
            },
            &mut mgr,
        );
        assert_eq!(stamp.trim(), "77");
    }

    #[test]
    fn test_info_reports_surface() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 2, z: 3, force: false }, &mut mgr);
        run_ok(
            Command::SetBlock {
                x: 2,
                z: 3,
                bx: 0,
                by: 70,
                bz: 0,
                block: "stone".into(),
            },
            &mut mgr,
        );
        let info = run_ok(Command::Info { x: 2, z: 3 }, &mut mgr);
        assert!(info.contains("1 non-air"));
        assert!(info.contains("y = 70"));
    }

    #[test]
    fn test_relight_whole_world() {
        let mut mgr = manager();
        run_ok(Command::Create { x: 0, z: 0, force: false }, &mut mgr);
        run_ok(Command::Create { x: 0, z: 1, force: false }, &mut mgr);
        let out = run_ok(Command::Relight { chunks: vec![] }, &mut mgr);
        assert_eq!(out.trim(), "relit 2 chunks");
        assert_eq!(mgr.cache().dirty_len(), 0);
    }
}
