use std::path::PathBuf;

use crate::chunk_serial::ChunkSerError;

/// Errors surfaced by the chunk manager and region backends.
///
/// Absent chunks and regions are not errors; they are reported as `None`,
/// `false` or `0` by the operations that look them up.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A region file exists but its header cannot be trusted.
    #[error("corrupt region file {}: {reason}", path.display())]
    CorruptRegion { path: PathBuf, reason: String },
    /// A stored chunk payload could not be decoded.
    #[error("failed to decode chunk ({x}, {z})")]
    Decode {
        x: i32,
        z: i32,
        #[source]
        source: ChunkSerError,
    },
    /// The cursor was read before the first advance or after exhaustion.
    #[error("chunk cursor has no current element")]
    IteratorMisuse,
}
