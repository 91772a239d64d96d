//! Block storage for chunk columns: the block type registry, dense column
//! storage and the run-length codec used to persist both blocks and light.

pub mod column;
pub mod registry;
pub mod rle;

pub use column::{BlockColumn, CHUNK_HEIGHT, CHUNK_WIDTH, COLUMN_VOLUME, column_index};
pub use registry::{BlockDef, BlockId, BlockRegistry, MAX_EMISSION, RegistryError, Transparency};
pub use rle::{RleError, RleRun, RunValue, rle_decode, rle_encode, rle_from_bytes, rle_to_bytes};
