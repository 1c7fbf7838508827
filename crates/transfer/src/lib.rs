//! Chunk planning, byte-range reads and chunk persistence.
//!
//! The uploader side uses [`ChunkPlan`] to split a file into fixed-size
//! ranges and [`ChunkReader`] to fetch each range from a [`ByteSource`].
//! The receiving side uses [`ChunkWriter`] to place chunks at their offsets.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ByteSource, ChunkReader, ChunkWriter, FileSource};
pub use progress::{ProgressTracker, progress_percent};
pub use types::{ChunkDescriptor, ChunkPlan, ChunkRange};
pub use validation::validate_fid;

/// Default chunk size: 1,000,000 bytes.
///
/// Bounds the payload of a single chunk request.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("range {offset}+{len} exceeds source size {size}")]
    OutOfRange { offset: u64, len: usize, size: u64 },

    #[error("invalid file identifier: {0}")]
    InvalidFid(String),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}
