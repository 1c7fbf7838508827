//! Chunked file upload queue.
//!
//! Files are split into fixed-size chunks and posted one request at a time
//! to a remote endpoint, which answers the first chunk with a file
//! identifier (fid) that every later chunk echoes. This crate holds the
//! client-side state machine; it has no UI dependencies and talks to the
//! network only through the [`ChunkTransport`] trait.
//!
//! # Components
//!
//! - [`UploadQueue`]: FIFO of pending files, at most one active transfer
//! - [`ChunkSequencer`]: drives one file chunk by chunk
//! - [`ChunkTransport`]: one chunk's network exchange ([`HttpChunkTransport`]
//!   is the reqwest implementation)
//! - [`cancel`]: resolves `abort(filename)` against the queue, including
//!   the deferred delete of a file whose chunk already left the client

pub mod cancel;
pub mod config;
pub mod error;
pub mod http;
pub mod queue;
pub mod sequencer;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::{AbortResolution, DeleteQueue};
pub use config::UploaderConfig;
pub use error::UploadError;
pub use http::HttpChunkTransport;
pub use queue::UploadQueue;
pub use sequencer::{ChunkSequencer, FileOutcome, SequenceMonitor};
pub use transport::{
    AbortOutcome, ChunkHandle, ChunkObserver, ChunkRequest, ChunkTransport, TransportError,
    TransportFuture,
};
pub use types::{UploadHooks, UploadRequest};

pub use chunkline_protocol::{FileStatus, UploadStatus};
