//! Per-chunk transport abstraction.
//!
//! A [`ChunkTransport`] performs one chunk's network exchange. Lifecycle
//! events are split between the returned future (success with the file
//! identifier, error, or abort) and the [`ChunkObserver`] (start and
//! byte-level progress). Using a trait keeps the sequencing logic
//! decoupled from reqwest and testable with mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use chunkline_protocol::UploadStatus;
use chunkline_transfer::ChunkDescriptor;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Errors that end a chunk exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server returned an empty file identifier")]
    EmptyIdentifier,

    #[error("aborted")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

/// Receives start and progress events of one chunk request.
pub trait ChunkObserver: Send + Sync {
    /// The request started sending.
    fn on_start(&self);

    /// `sent` of `total` payload bytes have left the client. Reaching
    /// `sent >= total` means the request can no longer be aborted.
    fn on_progress(&self, sent: u64, total: u64);
}

/// One chunk ready to be sent.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub file_name: String,
    pub descriptor: ChunkDescriptor,
    pub payload: Bytes,
}

/// Sends chunks to the remote endpoint.
pub trait ChunkTransport: Send + Sync {
    /// Sends one chunk and resolves to the file identifier from the response.
    ///
    /// `cancel` only fires before `observer` has seen the full payload; the
    /// transport must then stop and return [`TransportError::Aborted`].
    fn send_chunk(
        &self,
        request: ChunkRequest,
        observer: Arc<dyn ChunkObserver>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, String>;

    /// Asks the remote side to discard the file `fid`. No-op by default.
    fn delete_file(&self, fid: &str) -> TransportFuture<'_, ()> {
        let _ = fid;
        Box::pin(async { Ok(()) })
    }
}

/// Result of trying to abort the current chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// The request was still sending and has been cancelled.
    Aborted,
    /// The payload already left the client and the response is pending;
    /// nothing was cancelled.
    TooLate,
    /// The request already resolved; nothing was cancelled.
    Settled,
}

/// Cancellation handle and [`UploadStatus`] of the active file's current chunk.
#[derive(Debug)]
pub struct ChunkHandle {
    cancel: CancellationToken,
    status: UploadStatus,
}

impl ChunkHandle {
    /// A handle for a chunk that is about to start sending.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            status: UploadStatus::Sending,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// The payload fully left the client.
    pub fn mark_sent(&mut self) {
        if self.status == UploadStatus::Sending {
            self.status = UploadStatus::AwaitingResponse;
        }
    }

    /// The request resolved (success, error or abort).
    pub fn mark_responded(&mut self) {
        self.status = UploadStatus::Responded;
    }

    /// Cancels the request if it is still sending.
    pub fn abort(&self) -> AbortOutcome {
        match self.status {
            UploadStatus::Sending => {
                self.cancel.cancel();
                AbortOutcome::Aborted
            }
            UploadStatus::AwaitingResponse => AbortOutcome::TooLate,
            UploadStatus::Responded => AbortOutcome::Settled,
        }
    }
}
