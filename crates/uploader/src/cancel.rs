//! Abort resolution and deferred deletes.
//!
//! `abort(filename)` is answered from the file's location and, for the
//! active file, from the [`UploadStatus`](chunkline_protocol::UploadStatus)
//! of its in-flight chunk:
//!
//! | Location                     | Action                                   |
//! |------------------------------|------------------------------------------|
//! | pending                      | removed, never touches the network       |
//! | active, chunk `Sending`      | request cancelled, sequence stops        |
//! | active, `AwaitingResponse`   | filename recorded in the [`DeleteQueue`] |
//! | active, between chunks       | sequence stops before the next chunk     |
//! | finished or unknown          | nothing                                  |
//!
//! A filename in the delete queue is resolved when its chunk settles: on
//! success the file's fid is returned for deletion, on failure the entry
//! is simply dropped. Sequencing is not stopped by a deferred delete.

use chunkline_transfer::ChunkDescriptor;

use crate::queue::QueueState;
use crate::transport::{AbortOutcome, ChunkHandle, TransportError};
use crate::types::UploadRequest;

/// Filenames whose fid must be deleted once known.
#[derive(Debug, Default)]
pub struct DeleteQueue {
    names: Vec<String>,
}

impl DeleteQueue {
    /// Records `name`; returns `false` if it was already recorded.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Removes `name`; returns whether it was recorded.
    pub fn take(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(index) => {
                self.names.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// What an abort did.
#[derive(Debug)]
pub enum AbortResolution {
    /// Removed from the pending queue.
    Dequeued(UploadRequest),
    /// The active file's in-flight chunk was cancelled.
    Cancelled,
    /// The active file had no cancellable request; it stops before its
    /// next chunk.
    Stopped,
    /// The chunk already left the client; the file is deleted once its
    /// fid is known.
    Deferred,
    /// Unknown or already finished.
    NotFound,
}

impl AbortResolution {
    /// `true` unless there was nothing to abort.
    pub fn acted(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Applies aborts and chunk results to a locked [`QueueState`].
pub(crate) struct CancellationCoordinator<'a> {
    state: &'a mut QueueState,
}

impl<'a> CancellationCoordinator<'a> {
    pub(crate) fn new(state: &'a mut QueueState) -> Self {
        Self { state }
    }

    pub(crate) fn abort(&mut self, filename: &str) -> AbortResolution {
        let QueueState {
            pending,
            active,
            delete_queue,
            ..
        } = &mut *self.state;

        if let Some(request) = pending
            .iter()
            .position(|r| r.name() == filename)
            .and_then(|index| pending.remove(index))
        {
            return AbortResolution::Dequeued(request);
        }

        let Some(active) = active
            .as_mut()
            .filter(|a| a.filename == filename && !a.finished)
        else {
            return AbortResolution::NotFound;
        };

        match active.chunk.as_ref().map(ChunkHandle::abort) {
            Some(AbortOutcome::Aborted) => {
                active.cancel.cancel();
                AbortResolution::Cancelled
            }
            Some(AbortOutcome::TooLate) => {
                delete_queue.insert(filename);
                AbortResolution::Deferred
            }
            Some(AbortOutcome::Settled) | None => {
                active.cancel.cancel();
                AbortResolution::Stopped
            }
        }
    }

    /// Records the result of transfer `id`'s chunk. Returns the fid to
    /// delete when the file's abort was deferred.
    pub(crate) fn settle(
        &mut self,
        id: u64,
        descriptor: &ChunkDescriptor,
        result: &Result<String, TransportError>,
    ) -> Option<String> {
        let QueueState {
            active,
            delete_queue,
            ..
        } = &mut *self.state;
        let active = active.as_mut().filter(|a| a.id == id)?;

        if let Some(chunk) = active.chunk.as_mut() {
            chunk.mark_responded();
        }
        if result.is_err() || descriptor.is_last_chunk {
            active.finished = true;
        }

        let deferred = delete_queue.take(&active.filename);
        let fid = result.as_ref().ok()?;
        if descriptor.sequence == 0 {
            active.fid = fid.clone();
        }
        (deferred && !active.fid.is_empty()).then(|| active.fid.clone())
    }
}
