//! Drives one file from offset 0 to its end, one chunk at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use chunkline_protocol::FileStatus;
use chunkline_transfer::{
    ChunkDescriptor, ChunkPlan, ChunkReader, ProgressTracker, progress_percent,
};

use crate::transport::{ChunkObserver, ChunkRequest, ChunkTransport, TransportError};

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Receives the sequencer's state transitions.
///
/// The upload queue implements this to track the active chunk's
/// [`UploadStatus`](chunkline_protocol::UploadStatus) and to emit
/// notifications. All methods are called synchronously from the
/// sequencing task or from the transport's progress path.
pub trait SequenceMonitor: Send + Sync {
    /// A chunk is about to be handed to the transport. Returns the token
    /// that aborts it, or `None` if the file was aborted in the meantime.
    fn begin_chunk(&self, descriptor: &ChunkDescriptor) -> Option<CancellationToken>;

    /// The chunk's payload has fully left the client.
    fn payload_sent(&self, sequence: u64);

    /// The chunk's request resolved.
    fn chunk_settled(
        &self,
        descriptor: &ChunkDescriptor,
        result: &Result<String, TransportError>,
    );

    /// The first chunk started sending.
    fn file_started(&self);

    /// The file's upload percentage advanced.
    fn progress(&self, percent: u8);
}

/// How a file's sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Completed { fid: String },
    Failed(String),
    Aborted,
}

impl FileOutcome {
    /// Terminal status reported for this outcome.
    pub fn status(&self) -> FileStatus {
        match self {
            Self::Completed { .. } => FileStatus::End,
            Self::Failed(_) => FileStatus::Error,
            Self::Aborted => FileStatus::Abort,
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// Sends a file's chunks strictly in order, never more than one in flight.
pub struct ChunkSequencer {
    file_name: String,
    reader: ChunkReader,
    chunk_size: usize,
    transport: Arc<dyn ChunkTransport>,
    monitor: Arc<dyn SequenceMonitor>,
}

impl ChunkSequencer {
    pub fn new(
        file_name: impl Into<String>,
        reader: ChunkReader,
        chunk_size: usize,
        transport: Arc<dyn ChunkTransport>,
        monitor: Arc<dyn SequenceMonitor>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            reader,
            chunk_size,
            transport,
            monitor,
        }
    }

    /// Runs the sequence to a terminal outcome.
    pub async fn run(self) -> FileOutcome {
        let plan = match ChunkPlan::new(self.reader.file_size(), self.chunk_size) {
            Ok(plan) => plan,
            Err(e) => return FileOutcome::Failed(e.to_string()),
        };
        if plan.file_size() == 0 {
            self.monitor.file_started();
            self.monitor.progress(100);
            return FileOutcome::Completed { fid: String::new() };
        }

        let tracker = Arc::new(ProgressTracker::new());
        let mut fid = String::new();

        for range in plan.ranges() {
            let reader = self.reader.clone();
            let read = tokio::task::spawn_blocking(move || reader.read_range(&range)).await;
            let payload = match read {
                Ok(Ok(bytes)) => Bytes::from(bytes),
                Ok(Err(e)) => return FileOutcome::Failed(format!("read failed: {e}")),
                Err(e) => return FileOutcome::Failed(format!("read task failed: {e}")),
            };

            let descriptor = ChunkDescriptor::for_range(&range, &fid);
            let Some(cancel) = self.monitor.begin_chunk(&descriptor) else {
                return FileOutcome::Aborted;
            };

            let observer = Arc::new(ChunkProgress {
                monitor: Arc::clone(&self.monitor),
                tracker: Arc::clone(&tracker),
                sequence: range.sequence,
                chunk_size: plan.chunk_size(),
                file_size: plan.file_size(),
                sent: AtomicBool::new(false),
            });
            let request = ChunkRequest {
                file_name: self.file_name.clone(),
                descriptor: descriptor.clone(),
                payload,
            };

            tracing::trace!(
                file = %self.file_name,
                seq = range.sequence,
                offset = range.offset,
                len = range.len,
                last = range.is_last,
                "sending chunk"
            );

            let mut result = self.transport.send_chunk(request, observer.clone(), cancel).await;
            if range.sequence == 0 && matches!(&result, Ok(id) if id.is_empty()) {
                result = Err(TransportError::EmptyIdentifier);
            }
            self.monitor.chunk_settled(&descriptor, &result);

            match result {
                Ok(id) => {
                    if range.sequence == 0 {
                        fid = id;
                    } else if id != fid {
                        tracing::warn!(
                            file = %self.file_name,
                            seq = range.sequence,
                            expected = %fid,
                            got = %id,
                            "server returned a different file identifier, keeping the first"
                        );
                    }
                    observer.on_progress(range.len as u64, range.len as u64);

                    if range.is_last {
                        return FileOutcome::Completed { fid };
                    }
                    tokio::task::yield_now().await;
                }
                Err(TransportError::Aborted) => return FileOutcome::Aborted,
                Err(e) => return FileOutcome::Failed(e.to_string()),
            }
        }

        FileOutcome::Completed { fid }
    }
}

/// Translates one chunk's byte progress into file-level events.
struct ChunkProgress {
    monitor: Arc<dyn SequenceMonitor>,
    tracker: Arc<ProgressTracker>,
    sequence: u64,
    chunk_size: usize,
    file_size: u64,
    sent: AtomicBool,
}

impl ChunkObserver for ChunkProgress {
    fn on_start(&self) {
        if self.sequence == 0 {
            self.monitor.file_started();
        }
    }

    fn on_progress(&self, sent: u64, total: u64) {
        if sent >= total && !self.sent.swap(true, Ordering::AcqRel) {
            self.monitor.payload_sent(self.sequence);
        }
        let percent = progress_percent(self.sequence, self.chunk_size, sent, self.file_size);
        if let Some(percent) = self.tracker.advance(percent) {
            self.monitor.progress(percent);
        }
    }
}
