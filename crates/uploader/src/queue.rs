//! FIFO upload queue with a single active transfer.
//!
//! [`UploadQueue`] owns the pending files, the active transfer and the
//! delete queue behind one mutex. The active file runs as one spawned
//! tokio task driving a [`ChunkSequencer`]; when it reaches a terminal
//! outcome the queue reports it and starts the next pending file.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use chunkline_protocol::FileStatus;
use chunkline_transfer::ChunkDescriptor;

use crate::cancel::{AbortResolution, CancellationCoordinator, DeleteQueue};
use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::http::HttpChunkTransport;
use crate::sequencer::{ChunkSequencer, FileOutcome, SequenceMonitor};
use crate::transport::{ChunkHandle, ChunkTransport, TransportError};
use crate::types::{UploadHooks, UploadRequest};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The file currently being sequenced.
#[derive(Debug)]
pub(crate) struct ActiveTransfer {
    /// Distinguishes successive transfers of files with the same name.
    pub(crate) id: u64,
    pub(crate) filename: String,
    /// Empty until chunk 0 succeeds.
    pub(crate) fid: String,
    /// Stops the whole file; each chunk's token is a child of it.
    pub(crate) cancel: CancellationToken,
    /// `None` until the first chunk is handed to the transport.
    pub(crate) chunk: Option<ChunkHandle>,
    /// Set once the last chunk settled or a chunk failed.
    pub(crate) finished: bool,
}

impl ActiveTransfer {
    pub(crate) fn new(id: u64, filename: &str) -> Self {
        Self {
            id,
            filename: filename.to_string(),
            fid: String::new(),
            cancel: CancellationToken::new(),
            chunk: None,
            finished: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub(crate) pending: VecDeque<UploadRequest>,
    pub(crate) active: Option<ActiveTransfer>,
    pub(crate) delete_queue: DeleteQueue,
    next_id: u64,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_none()
    }
}

struct Shared {
    state: Mutex<QueueState>,
    transport: Arc<dyn ChunkTransport>,
    hooks: UploadHooks,
    chunk_size: usize,
    runtime: Handle,
    idle_tx: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the state lock held so idle transitions are
    /// published in the order they happen.
    fn publish_idle(&self, state: &QueueState) {
        let idle = state.is_idle();
        self.idle_tx.send_if_modified(|current| {
            let changed = *current != idle;
            *current = idle;
            changed
        });
    }

    fn emit(&self, file: &str, status: FileStatus, diagnostic: Option<&str>) {
        (self.hooks.on_status_changed)(file, status, diagnostic);
    }
}

// ---------------------------------------------------------------------------
// UploadQueue
// ---------------------------------------------------------------------------

/// Uploads files one at a time, in the order they were sent.
///
/// Cloning is cheap; all clones share the same queue.
#[derive(Clone)]
pub struct UploadQueue {
    shared: Arc<Shared>,
}

impl UploadQueue {
    /// Creates a queue that posts chunks over HTTP.
    ///
    /// Fails if the config is invalid (e.g. no endpoint) or if called
    /// outside a tokio runtime.
    pub fn new(config: UploaderConfig, hooks: UploadHooks) -> Result<Self, UploadError> {
        let transport = HttpChunkTransport::new(&config)?;
        Self::with_transport(config, hooks, Arc::new(transport))
    }

    /// Creates a queue with a custom transport.
    pub fn with_transport(
        config: UploaderConfig,
        hooks: UploadHooks,
        transport: Arc<dyn ChunkTransport>,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            UploadError::Config("upload queue must be created inside a tokio runtime".into())
        })?;
        let (idle_tx, _) = watch::channel(true);

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                transport,
                hooks,
                chunk_size: config.chunk_size,
                runtime,
                idle_tx,
            }),
        })
    }

    /// Appends a file to the queue and starts it if nothing is active.
    pub fn send(&self, request: UploadRequest) {
        tracing::debug!(file = request.name(), size = request.size(), "file queued");
        {
            let mut state = self.shared.lock();
            state.pending.push_back(request);
            self.shared.publish_idle(&state);
        }
        self.start_next();
    }

    /// Aborts `filename`. Returns `false` only if there was nothing to
    /// abort (unknown or already finished). Never blocks on the network.
    pub fn abort(&self, filename: &str) -> bool {
        let resolution = {
            let mut state = self.shared.lock();
            let resolution = CancellationCoordinator::new(&mut state).abort(filename);
            if matches!(resolution, AbortResolution::Dequeued(_)) {
                self.shared.publish_idle(&state);
            }
            resolution
        };

        match &resolution {
            AbortResolution::Dequeued(_) => {
                tracing::info!(file = filename, "removed from pending queue");
            }
            AbortResolution::Cancelled => {
                tracing::info!(file = filename, "in-flight chunk cancelled");
            }
            AbortResolution::Stopped => {
                tracing::info!(file = filename, "upload stopped before next chunk");
            }
            AbortResolution::Deferred => {
                tracing::info!(
                    file = filename,
                    "chunk already sent, file will be deleted once uploaded"
                );
            }
            AbortResolution::NotFound => {
                tracing::debug!(file = filename, "nothing to abort");
            }
        }
        resolution.acted()
    }

    /// Names of the files waiting to start, in order.
    pub fn pending_files(&self) -> Vec<String> {
        self.shared
            .lock()
            .pending
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Name of the file being uploaded, if any.
    pub fn active_file(&self) -> Option<String> {
        self.shared.lock().active.as_ref().map(|a| a.filename.clone())
    }

    /// Files whose fid will be deleted once known.
    pub fn deferred_deletes(&self) -> Vec<String> {
        self.shared.lock().delete_queue.names().to_vec()
    }

    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_idle()
    }

    /// Resolves once nothing is pending or active.
    pub async fn wait_idle(&self) {
        let mut idle = self.shared.idle_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = idle.wait_for(|idle| *idle).await;
    }

    fn start_next(&self) {
        loop {
            let (id, request) = {
                let mut state = self.shared.lock();
                if state.active.is_some() {
                    return;
                }
                let Some(request) = state.pending.pop_front() else {
                    self.shared.publish_idle(&state);
                    return;
                };
                state.next_id += 1;
                let id = state.next_id;
                state.active = Some(ActiveTransfer::new(id, request.name()));
                (id, request)
            };

            // The slot is reserved, so the gate runs without the lock held.
            if self.shared.hooks.is_authorized() {
                self.spawn_transfer(id, request);
                return;
            }

            tracing::debug!(file = request.name(), "upload not authorized, dropping file");
            let mut state = self.shared.lock();
            if state.active.as_ref().is_some_and(|a| a.id == id) {
                state.active = None;
            }
        }
    }

    fn spawn_transfer(&self, id: u64, request: UploadRequest) {
        let name = request.name().to_string();
        tracing::debug!(file = %name, size = request.size(), "transfer activated");

        let monitor = Arc::new(ActiveMonitor {
            shared: Arc::clone(&self.shared),
            id,
            name: name.clone(),
        });
        let sequencer = ChunkSequencer::new(
            name.clone(),
            request.reader(),
            self.shared.chunk_size,
            Arc::clone(&self.shared.transport),
            monitor,
        );

        let queue = self.clone();
        self.shared.runtime.spawn(async move {
            let outcome = sequencer.run().await;
            queue.finish(id, &name, outcome);
        });
    }

    fn finish(&self, id: u64, name: &str, outcome: FileOutcome) {
        {
            let mut state = self.shared.lock();
            if state.active.as_ref().is_some_and(|a| a.id == id) {
                state.active = None;
            }
        }

        match &outcome {
            FileOutcome::Completed { fid } => {
                tracing::info!(file = name, fid = %fid, "upload complete")
            }
            FileOutcome::Failed(reason) => tracing::warn!(file = name, %reason, "upload failed"),
            FileOutcome::Aborted => tracing::info!(file = name, "upload aborted"),
        }
        self.shared.emit(name, outcome.status(), outcome.diagnostic());
        self.start_next();
    }
}

// ---------------------------------------------------------------------------
// ActiveMonitor
// ---------------------------------------------------------------------------

/// Feeds one transfer's sequencer events back into the queue state.
struct ActiveMonitor {
    shared: Arc<Shared>,
    id: u64,
    name: String,
}

impl ActiveMonitor {
    fn with_active<R>(&self, f: impl FnOnce(&mut ActiveTransfer) -> Option<R>) -> Option<R> {
        let mut state = self.shared.lock();
        state.active.as_mut().filter(|a| a.id == self.id).and_then(f)
    }

    /// Fire-and-forget remote delete of an aborted file.
    fn delete(&self, fid: String) {
        tracing::info!(file = %self.name, fid = %fid, "deleting aborted file");
        (self.shared.hooks.on_deleting)(&fid);

        let transport = Arc::clone(&self.shared.transport);
        let name = self.name.clone();
        self.shared.runtime.spawn(async move {
            if let Err(e) = transport.delete_file(&fid).await {
                tracing::warn!(file = %name, fid = %fid, error = %e, "remote delete failed");
            }
        });
    }
}

impl SequenceMonitor for ActiveMonitor {
    fn begin_chunk(&self, descriptor: &ChunkDescriptor) -> Option<CancellationToken> {
        let token = self.with_active(|active| {
            if active.cancel.is_cancelled() {
                return None;
            }
            let token = active.cancel.child_token();
            active.chunk = Some(ChunkHandle::new(token.clone()));
            Some(token)
        });
        if token.is_none() {
            tracing::debug!(
                file = %self.name,
                seq = descriptor.sequence,
                "sequence stopped before chunk"
            );
        }
        token
    }

    fn payload_sent(&self, _sequence: u64) {
        self.with_active(|active| {
            active.chunk.as_mut().map(ChunkHandle::mark_sent)
        });
    }

    fn chunk_settled(&self, descriptor: &ChunkDescriptor, result: &Result<String, TransportError>) {
        let doomed = {
            let mut state = self.shared.lock();
            CancellationCoordinator::new(&mut state).settle(self.id, descriptor, result)
        };
        if let Some(fid) = doomed {
            self.delete(fid);
        }
    }

    fn file_started(&self) {
        self.shared.emit(&self.name, FileStatus::Start, None);
    }

    fn progress(&self, percent: u8) {
        (self.shared.hooks.on_progress)(&self.name, percent);
    }
}
