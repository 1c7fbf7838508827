//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use chunkline_protocol::FileStatus;
use chunkline_transfer::ChunkDescriptor;

use crate::transport::{
    ChunkObserver, ChunkRequest, ChunkTransport, TransportError, TransportFuture,
};
use crate::types::UploadHooks;

/// Where a held chunk request stops until [`MockTransport::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hold {
    /// Before the payload is reported sent; cancellable.
    WhileSending,
    /// After the payload is reported sent, before the response.
    AfterSent,
}

#[derive(Debug, Clone)]
pub(crate) struct SentChunk {
    pub file: String,
    pub descriptor: ChunkDescriptor,
    pub len: usize,
}

/// In-memory transport. Chunk 0 of every file gets a fresh `fid-N`,
/// later chunks echo their descriptor's fid.
pub(crate) struct MockTransport {
    holds: HashMap<String, Hold>,
    fail_on: Option<(String, u64)>,
    empty_fid: bool,
    gate: Semaphore,
    entered_tx: mpsc::UnboundedSender<(String, u64)>,
    entered_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(String, u64)>>,
    sent: Mutex<Vec<SentChunk>>,
    deleted: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_fid: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        Self {
            holds: HashMap::new(),
            fail_on: None,
            empty_fid: false,
            gate: Semaphore::new(0),
            entered_tx,
            entered_rx: tokio::sync::Mutex::new(entered_rx),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_fid: AtomicUsize::new(1),
        }
    }

    /// Holds every chunk of `file` at `hold`.
    pub fn hold(mut self, file: &str, hold: Hold) -> Self {
        self.holds.insert(file.to_string(), hold);
        self
    }

    /// Answers chunk `seq` of `file` with a 500.
    pub fn fail_on(mut self, file: &str, seq: u64) -> Self {
        self.fail_on = Some((file.to_string(), seq));
        self
    }

    /// Answers every chunk with an empty body.
    pub fn empty_fid(mut self) -> Self {
        self.empty_fid = true;
        self
    }

    /// Lets `n` held requests proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Waits until the next request reaches the transport. Requests held
    /// [`Hold::AfterSent`] are signalled once their payload counts as sent.
    pub async fn entered(&self) -> (String, u64) {
        self.entered_rx
            .lock()
            .await
            .recv()
            .await
            .expect("mock transport dropped")
    }

    pub fn sent(&self) -> Vec<SentChunk> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, file: &str) -> Vec<SentChunk> {
        self.sent().into_iter().filter(|c| c.file == file).collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }

    fn respond(&self, file: &str, descriptor: &ChunkDescriptor) -> Result<String, TransportError> {
        if self
            .fail_on
            .as_ref()
            .is_some_and(|(f, seq)| f == file && *seq == descriptor.sequence)
        {
            return Err(TransportError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        if self.empty_fid {
            return Ok(String::new());
        }
        if descriptor.sequence == 0 {
            let n = self.next_fid.fetch_add(1, Ordering::SeqCst);
            Ok(format!("fid-{n}"))
        } else {
            Ok(descriptor.fid.clone())
        }
    }

    async fn exchange(
        &self,
        request: ChunkRequest,
        observer: Arc<dyn ChunkObserver>,
        cancel: CancellationToken,
    ) -> Result<String, TransportError> {
        let ChunkRequest {
            file_name,
            descriptor,
            payload,
        } = request;
        let total = payload.len() as u64;

        observer.on_start();
        self.sent.lock().unwrap().push(SentChunk {
            file: file_name.clone(),
            descriptor: descriptor.clone(),
            len: payload.len(),
        });
        let entered = (file_name.clone(), descriptor.sequence);

        match self.holds.get(&file_name) {
            Some(Hold::WhileSending) => {
                let _ = self.entered_tx.send(entered);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TransportError::Aborted),
                    _ = self.pass_gate() => {}
                }
                observer.on_progress(total, total);
            }
            Some(Hold::AfterSent) => {
                observer.on_progress(total, total);
                let _ = self.entered_tx.send(entered);
                self.pass_gate().await;
            }
            None => {
                let _ = self.entered_tx.send(entered);
                if cancel.is_cancelled() {
                    return Err(TransportError::Aborted);
                }
                observer.on_progress(total, total);
            }
        }

        self.respond(&file_name, &descriptor)
    }
}

impl ChunkTransport for MockTransport {
    fn send_chunk(
        &self,
        request: ChunkRequest,
        observer: Arc<dyn ChunkObserver>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, String> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let result = self.exchange(request, observer, cancel).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn delete_file(&self, fid: &str) -> TransportFuture<'_, ()> {
        self.deleted.lock().unwrap().push(fid.to_string());
        Box::pin(async { Ok(()) })
    }
}

/// Records every hook invocation.
#[derive(Default)]
pub(crate) struct Recorder {
    statuses: Mutex<Vec<(String, FileStatus, Option<String>)>>,
    progress: Mutex<Vec<(String, u8)>>,
    deletes: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn hooks(self: &Arc<Self>) -> UploadHooks {
        let statuses = Arc::clone(self);
        let progress = Arc::clone(self);
        let deletes = Arc::clone(self);
        UploadHooks::new()
            .on_status(move |name, status, diagnostic| {
                statuses.statuses.lock().unwrap().push((
                    name.to_string(),
                    status,
                    diagnostic.map(str::to_string),
                ));
            })
            .on_progress(move |name, percent| {
                progress.progress.lock().unwrap().push((name.to_string(), percent));
            })
            .on_deleting(move |fid| {
                deletes.deletes.lock().unwrap().push(fid.to_string());
            })
    }

    pub fn statuses_of(&self, file: &str) -> Vec<FileStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == file)
            .map(|(_, status, _)| *status)
            .collect()
    }

    pub fn diagnostic_of(&self, file: &str) -> Option<String> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _, _)| name == file)
            .and_then(|(_, _, diagnostic)| diagnostic.clone())
    }

    pub fn progress_of(&self, file: &str) -> Vec<u8> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == file)
            .map(|(_, percent)| *percent)
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}
