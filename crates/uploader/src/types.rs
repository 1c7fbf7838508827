//! Upload requests and collaborator callbacks.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chunkline_protocol::FileStatus;
use chunkline_transfer::{ByteSource, ChunkReader, FileSource};

use crate::error::UploadError;

/// Status sink: `(file name, status, optional diagnostic)`.
pub type StatusCallback = Box<dyn Fn(&str, FileStatus, Option<&str>) + Send + Sync>;

/// Progress sink: `(file name, percent 0..=100)`.
pub type ProgressCallback = Box<dyn Fn(&str, u8) + Send + Sync>;

/// Deletion sink, invoked with the fid of a file aborted after its chunk
/// had already been sent.
pub type DeleteCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Authorization gate checked before each file starts.
pub type AuthorizeFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Callbacks into the caller. All default to no-ops; no gate means
/// every file is authorized.
pub struct UploadHooks {
    pub on_status_changed: StatusCallback,
    pub on_progress: ProgressCallback,
    pub on_deleting: DeleteCallback,
    pub authorize: Option<AuthorizeFn>,
}

impl Default for UploadHooks {
    fn default() -> Self {
        Self {
            on_status_changed: Box::new(|_, _, _| {}),
            on_progress: Box::new(|_, _| {}),
            on_deleting: Box::new(|_| {}),
            authorize: None,
        }
    }
}

impl UploadHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_status(
        mut self,
        callback: impl Fn(&str, FileStatus, Option<&str>) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_changed = Box::new(callback);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&str, u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Box::new(callback);
        self
    }

    pub fn on_deleting(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_deleting = Box::new(callback);
        self
    }

    pub fn authorize(mut self, gate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.authorize = Some(Box::new(gate));
        self
    }

    pub(crate) fn is_authorized(&self) -> bool {
        self.authorize.as_ref().is_none_or(|gate| gate())
    }
}

/// A file waiting to be uploaded. Immutable once created.
#[derive(Clone)]
pub struct UploadRequest {
    name: String,
    size: u64,
    source: Arc<dyn ByteSource>,
}

impl UploadRequest {
    /// Creates a request named `name` reading from `source`.
    pub fn new(name: impl Into<String>, source: Arc<dyn ByteSource>) -> Self {
        Self {
            name: name.into(),
            size: source.size(),
            source,
        }
    }

    /// Opens a file on disk; the request is named after the file name.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UploadError::Config(format!("not a file path: {}", path.display()))
            })?;
        let source = FileSource::open(path)?;
        Ok(Self::new(name, Arc::new(source)))
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, Arc::new(data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn reader(&self) -> ChunkReader {
        ChunkReader::new(Arc::clone(&self.source))
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
