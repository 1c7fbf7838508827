use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::TransferError;
use crate::types::ChunkRange;

// ---------------------------------------------------------------------------
// Byte sources
// ---------------------------------------------------------------------------

/// Random-access source of a file's bytes.
pub trait ByteSource: Send + Sync {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;
}

/// A file on disk opened for positioned reads.
pub struct FileSource {
    file: Mutex<std::fs::File>,
    size: u64,
}

impl FileSource {
    /// Opens `path` and records its current size.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

impl ByteSource for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| unexpected_eof())?;
        let end = start.checked_add(buf.len()).ok_or_else(unexpected_eof)?;
        let src = self.get(start..end).ok_or_else(unexpected_eof)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

fn unexpected_eof() -> std::io::Error {
    std::io::Error::from(std::io::ErrorKind::UnexpectedEof)
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Produces the bytes of a chunk range from a [`ByteSource`].
///
/// Stateless: every read is a pure function of (source, offset, length),
/// so the reader can be shared and moved onto the blocking pool freely.
#[derive(Clone)]
pub struct ChunkReader {
    source: Arc<dyn ByteSource>,
}

impl ChunkReader {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        Self { source }
    }

    /// Reads `len` bytes starting at `offset`.
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let size = self.source.size();
        let in_range = offset
            .checked_add(len as u64)
            .is_some_and(|end| end <= size);
        if !in_range {
            return Err(TransferError::OutOfRange { offset, len, size });
        }

        let mut buf = vec![0u8; len];
        self.source.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Reads the bytes covered by `range`.
    pub fn read_range(&self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        self.read(range.offset, range.len)
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.source.size()
    }
}

// ---------------------------------------------------------------------------
// ChunkWriter
// ---------------------------------------------------------------------------

/// Writes received chunks into `<base>/<fid>` at their byte offsets.
pub struct ChunkWriter {
    base_path: PathBuf,
}

impl ChunkWriter {
    /// Creates a writer rooted at `base_path`.
    pub fn new(base_path: &Path) -> Self {
        Self {
            base_path: base_path.to_path_buf(),
        }
    }

    /// Writes `data` at `offset` of the file identified by `fid`.
    ///
    /// Creates the storage directory if needed and returns the new
    /// end-of-write offset.
    pub fn write_chunk(
        &mut self,
        fid: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<u64, TransferError> {
        crate::validate_fid(fid)?;

        std::fs::create_dir_all(&self.base_path)?;
        let full_path = self.base_path.join(fid);

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&full_path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        let end = offset + data.len() as u64;
        debug!(fid, offset, len = data.len(), "chunk written");
        Ok(end)
    }

    /// Removes the stored file for `fid`. Returns `false` if nothing was stored.
    pub fn remove(&mut self, fid: &str) -> Result<bool, TransferError> {
        crate::validate_fid(fid)?;

        match std::fs::remove_file(self.base_path.join(fid)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
