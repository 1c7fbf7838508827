use chunkline_protocol::ChunkFields;

use crate::TransferError;

/// One contiguous byte range of a file, sent as a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// 0-based chunk index.
    pub sequence: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length in bytes (only the last chunk may be shorter than the chunk size).
    pub len: usize,
    /// `true` when `offset + len` reaches the end of the file.
    pub is_last: bool,
}

/// Splits a file of known size into fixed-size chunk ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: usize,
}

impl ChunkPlan {
    /// Creates a plan. A `chunk_size` of 0 is rejected.
    pub fn new(file_size: u64, chunk_size: usize) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::ZeroChunkSize);
        }
        Ok(Self {
            file_size,
            chunk_size,
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks: `ceil(file_size / chunk_size)`.
    pub fn chunk_count(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size as u64)
    }

    /// Returns the range for `sequence`, or `None` past the end of the file.
    pub fn range(&self, sequence: u64) -> Option<ChunkRange> {
        let offset = sequence.checked_mul(self.chunk_size as u64)?;
        if offset >= self.file_size {
            return None;
        }
        let end = offset
            .saturating_add(self.chunk_size as u64)
            .min(self.file_size);
        Some(ChunkRange {
            sequence,
            offset,
            len: (end - offset) as usize,
            is_last: end >= self.file_size,
        })
    }

    /// Iterates over every range in order.
    pub fn ranges(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.chunk_count()).filter_map(|seq| self.range(seq))
    }
}

/// Per-chunk metadata handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub sequence: u64,
    pub offset: u64,
    pub is_last_chunk: bool,
    /// Empty on sequence 0; the server-issued identifier afterwards.
    pub fid: String,
}

impl ChunkDescriptor {
    /// Builds the descriptor for `range`, echoing the identifier known so far.
    pub fn for_range(range: &ChunkRange, fid: &str) -> Self {
        Self {
            sequence: range.sequence,
            offset: range.offset,
            is_last_chunk: range.is_last,
            fid: fid.to_string(),
        }
    }

    /// Converts to the wire representation.
    pub fn to_fields(&self) -> ChunkFields {
        ChunkFields {
            sequence: self.sequence,
            offset: self.offset,
            fid: self.fid.clone(),
            is_last_chunk: self.is_last_chunk,
        }
    }
}
