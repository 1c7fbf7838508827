//! Wire contract for chunked uploads.
//!
//! Every chunk travels as one multipart form request carrying the payload
//! plus four text fields (see [`constants`]). The receiving endpoint answers
//! each accepted chunk with the file identifier (fid) as plain text.

pub mod constants;
pub mod messages;
pub mod types;

pub use messages::{ChunkFields, ProtocolError};
pub use types::{FileStatus, UploadStatus};
