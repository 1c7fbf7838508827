//! Multipart form field names used by every chunk request.

/// Binary chunk payload.
pub const FIELD_PAYLOAD: &str = "_upload";

/// 0-based chunk index within the file, stringified.
pub const FIELD_SEQUENCE: &str = "_seq";

/// Byte offset of the chunk (`sequence * chunk_size`), stringified.
pub const FIELD_OFFSET: &str = "_offset";

/// Server-issued file identifier; empty on the first chunk.
pub const FIELD_FID: &str = "_fid";

/// `"true"` on the final chunk of a file, `"false"` otherwise.
pub const FIELD_IS_LAST_CHUNK: &str = "_isLastChunk";

/// Header sent with every chunk request unless overridden in config.
pub const REQUESTED_WITH_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");
