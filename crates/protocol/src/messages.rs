//! Text fields that accompany each chunk payload.

use crate::constants::{FIELD_FID, FIELD_IS_LAST_CHUNK, FIELD_OFFSET, FIELD_SEQUENCE};

/// Errors produced while decoding chunk form fields.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Metadata sent alongside one chunk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFields {
    pub sequence: u64,
    pub offset: u64,
    /// Empty on sequence 0.
    pub fid: String,
    pub is_last_chunk: bool,
}

impl ChunkFields {
    /// Encodes the metadata as `(field, value)` pairs in wire order.
    pub fn to_pairs(&self) -> [(&'static str, String); 4] {
        [
            (FIELD_SEQUENCE, self.sequence.to_string()),
            (FIELD_OFFSET, self.offset.to_string()),
            (FIELD_FID, self.fid.clone()),
            (FIELD_IS_LAST_CHUNK, self.is_last_chunk.to_string()),
        ]
    }

    /// Decodes metadata from form fields looked up through `get`.
    ///
    /// A missing `_fid` is treated as empty, matching what a client sends
    /// for the first chunk. The other fields are required.
    pub fn from_lookup<'a, F>(get: F) -> Result<Self, ProtocolError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let sequence = parse_u64(FIELD_SEQUENCE, get(FIELD_SEQUENCE))?;
        let offset = parse_u64(FIELD_OFFSET, get(FIELD_OFFSET))?;
        let fid = get(FIELD_FID).unwrap_or_default().to_string();
        let is_last_chunk = match get(FIELD_IS_LAST_CHUNK) {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(ProtocolError::InvalidField {
                    field: FIELD_IS_LAST_CHUNK,
                    value: other.to_string(),
                });
            }
            None => return Err(ProtocolError::MissingField(FIELD_IS_LAST_CHUNK)),
        };

        Ok(Self {
            sequence,
            offset,
            fid,
            is_last_chunk,
        })
    }
}

fn parse_u64(field: &'static str, value: Option<&str>) -> Result<u64, ProtocolError> {
    let value = value.ok_or(ProtocolError::MissingField(field))?;
    value.trim().parse().map_err(|_| ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    })
}
