use std::fmt;

use serde::{Deserialize, Serialize};

/// File-level status reported to the status sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Start,
    End,
    Error,
    Abort,
}

impl FileStatus {
    /// Returns the wire/string form (`start`, `end`, `error`, `abort`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Error => "error",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the in-flight chunk request of the active file currently stands.
///
/// Only a request in [`Sending`](Self::Sending) can still be interrupted.
/// Once the payload has fully left the client the request is
/// [`AwaitingResponse`](Self::AwaitingResponse) and an abort can only be
/// honoured by deleting the file after the server replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Sending,
    AwaitingResponse,
    Responded,
}
