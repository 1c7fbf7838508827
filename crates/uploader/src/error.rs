//! Uploader error types.

/// Errors produced while configuring or feeding the upload queue.
///
/// Per-file failures during an upload are not returned here; they end the
/// file with an `error` status (see [`TransportError`](crate::TransportError)).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] chunkline_transfer::TransferError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
