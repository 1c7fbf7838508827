//! Reference receiving endpoint for chunked uploads.
//!
//! `POST /upload` takes one multipart chunk form, answers chunk 0 with a
//! freshly issued fid and every later chunk with the fid it echoed, and
//! writes the payload at its offset into `<storage>/<fid>`.
//! `POST /delete?fid=<fid>` discards a stored file.
//!
//! Intended for development and integration tests, not production use.

mod routes;
mod server;

pub use routes::{AppState, router};
pub use server::{ServerConfig, serve};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use chunkline_protocol::ProtocolError;
use chunkline_transfer::TransferError;

/// Maximum accepted request body.
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Errors produced by the dev server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed form: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("invalid chunk fields: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("storage error: {0}")]
    Transfer(#[from] TransferError),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("invalid listen address: {0}")]
    InvalidAddr(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Multipart(_)
            | Self::Protocol(_)
            | Self::Transfer(TransferError::InvalidFid(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
