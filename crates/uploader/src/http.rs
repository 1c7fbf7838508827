//! reqwest-backed [`ChunkTransport`].
//!
//! Each chunk is one `multipart/form-data` POST: the payload part first,
//! followed by the sequence, offset, fid and last-chunk text fields. The
//! response body (trimmed) is the file identifier.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use tokio_util::sync::CancellationToken;

use chunkline_protocol::constants::FIELD_PAYLOAD;

use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::transport::{
    ChunkObserver, ChunkRequest, ChunkTransport, TransportError, TransportFuture,
};

/// Size of the pieces the payload is streamed in. Progress is reported
/// per piece.
const BODY_PIECE_SIZE: usize = 64 * 1024;

/// Sends chunks over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChunkTransport {
    http: Client,
    endpoint: Url,
    delete_endpoint: Option<Url>,
}

impl HttpChunkTransport {
    /// Builds a client from a validated config. The configured headers are
    /// sent with every request.
    pub fn new(config: &UploaderConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let http = Client::builder()
            .default_headers(config.header_map()?)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint_url()?,
            delete_endpoint: config.delete_url()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post_chunk(
        &self,
        request: ChunkRequest,
        observer: Arc<dyn ChunkObserver>,
    ) -> Result<String, TransportError> {
        let ChunkRequest {
            file_name,
            descriptor,
            payload,
        } = request;

        let total = payload.len() as u64;
        let body = Body::wrap_stream(body_stream(payload, observer));
        let part = Part::stream_with_length(body, total)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let mut form = Form::new().part(FIELD_PAYLOAD, part);
        for (name, value) in descriptor.to_fields().to_pairs() {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(body.trim().to_string())
    }
}

impl ChunkTransport for HttpChunkTransport {
    fn send_chunk(
        &self,
        request: ChunkRequest,
        observer: Arc<dyn ChunkObserver>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, String> {
        Box::pin(async move {
            observer.on_start();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Aborted),
                result = self.post_chunk(request, observer) => result,
            }
        })
    }

    fn delete_file(&self, fid: &str) -> TransportFuture<'_, ()> {
        let fid = fid.to_string();
        Box::pin(async move {
            let Some(url) = &self.delete_endpoint else {
                tracing::debug!(fid = %fid, "no delete endpoint, skipping remote delete");
                return Ok(());
            };

            let response = self
                .http
                .post(url.clone())
                .query(&[("fid", fid.as_str())])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body: body.trim().to_string(),
                });
            }
            Ok(())
        })
    }
}

struct BodyState {
    payload: Bytes,
    pos: usize,
    observer: Arc<dyn ChunkObserver>,
}

/// Streams `payload` in pieces. A piece counts as sent once the consumer
/// polls for the next one, so the final `on_progress(total, total)` fires
/// just before the stream ends.
fn body_stream(
    payload: Bytes,
    observer: Arc<dyn ChunkObserver>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let state = BodyState {
        payload,
        pos: 0,
        observer,
    };
    stream::unfold(state, |mut state| async move {
        let total = state.payload.len();
        if state.pos > 0 || total == 0 {
            state.observer.on_progress(state.pos as u64, total as u64);
        }
        if state.pos >= total {
            return None;
        }
        let end = (state.pos + BODY_PIECE_SIZE).min(total);
        let piece = state.payload.slice(state.pos..end);
        state.pos = end;
        Some((Ok::<_, std::io::Error>(piece), state))
    })
}
