//! Upload and delete handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use bytes::Bytes;
use serde::Deserialize;

use chunkline_protocol::constants::{FIELD_FID, FIELD_PAYLOAD};
use chunkline_protocol::{ChunkFields, ProtocolError};
use chunkline_transfer::ChunkWriter;

use crate::{MAX_BODY_SIZE, ServerError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    writer: Arc<Mutex<ChunkWriter>>,
    storage_dir: PathBuf,
}

impl AppState {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        Self {
            writer: Arc::new(Mutex::new(ChunkWriter::new(&storage_dir))),
            storage_dir,
        }
    }

    pub fn storage_dir(&self) -> &std::path::Path {
        &self.storage_dir
    }

    /// Runs `f` against the writer on the blocking pool.
    async fn with_writer<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ChunkWriter) -> Result<T, chunkline_transfer::TransferError>
            + Send
            + 'static,
    {
        let writer = Arc::clone(&self.writer);
        let result = tokio::task::spawn_blocking(move || {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut writer)
        })
        .await??;
        Ok(result)
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_chunk))
        .route("/delete", post(delete_file))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ServerError> {
    let mut payload: Option<Bytes> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FIELD_PAYLOAD {
            payload = Some(field.bytes().await?);
        } else {
            let value = field.text().await?;
            fields.insert(name, value);
        }
    }

    let payload = payload.ok_or(ProtocolError::MissingField(FIELD_PAYLOAD))?;
    let chunk = ChunkFields::from_lookup(|key| fields.get(key).map(String::as_str))?;

    let fid = if chunk.sequence == 0 {
        uuid::Uuid::new_v4().to_string()
    } else if chunk.fid.is_empty() {
        return Err(ProtocolError::MissingField(FIELD_FID).into());
    } else {
        chunk.fid.clone()
    };

    let len = payload.len();
    let target = fid.clone();
    let offset = chunk.offset;
    let end = state
        .with_writer(move |writer| writer.write_chunk(&target, offset, &payload))
        .await?;

    tracing::debug!(
        fid = %fid,
        seq = chunk.sequence,
        offset,
        len,
        last = chunk.is_last_chunk,
        "chunk stored"
    );
    if chunk.is_last_chunk {
        tracing::info!(fid = %fid, size = end, "file received");
    }

    Ok(fid)
}

#[derive(Debug, Deserialize)]
struct DeleteQuery {
    fid: String,
}

async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ServerError> {
    let fid = query.fid;
    let target = fid.clone();
    let removed = state.with_writer(move |writer| writer.remove(&target)).await?;

    if removed {
        tracing::info!(fid = %fid, "file deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        tracing::debug!(fid = %fid, "delete of unknown file");
        Ok(StatusCode::NOT_FOUND)
    }
}
