//! Listener setup and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::ServerError;
use crate::routes::{AppState, router};

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8082";

/// Default storage directory.
pub const DEFAULT_STORAGE_DIR: &str = "./uploads";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Directory received files are stored in, one file per fid.
    pub storage_dir: PathBuf,
}

impl ServerConfig {
    /// Reads `CHUNKLINE_ADDR` and `CHUNKLINE_STORAGE`.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let raw_addr = get("CHUNKLINE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = raw_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddr(raw_addr.clone()))?;
        let storage_dir = get("CHUNKLINE_STORAGE")
            .unwrap_or_else(|| DEFAULT_STORAGE_DIR.into())
            .into();
        Ok(Self { addr, storage_dir })
    }
}

/// Serves the upload routes on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let local_addr = listener.local_addr()?;
    tracing::info!(
        "dev server listening on {local_addr}, storing files in {}",
        state.storage_dir().display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("dev server stopped");
    Ok(())
}
