//! Queues the files and waits for them, aborting everything on Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;

use chunkline_uploader::{FileStatus, UploadHooks, UploadQueue, UploadRequest, UploaderConfig};

/// Terminal statuses counted over a run.
#[derive(Debug, Default)]
pub struct Summary {
    pub completed: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.aborted == 0
    }
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
    aborted: AtomicUsize,
}

fn hooks(counters: Arc<Counters>) -> UploadHooks {
    UploadHooks::new()
        .on_status(move |file, status, diagnostic| match status {
            FileStatus::Start => tracing::info!(file, "upload started"),
            FileStatus::End => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(file, "upload complete");
            }
            FileStatus::Error => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(file, reason = diagnostic.unwrap_or("unknown"), "upload failed");
            }
            FileStatus::Abort => {
                counters.aborted.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(file, "upload aborted");
            }
        })
        .on_progress(|file, percent| tracing::debug!(file, percent, "progress"))
        .on_deleting(|fid| tracing::info!(fid, "deleting aborted upload"))
}

/// Uploads `files` in order and returns the per-status counts.
pub async fn run(config: UploaderConfig, files: Vec<PathBuf>) -> anyhow::Result<Summary> {
    let requests = files
        .iter()
        .map(|path| {
            UploadRequest::from_path(path)
                .with_context(|| format!("cannot open {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let counters = Arc::new(Counters::default());
    let queue = UploadQueue::new(config, hooks(Arc::clone(&counters)))?;

    let names: Vec<String> = requests.iter().map(|r| r.name().to_string()).collect();
    for request in requests {
        queue.send(request);
    }

    tokio::select! {
        _ = queue.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, aborting uploads");
            for name in &names {
                queue.abort(name);
            }
            queue.wait_idle().await;
        }
    }

    Ok(Summary {
        completed: counters.completed.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
        aborted: counters.aborted.load(Ordering::Relaxed),
    })
}
