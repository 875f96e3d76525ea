use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    api::ApiClient,
    domain::{AppError, TransferStatus},
    utils::file_name_from_url,
};

/// A single background transfer the library model can drive and poll.
pub trait Transfer {
    fn start(&mut self);
    /// Fraction done, 0.0..=1.0
    fn progress(&self) -> f64;
    fn status(&self) -> TransferStatus;
}

/// Counters shared between the handle and its transfer task.
#[derive(Default)]
struct TransferState {
    downloaded: AtomicU64,
    total: AtomicU64,
    status: AtomicU8,
}

impl TransferState {
    fn status(&self) -> TransferStatus {
        decode_status(self.status.load(Ordering::Acquire))
    }

    /// Move out of a non-terminal status. Terminal statuses are never overwritten.
    fn finish(&self, status: TransferStatus) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if decode_status(current).is_terminal() {
                return false;
            }
            match self.status.compare_exchange(
                current,
                encode_status(status),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

fn encode_status(status: TransferStatus) -> u8 {
    match status {
        TransferStatus::Pending => 0,
        TransferStatus::Running => 1,
        TransferStatus::Completed => 2,
        TransferStatus::Failed => 3,
        TransferStatus::Cancelled => 4,
    }
}

fn decode_status(raw: u8) -> TransferStatus {
    match raw {
        0 => TransferStatus::Pending,
        1 => TransferStatus::Running,
        2 => TransferStatus::Completed,
        3 => TransferStatus::Failed,
        _ => TransferStatus::Cancelled,
    }
}

/// Downloads one URL into a destination directory on a tokio runtime.
///
/// Dropping the handle aborts a transfer that is still running.
pub struct Downloader {
    url: String,
    destination: PathBuf,
    client: ApiClient,
    runtime: Handle,
    state: Arc<TransferState>,
    task: Option<JoinHandle<()>>,
}

impl Downloader {
    pub fn new(url: impl Into<String>, dest_dir: &Path, client: ApiClient, runtime: Handle) -> Self {
        let url = url.into();
        let destination = dest_dir.join(file_name_from_url(&url));

        Self {
            url,
            destination,
            client,
            runtime,
            state: Arc::new(TransferState::default()),
            task: None,
        }
    }

    /// File the download is written to
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.state.finish(TransferStatus::Cancelled) {
            info!(url = %self.url, "Download cancelled");
        }
    }
}

impl Transfer for Downloader {
    fn start(&mut self) {
        if self.state.status() != TransferStatus::Pending {
            return;
        }
        self.state
            .status
            .store(encode_status(TransferStatus::Running), Ordering::Release);

        let client = self.client.clone();
        let url = self.url.clone();
        let destination = self.destination.clone();
        let state = self.state.clone();

        self.task = Some(self.runtime.spawn(async move {
            match transfer(&client, &url, &destination, &state).await {
                Ok(bytes) => {
                    if state.finish(TransferStatus::Completed) {
                        debug!(url = %url, bytes, path = %destination.display(), "Download finished");
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Download failed");
                    state.finish(TransferStatus::Failed);
                }
            }
        }));
    }

    fn progress(&self) -> f64 {
        if self.state.status() == TransferStatus::Completed {
            return 1.0;
        }

        let total = self.state.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let downloaded = self.state.downloaded.load(Ordering::Relaxed);
        (downloaded as f64 / total as f64).min(1.0)
    }

    fn status(&self) -> TransferStatus {
        self.state.status()
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Temporary file a download streams into before it replaces `destination`.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn transfer(
    client: &ApiClient,
    url: &str,
    destination: &Path,
    state: &TransferState,
) -> Result<u64, AppError> {
    let (total_size, stream) = client
        .download_file_stream(url)
        .await
        .map_err(|e| AppError::Download(e.to_string()))?;
    state.total.store(total_size.unwrap_or(0), Ordering::Relaxed);

    if let Some(dir) = destination.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
    }

    // an existing archive is only replaced once the new one is complete
    let partial = partial_path(destination);
    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(|e| AppError::Io(format!("Failed to create file: {}", e)))?;

    info!(url, total = ?total_size, "Download started");

    let mut stream = stream.boxed();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::Download(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Io(format!("Write error: {}", e)))?;

        downloaded += chunk.len() as u64;
        state.downloaded.store(downloaded, Ordering::Relaxed);
    }

    file.sync_all()
        .await
        .map_err(|e| AppError::Io(format!("Failed to sync file: {}", e)))?;
    drop(file);

    tokio::fs::rename(&partial, destination)
        .await
        .map_err(|e| AppError::Io(format!("Failed to move download into place: {}", e)))?;

    Ok(downloaded)
}
