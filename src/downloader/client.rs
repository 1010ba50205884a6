use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{InstallerError, InstallerResult};

use super::scheduler::MAX_CONCURRENT_DOWNLOADS;

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    /// Coordinate this entry was derived from, for failure attribution.
    pub coordinate: Option<String>,
}

/// Drain `items` through `task` with at most `limit` futures in flight.
///
/// No ordering guarantee between tasks; the returned vector holds every
/// task's result and the call only resolves after all of them settle.
pub async fn drain_bounded<T, F, Fut, R>(items: Vec<T>, limit: usize, task: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(task)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

/// Concurrent, SHA-1 validated downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    /// Cooperative cancellation flag shared with the caller.
    cancelled: Arc<AtomicBool>,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: MAX_CONCURRENT_DOWNLOADS,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Handle the caller can flip to stop launching further downloads.
    /// In-flight transfers finish (or fail) on their own; tasks not yet
    /// started are reported as cancelled.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// Creates parent directories as needed. The body is buffered and
    /// verified before anything touches the destination, and a failed
    /// write removes the partial file.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> InstallerResult<()> {
        if self.is_cancelled() {
            return Err(InstallerError::DownloadCancelled {
                url: url.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;

        if let Some(expected) = sha1_expected {
            let mut hasher = Sha1::new();
            hasher.update(&bytes);
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                return Err(InstallerError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        if let Err(source) = self.write_all(dest, &bytes).await {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(InstallerError::Io {
                path: dest.to_path_buf(),
                source,
            });
        }

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    async fn write_all(&self, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
        // Scoped so the handle is dropped immediately after the flush.
        let mut file = tokio::fs::File::create(dest).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Validate an existing file's SHA-1.
    pub async fn validate_sha1(path: &Path, expected: &str) -> InstallerResult<bool> {
        let bytes = tokio::fs::read(path).await.map_err(|e| InstallerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let actual = hex::encode(hasher.finalize());
        Ok(actual == expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn drain_bounded_limits_in_flight_tasks() {
        const LIMIT: usize = 4;
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..32).collect();
        let results = drain_bounded(items, LIMIT, |i| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .await;

        assert_eq!(results.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn drain_bounded_attempts_every_task_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..10).collect();
        let mut results = drain_bounded(items, 3, |i| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                i
            }
        })
        .await;
        results.sort_unstable();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn cancelled_downloader_refuses_new_transfers() {
        let downloader = Downloader::new(reqwest::Client::new());
        downloader.cancel_handle().store(true, Ordering::Relaxed);

        let tmp = tempfile::tempdir().unwrap();
        let err = downloader
            .download_file(
                "http://localhost:9/never-contacted",
                &tmp.path().join("out.jar"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::DownloadCancelled { .. }));
    }
}
