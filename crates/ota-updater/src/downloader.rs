use crate::error::DownloadError;
use async_trait::async_trait;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A fully written bundle sitting in the staging area, not yet active.
#[derive(Debug)]
pub struct StagedBundle {
    /// Location of the staged file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub len: u64,
}

/// Abstraction over materializing a bundle into the staging area.
#[async_trait]
pub trait BundleDownloader: Send + Sync {
    /// Download `url` into a fresh file under `staging_dir`.
    ///
    /// On any failure the partial file must be removed; the caller's active
    /// bundle is never touched by a downloader.
    async fn download(
        &self,
        url: &str,
        timeout: Duration,
        staging_dir: &Path,
    ) -> Result<StagedBundle, DownloadError>;
}

/// HTTP bundle downloader that streams the body to disk chunk by chunk.
#[derive(Clone, Default)]
pub struct HttpBundleDownloader {
    client: Client,
}

impl HttpBundleDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-provided client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BundleDownloader for HttpBundleDownloader {
    async fn download(
        &self,
        url: &str,
        timeout: Duration,
        staging_dir: &Path,
    ) -> Result<StagedBundle, DownloadError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_request_error)?
            .error_for_status()
            .map_err(map_request_error)?;

        let declared = response.content_length();

        // The temp file guarantees a partial body is removed on every early
        // return below; it is only kept once the write is complete.
        let mut staged = tempfile::Builder::new()
            .prefix("bundle-")
            .tempfile_in(staging_dir)?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(map_request_error)? {
            staged.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        staged.flush()?;
        staged.as_file().sync_all()?;

        if let Some(expected) = declared {
            if expected != written {
                return Err(DownloadError::IncompleteWrite {
                    expected,
                    actual: written,
                });
            }
        }

        let (_, path) = staged
            .keep()
            .map_err(|err| DownloadError::Storage(err.error))?;
        tracing::debug!(url, bytes = written, path = %path.display(), "bundle staged");
        Ok(StagedBundle { path, len: written })
    }
}

fn map_request_error(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        DownloadError::Timeout
    } else {
        DownloadError::Network(err)
    }
}
