//! Fetching artifact bytes from their source.

use std::path::Path;

use async_trait::async_trait;

use super::registry::ArtifactSpec;
use crate::error::ArtifactError;

/// Source of artifact bytes.
///
/// Uses `async_trait` so the cache can hold a `Box<dyn ArtifactFetcher>`.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Write the artifact to `dest`, returning the number of bytes written.
    async fn fetch(&self, spec: &ArtifactSpec, dest: &Path) -> Result<u64, ArtifactError>;
}

/// Streams artifacts over HTTP(S) straight to disk.
pub struct HttpFetcher {
    client: reqwest::Client,
    progress_interval_bytes: u64,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, progress_interval_mb: u64) -> Self {
        Self {
            client,
            progress_interval_bytes: progress_interval_mb.max(1) * 1024 * 1024,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), 50)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    /// Stream the response body to `dest` chunk by chunk.
    ///
    /// The file is written in place, not renamed from a temporary, so an
    /// interrupted process leaves a truncated file behind.
    async fn fetch(&self, spec: &ArtifactSpec, dest: &Path) -> Result<u64, ArtifactError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let download_err = |message: String| ArtifactError::Download {
            name: spec.name.clone(),
            url: spec.url.clone(),
            message,
        };
        let write_err = |source: std::io::Error| ArtifactError::Write {
            path: dest.to_path_buf(),
            source,
        };

        let response = self
            .client
            .get(&spec.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_err(e.to_string()))?;

        let total_size = response.content_length();
        if let Some(size) = total_size {
            tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_err(e.to_string()))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total_size {
                if downloaded % self.progress_interval_bytes < chunk.len() as u64 {
                    tracing::info!(
                        "  Progress: {:.0}%",
                        downloaded as f64 / total as f64 * 100.0
                    );
                }
            }
        }

        file.flush().await.map_err(write_err)?;

        if let Some(total) = total_size {
            if downloaded != total {
                return Err(download_err(format!(
                    "connection closed after {downloaded} of {total} bytes"
                )));
            }
        }
        Ok(downloaded)
    }
}
