//! Local cache of downloadable model artifacts.
//!
//! Every artifact lives in one flat directory as `<sanitized name>.<ext>`.
//! A file at that path counts as downloaded. The only integrity check is a
//! byte-size comparison: against the registry's pinned size when it has one,
//! otherwise against the length recorded in `<file>.size` when the download
//! completed. A file with neither fails verification.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipscore_core::artifact::{ArtifactCache, ModelRegistry};
//!
//! let cache = ArtifactCache::with_http(config.model_dir(), ModelRegistry::builtin());
//! let files = cache.ensure_model("ViT-B/32").await?;
//! if !cache.verify("ViT-B/32")? {
//!     // size mismatch was logged; the operator decides whether to re-fetch
//! }
//! ```

pub mod fetch;
pub mod registry;

pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use registry::{
    sanitize_name, select_model_for_memory, ArtifactKind, ArtifactSpec, ModelRegistry,
    CLIP_TOKENIZER, DEFAULT_MODEL,
};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{ArtifactError, ConfigError};

/// On-disk state of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// No file at the cache path
    Missing,
    /// File present and its size matches the pinned or recorded size
    Verified { size: u64 },
    /// File present but nothing to compare it with: not fetched by this
    /// cache, or the download never finished
    Unrecorded { size: u64 },
    /// File present with the wrong size
    SizeMismatch { expected: u64, actual: u64 },
}

impl ArtifactStatus {
    /// Whether `verify` accepts this state.
    pub fn is_ok(&self) -> bool {
        matches!(self, ArtifactStatus::Verified { .. })
    }
}

/// Paths needed to load one model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub name: String,
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub image_size: u32,
}

/// Result of one download in a sequential run over several names.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub name: String,
    pub result: Result<PathBuf, ArtifactError>,
}

/// Download-once cache for registry artifacts.
pub struct ArtifactCache {
    dir: PathBuf,
    registry: ModelRegistry,
    fetcher: Box<dyn ArtifactFetcher>,
}

impl ArtifactCache {
    /// Create a cache over `dir` using `fetcher` for missing artifacts.
    pub fn new(
        dir: impl Into<PathBuf>,
        registry: ModelRegistry,
        fetcher: Box<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            dir: dir.into(),
            registry,
            fetcher,
        }
    }

    /// Create a cache that downloads over HTTP.
    pub fn with_http(dir: impl Into<PathBuf>, registry: ModelRegistry) -> Self {
        Self::new(dir, registry, Box::new(HttpFetcher::default()))
    }

    /// Build the cache described by `config`: built-in registry, HTTP
    /// fetcher, configured directory.
    pub fn from_config(config: &Config) -> Self {
        let registry = ModelRegistry::builtin();
        let fetcher = HttpFetcher::new(reqwest::Client::new(), config.download.progress_interval_mb);
        Self::new(config.model_dir(), registry, Box::new(fetcher))
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The registry this cache serves.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Cache path for `name`. Fails for names outside the registry.
    pub fn local_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let spec = self.registry.get(name)?;
        Ok(self.dir.join(spec.file_name()))
    }

    /// Where the byte count of a finished download is kept.
    fn size_record_path(&self, spec: &ArtifactSpec) -> PathBuf {
        self.dir.join(format!("{}.size", spec.file_name()))
    }

    fn recorded_size(&self, spec: &ArtifactSpec) -> Option<u64> {
        std::fs::read_to_string(self.size_record_path(spec))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Make sure the artifact for `name` is on disk, downloading it if absent.
    ///
    /// An existing file is trusted as-is: no size check, no re-download.
    pub async fn ensure_downloaded(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let spec = self.registry.get(name)?;
        let dest = self.dir.join(spec.file_name());

        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Write {
            path: self.dir.clone(),
            source,
        })?;

        if dest.exists() {
            tracing::info!("{} already exists at {:?}", spec.name, dest);
            return Ok(dest);
        }

        tracing::info!("Downloading {}...", spec.name);
        tracing::info!("  Source: {}", spec.url);
        tracing::info!("  Destination: {:?}", dest);

        let record = self.size_record_path(spec);
        let _ = std::fs::remove_file(&record);

        match self.fetcher.fetch(spec, &dest).await {
            Ok(bytes) => {
                tracing::info!(
                    "  {} complete ({:.1} MB)",
                    spec.name,
                    bytes as f64 / (1024.0 * 1024.0)
                );
                std::fs::write(&record, bytes.to_string()).map_err(|source| {
                    ArtifactError::Write {
                        path: record.clone(),
                        source,
                    }
                })?;
                Ok(dest)
            }
            Err(e) => {
                // A caught failure must not look like a finished download next run.
                if dest.exists() {
                    let _ = std::fs::remove_file(&dest);
                }
                Err(e)
            }
        }
    }

    /// Ensure a model and the tokenizer it references.
    pub async fn ensure_model(&self, name: &str) -> Result<ModelFiles, ArtifactError> {
        let spec = self.registry.get(name)?;
        let ArtifactKind::Model {
            tokenizer,
            image_size,
        } = &spec.kind
        else {
            return Err(ConfigError::ValidationError(format!(
                "'{name}' is a tokenizer, not a model"
            ))
            .into());
        };

        let model = self.ensure_downloaded(name).await?;
        let tokenizer = self.ensure_downloaded(tokenizer).await?;

        Ok(ModelFiles {
            name: spec.name.clone(),
            model,
            tokenizer,
            image_size: *image_size,
        })
    }

    /// Download several artifacts one after another.
    ///
    /// A failure is logged for that name only; the remaining names are
    /// still attempted.
    pub async fn ensure_all(&self, names: &[String]) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let result = self.ensure_downloaded(name).await;
            if let Err(ref e) = result {
                tracing::error!("Failed to download {name}: {e}");
            }
            outcomes.push(DownloadOutcome {
                name: name.clone(),
                result,
            });
        }
        outcomes
    }

    /// Report the on-disk state of `name` without downloading anything.
    pub fn inspect(&self, name: &str) -> Result<ArtifactStatus, ConfigError> {
        let spec = self.registry.get(name)?;
        let path = self.dir.join(spec.file_name());

        let Ok(metadata) = std::fs::metadata(&path) else {
            return Ok(ArtifactStatus::Missing);
        };
        let actual = metadata.len();

        let expected = spec.expected_size.or_else(|| self.recorded_size(spec));
        Ok(match expected {
            Some(expected) if expected == actual => ArtifactStatus::Verified { size: actual },
            Some(expected) => ArtifactStatus::SizeMismatch { expected, actual },
            None => ArtifactStatus::Unrecorded { size: actual },
        })
    }

    /// Check the cached file for `name` against its expected size.
    ///
    /// Returns `false` when the file is missing, has the wrong size, or has
    /// no size to compare with; a mismatch is logged with both sizes.
    pub fn verify(&self, name: &str) -> Result<bool, ConfigError> {
        let status = self.inspect(name)?;
        match status {
            ArtifactStatus::Missing => tracing::warn!("{name} is missing"),
            ArtifactStatus::Verified { size } => {
                tracing::info!("{name} verified successfully ({size} bytes)")
            }
            ArtifactStatus::Unrecorded { size } => tracing::warn!(
                "{name} present ({size} bytes) but no download was recorded for it. \
                 Delete the file and download again."
            ),
            ArtifactStatus::SizeMismatch { expected, actual } => tracing::warn!(
                "{name} size mismatch. Expected {expected}, got {actual}. \
                 Delete the file and download again."
            ),
        }
        Ok(status.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes `size` bytes and counts calls.
    struct FakeFetcher {
        size: usize,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ArtifactFetcher for FakeFetcher {
        async fn fetch(&self, spec: &ArtifactSpec, dest: &Path) -> Result<u64, ArtifactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                std::fs::write(dest, b"partial").unwrap();
                return Err(ArtifactError::Download {
                    name: spec.name.clone(),
                    url: spec.url.clone(),
                    message: "connection reset".to_string(),
                });
            }
            std::fs::write(dest, vec![0u8; self.size]).unwrap();
            Ok(self.size as u64)
        }
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new([
            ArtifactSpec::model("X", "http://example.invalid/x", "tok", 224)
                .with_expected_size(100),
            ArtifactSpec::model("Y/2", "http://example.invalid/y", "tok", 336),
            ArtifactSpec::tokenizer("tok", "http://example.invalid/tok"),
        ])
    }

    fn cache(dir: &Path, size: usize, fail: bool) -> (ArtifactCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = FakeFetcher {
            size,
            calls: Arc::clone(&calls),
            fail,
        };
        (
            ArtifactCache::new(dir.join("models"), registry(), Box::new(fetcher)),
            calls,
        )
    }

    #[tokio::test]
    async fn second_ensure_does_not_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 100, false);

        let first = cache.ensure_downloaded("X").await.unwrap();
        let second = cache.ensure_downloaded("X").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("models").join("X.onnx"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_name_fails_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 100, false);

        let err = cache.ensure_downloaded("RN50").await.unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Config(ConfigError::UnknownModel { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            cache.verify("RN50"),
            Err(ConfigError::UnknownModel { .. })
        ));
    }

    #[tokio::test]
    async fn slash_in_name_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 10, false);

        let path = cache.ensure_downloaded("Y/2").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "Y_2.onnx");
        assert!(path.is_file());
    }

    #[test]
    fn verify_matching_size_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 0, false);
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.local_path("X").unwrap(), vec![1u8; 100]).unwrap();

        assert!(cache.verify("X").unwrap());
        assert_eq!(
            cache.inspect("X").unwrap(),
            ArtifactStatus::Verified { size: 100 }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn verify_size_mismatch_reports_both_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 0, false);
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.local_path("X").unwrap(), vec![1u8; 60]).unwrap();

        assert!(!cache.verify("X").unwrap());
        assert_eq!(
            cache.inspect("X").unwrap(),
            ArtifactStatus::SizeMismatch {
                expected: 100,
                actual: 60
            }
        );
    }

    #[test]
    fn verify_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 0, false);
        assert!(!cache.verify("X").unwrap());
        assert_eq!(cache.inspect("X").unwrap(), ArtifactStatus::Missing);
    }

    #[tokio::test]
    async fn download_records_size_for_unpinned_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 5, false);
        let path = cache.ensure_downloaded("tok").await.unwrap();

        assert!(cache.verify("tok").unwrap());
        assert_eq!(
            cache.inspect("tok").unwrap(),
            ArtifactStatus::Verified { size: 5 }
        );

        std::fs::write(&path, b"abc").unwrap();
        assert!(!cache.verify("tok").unwrap());
        assert_eq!(
            cache.inspect("tok").unwrap(),
            ArtifactStatus::SizeMismatch {
                expected: 5,
                actual: 3
            }
        );
    }

    #[test]
    fn unpinned_file_without_record_fails_verify() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 0, false);
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.local_path("tok").unwrap(), b"abc").unwrap();

        assert!(!cache.verify("tok").unwrap());
        assert_eq!(
            cache.inspect("tok").unwrap(),
            ArtifactStatus::Unrecorded { size: 3 }
        );
    }

    #[test]
    fn truncated_builtin_model_fails_verify() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::with_http(dir.path(), ModelRegistry::builtin());
        std::fs::write(cache.local_path("ViT-B/32").unwrap(), b"abc").unwrap();

        assert!(!cache.verify("ViT-B/32").unwrap());
        assert!(!cache.inspect("ViT-B/32").unwrap().is_ok());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_size_record() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 5, true);
        assert!(cache.ensure_downloaded("tok").await.is_err());

        std::fs::write(cache.local_path("tok").unwrap(), b"partial").unwrap();
        assert_eq!(
            cache.inspect("tok").unwrap(),
            ArtifactStatus::Unrecorded { size: 7 }
        );
    }

    #[tokio::test]
    async fn truncated_existing_file_is_trusted_by_ensure() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 100, false);
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.local_path("X").unwrap(), vec![1u8; 3]).unwrap();

        cache.ensure_downloaded("X").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!cache.verify("X").unwrap());
    }

    #[tokio::test]
    async fn failed_fetch_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path(), 100, true);

        let err = cache.ensure_downloaded("X").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(!cache.local_path("X").unwrap().exists());
    }

    #[tokio::test]
    async fn ensure_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 100, false);

        let names = vec!["X".to_string(), "RN50".to_string(), "tok".to_string()];
        let outcomes = cache.ensure_all(&names).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ensure_model_fetches_model_and_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache(dir.path(), 100, false);

        let files = cache.ensure_model("Y/2").await.unwrap();
        assert_eq!(files.image_size, 336);
        assert!(files.model.ends_with("Y_2.onnx"));
        assert!(files.tokenizer.ends_with("tok.json"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let err = cache.ensure_model("tok").await.unwrap_err();
        assert!(err.to_string().contains("not a model"));
    }
}
