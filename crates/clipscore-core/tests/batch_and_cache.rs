//! End-to-end checks of batch allocation and the artifact cache through the
//! public API.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use clipscore_core::artifact::{ArtifactCache, ArtifactFetcher, ArtifactSpec, ModelRegistry};
use clipscore_core::batch::{allocate_next_batch, BatchLayout};
use clipscore_core::error::ArtifactError;

struct CountingFetcher {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ArtifactFetcher for CountingFetcher {
    async fn fetch(&self, _spec: &ArtifactSpec, dest: &Path) -> Result<u64, ArtifactError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, [0u8; 100]).map_err(|source| ArtifactError::Write {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(100)
    }
}

fn cache_with(dir: &Path, registry: ModelRegistry) -> (ArtifactCache, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let fetcher = CountingFetcher {
        calls: Arc::clone(&calls),
    };
    (ArtifactCache::new(dir, registry, Box::new(fetcher)), calls)
}

#[test]
fn successive_runs_get_successive_batches() {
    let base = tempfile::tempdir().unwrap();

    let first = allocate_next_batch(base.path()).unwrap();
    assert_eq!(first, base.path().join("Batch_1"));
    let layout = BatchLayout::create(&first).unwrap();
    assert_eq!(layout.name(), "Batch_1");
    for dir in [
        &layout.scored_images,
        &layout.charts,
        &layout.images_chart,
        &layout.results,
    ] {
        assert!(dir.is_dir());
    }

    let second = allocate_next_batch(base.path()).unwrap();
    assert_eq!(second, base.path().join("Batch_2"));
}

#[test]
fn missing_base_is_created_with_batch_one() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("out").join("Batches");

    let next = allocate_next_batch(&base).unwrap();
    assert!(base.is_dir());
    assert_eq!(next, base.join("Batch_1"));
    assert!(!next.exists());
}

#[tokio::test]
async fn preexisting_file_of_expected_size_verifies_without_download() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new([ArtifactSpec::tokenizer("X", "https://example.invalid/x")
        .with_expected_size(100)]);
    std::fs::write(dir.path().join("X.json"), [7u8; 100]).unwrap();

    let (cache, calls) = cache_with(dir.path(), registry);

    assert!(cache.verify("X").unwrap());
    let path = cache.ensure_downloaded("X").await.unwrap();
    assert_eq!(path, dir.path().join("X.json"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn download_once_then_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new([ArtifactSpec::model(
        "Test/1",
        "https://example.invalid/model.onnx",
        "tok",
        224,
    )
    .with_expected_size(100)]);
    let (cache, calls) = cache_with(&dir.path().join("models"), registry);

    let first = cache.ensure_downloaded("Test/1").await.unwrap();
    let second = cache.ensure_downloaded("Test/1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.file_name().unwrap(), "Test_1.onnx");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.verify("Test/1").unwrap());
}

#[tokio::test]
async fn unknown_name_never_touches_network() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, calls) = cache_with(dir.path(), ModelRegistry::builtin());

    let err = cache.ensure_downloaded("RN50x64").await.unwrap_err();
    assert!(err.to_string().contains("Unknown model 'RN50x64'"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
