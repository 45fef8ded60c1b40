//! Batch folder allocation and output layout.
//!
//! Each run writes into its own `Batch_<n>` folder under a base directory.
//! The next number is recomputed from the filesystem on every run; nothing
//! else records which batches exist.

use std::path::{Path, PathBuf};

/// Prefix shared by every batch folder name.
pub const BATCH_PREFIX: &str = "Batch_";

const SCORED_IMAGES_DIR: &str = "scored_images";
const CHARTS_DIR: &str = "charts";
const IMAGES_CHART_DIR: &str = "images_chart";
const RESULTS_DIR: &str = "results";

/// Return the path of the next unused batch folder under `base_dir`.
///
/// Creates `base_dir` (and its parents) when it is missing, in which case the
/// answer is always `Batch_1`. The batch folder itself is not created.
///
/// Entries that carry the prefix but no purely numeric suffix are ignored.
pub fn allocate_next_batch(base_dir: &Path) -> std::io::Result<PathBuf> {
    if !base_dir.exists() {
        std::fs::create_dir_all(base_dir)?;
        tracing::debug!("Created batch base directory {:?}", base_dir);
        return Ok(batch_path(base_dir, 1));
    }

    let mut highest: Option<u32> = None;
    for entry in std::fs::read_dir(base_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(number) = name.to_str().and_then(parse_batch_number) else {
            continue;
        };
        highest = Some(highest.map_or(number, |h| h.max(number)));
    }

    let next = highest.map_or(1, |h| h.saturating_add(1));
    Ok(batch_path(base_dir, next))
}

/// Extract the sequence number from a batch folder name.
///
/// Returns `None` for names without the prefix or with a suffix that is not
/// made of ASCII digits only.
pub fn parse_batch_number(name: &str) -> Option<u32> {
    let suffix = name.strip_prefix(BATCH_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

fn batch_path(base_dir: &Path, number: u32) -> PathBuf {
    base_dir.join(format!("{BATCH_PREFIX}{number}"))
}

/// The fixed set of folders inside one batch.
#[derive(Debug, Clone)]
pub struct BatchLayout {
    /// The batch folder itself
    pub root: PathBuf,
    /// Re-encoded copies of each scored image, named by score
    pub scored_images: PathBuf,
    /// Batch-wide summary chart
    pub charts: PathBuf,
    /// One chart per image
    pub images_chart: PathBuf,
    /// CSV and JSON results
    pub results: PathBuf,
}

impl BatchLayout {
    /// Describe the layout under `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            scored_images: root.join(SCORED_IMAGES_DIR),
            charts: root.join(CHARTS_DIR),
            images_chart: root.join(IMAGES_CHART_DIR),
            results: root.join(RESULTS_DIR),
            root,
        }
    }

    /// Create the batch folder and all of its subfolders.
    pub fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let layout = Self::new(root);
        for dir in [
            &layout.scored_images,
            &layout.charts,
            &layout.images_chart,
            &layout.results,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(layout)
    }

    /// Batch folder name (e.g. `Batch_3`).
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_after_gaps_is_max_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        for n in [1, 3, 7] {
            std::fs::create_dir(dir.path().join(format!("Batch_{n}"))).unwrap();
        }

        let next = allocate_next_batch(dir.path()).unwrap();
        assert_eq!(next, dir.path().join("Batch_8"));
    }

    #[test]
    fn missing_base_is_created_and_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("Batches");

        let next = allocate_next_batch(&base).unwrap();
        assert_eq!(next, base.join("Batch_1"));
        assert!(base.is_dir());
        assert!(!next.exists(), "batch folder itself is left to the caller");
    }

    #[test]
    fn non_numeric_suffixes_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Batch_2", "Batch_abc", "Batch_", "Batch_4x", "Other_9"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let next = allocate_next_batch(dir.path()).unwrap();
        assert_eq!(next, dir.path().join("Batch_3"));
    }

    #[test]
    fn empty_base_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let next = allocate_next_batch(dir.path()).unwrap();
        assert_eq!(next, dir.path().join("Batch_1"));
    }

    #[test]
    fn files_with_prefix_still_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Batch_5"), b"").unwrap();
        let next = allocate_next_batch(dir.path()).unwrap();
        assert_eq!(next, dir.path().join("Batch_6"));
    }

    #[test]
    fn parse_batch_number_cases() {
        assert_eq!(parse_batch_number("Batch_12"), Some(12));
        assert_eq!(parse_batch_number("Batch_007"), Some(7));
        assert_eq!(parse_batch_number("Batch_-1"), None);
        assert_eq!(parse_batch_number("Batch_+1"), None);
        assert_eq!(parse_batch_number("Batch_99999999999"), None);
        assert_eq!(parse_batch_number("batch_1"), None);
    }

    #[test]
    fn layout_create_makes_all_folders() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BatchLayout::create(dir.path().join("Batch_1")).unwrap();

        assert!(layout.scored_images.is_dir());
        assert!(layout.charts.is_dir());
        assert!(layout.images_chart.is_dir());
        assert!(layout.results.is_dir());
        assert_eq!(layout.name(), "Batch_1");
    }
}
