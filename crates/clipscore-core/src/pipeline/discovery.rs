//! Finding the images of one batch in the target directory.

use std::path::{Path, PathBuf};

use crate::config::ProcessingConfig;
use crate::error::NotFoundError;

/// Discovers image files directly inside a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl DiscoveredFile {
    /// The file name portion, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// List supported image files in `dir`, sorted by name.
    ///
    /// Subdirectories are not descended into. Unreadable entries are skipped.
    pub fn discover(&self, dir: &Path) -> Result<Vec<DiscoveredFile>, NotFoundError> {
        let entries =
            std::fs::read_dir(dir).map_err(|_| NotFoundError::Directory(dir.to_path_buf()))?;

        let mut files: Vec<DiscoveredFile> = entries
            .filter_map(|e| e.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let meta = std::fs::metadata(&path).ok()?;
                (meta.is_file() && self.is_supported(&path)).then(|| DiscoveredFile {
                    path,
                    size: meta.len(),
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!("Discovered {} images in {:?}", files.len(), dir);
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
