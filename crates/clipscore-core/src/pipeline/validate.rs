//! Cheap checks run before an image is decoded.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Bytes needed to recognize every supported signature.
const HEADER_LEN: usize = 12;

/// Rejects files that are too large or do not look like images.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check existence, size limit and magic bytes.
    ///
    /// Returns the container format named by the file's signature.
    pub fn validate(&self, path: &Path) -> Result<&'static str, PipelineError> {
        let metadata = std::fs::metadata(path)
            .map_err(|_| PipelineError::FileNotFound(path.to_path_buf()))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let header = read_header(path)?;
        sniff_format(&header).ok_or_else(|| PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: "unrecognized signature".to_string(),
        })
    }
}

fn read_header(path: &Path) -> Result<Vec<u8>, PipelineError> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: format!("Cannot open file: {e}"),
    })?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read header: {e}"),
        })?;

    if header.len() < 4 {
        return Err(PipelineError::Decode {
            path: path.to_path_buf(),
            message: "File too small to be a valid image".to_string(),
        });
    }
    Ok(header)
}

/// Name the image container from its leading bytes.
fn sniff_format(header: &[u8]) -> Option<&'static str> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        [b'B', b'M', ..] => Some("bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("tiff"),
        _ => None,
    }
}
