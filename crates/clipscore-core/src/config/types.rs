//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Flat directory where model artifacts are cached
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.clipscore/models"),
        }
    }
}

/// Input locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Folder of images to score
    pub target_dir: PathBuf,

    /// Folder holding one or more prompt `.txt` files
    pub prompt_dir: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("target_images"),
            prompt_dir: PathBuf::from("prompts"),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory holding the numbered batch folders
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("Batches"),
        }
    }
}

/// Model selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Registry name of the model to score with
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "ViT-B/32".to_string(),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Chart rendering settings. Raw values; resolved into
/// [`ChartOptions`](crate::chart::ChartOptions) with defaulting on bad input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Render charts at all
    pub enabled: bool,

    /// Summary chart kind (menu number or name)
    pub summary_kind: String,

    /// Summary chart color (`#rrggbb`)
    pub summary_color: String,

    /// Per-image chart kind (menu number or name)
    pub single_kind: String,

    /// Per-image chart color (`#rrggbb`)
    pub single_color: String,

    /// Figure width in inches (100 px each)
    pub figure_width: u32,

    /// Figure height in inches (100 px each)
    pub figure_height: u32,

    /// Summary chart x-axis label
    pub x_label: String,

    /// Summary chart y-axis label
    pub y_label: String,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            summary_kind: "line".to_string(),
            summary_color: "#1f77b4".to_string(),
            single_kind: "line".to_string(),
            single_color: "#1f77b4".to_string(),
            figure_width: 12,
            figure_height: 6,
            x_label: "Images".to_string(),
            y_label: "CLIP Scores".to_string(),
        }
    }
}

/// Download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Log progress every this many megabytes
    pub progress_interval_mb: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            progress_interval_mb: 50,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
