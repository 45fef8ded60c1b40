//! Configuration management for clipscore.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section is optional in the file.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for clipscore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Input directories
    pub input: InputConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Model selection
    pub model: ModelConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Chart settings
    pub charts: ChartsConfig,

    /// Download settings
    pub download: DownloadConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.clipscore.clipscore/config.toml
    /// - Linux: ~/.config/clipscore/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\clipscore\config\config.toml
    ///
    /// Falls back to ~/.clipscore/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "clipscore", "clipscore")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".clipscore").join("config.toml")
            })
    }

    /// Get the resolved model cache directory (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        expand(&self.general.model_dir)
    }

    /// Get the resolved target image directory (with ~ expansion).
    pub fn target_dir(&self) -> PathBuf {
        expand(&self.input.target_dir)
    }

    /// Get the resolved prompt directory (with ~ expansion).
    pub fn prompt_dir(&self) -> PathBuf {
        expand(&self.input.prompt_dir)
    }

    /// Get the resolved batch base directory (with ~ expansion).
    pub fn output_base_dir(&self) -> PathBuf {
        expand(&self.output.base_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "ViT-B/32");
        assert_eq!(config.output.base_dir, PathBuf::from("Batches"));
        assert_eq!(config.input.prompt_dir, PathBuf::from("prompts"));
        assert_eq!(config.limits.max_file_size_mb, 100);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[charts]"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r##"
            [model]
            name = "ViT-B/16"

            [charts]
            summary_color = "#ff0000"
            "##,
        )
        .unwrap();

        assert_eq!(config.model.name, "ViT-B/16");
        assert_eq!(config.charts.summary_color, "#ff0000");
        assert_eq!(config.charts.single_color, "#1f77b4");
        assert_eq!(config.input.target_dir, PathBuf::from("target_images"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::from_toml("[model\nname = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_tilde_expansion() {
        let mut config = Config::default();
        config.general.model_dir = PathBuf::from("/abs/models");
        assert_eq!(config.model_dir(), PathBuf::from("/abs/models"));

        config.general.model_dir = PathBuf::from("~/models");
        assert!(!config.model_dir().to_string_lossy().starts_with('~'));
    }
}
