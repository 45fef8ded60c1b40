//! Error types for the clipscore batch scoring pipeline.
//!
//! Errors are split by how the run should react to them: configuration and
//! not-found errors abort the run, artifact errors are reported per model,
//! and pipeline errors are caught at the per-image boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for clipscore operations.
#[derive(Error, Debug)]
pub enum ClipScoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An expected file or directory is absent at the point of use
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Model artifact download/cache errors
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Requested model is not in the registry
    #[error("Unknown model '{name}'. Available: {}", .available.join(", "))]
    UnknownModel {
        name: String,
        available: Vec<String>,
    },

    /// A required input directory does not exist
    #[error("{role} directory does not exist: {}", .path.display())]
    MissingDirectory { role: &'static str, path: PathBuf },
}

/// Something the run needs is absent at the point of use.
#[derive(Error, Debug)]
pub enum NotFoundError {
    /// The prompt directory holds no `.txt` files
    #[error("No .txt files found in prompt directory {}", .0.display())]
    NoPromptFiles(PathBuf),

    /// A directory vanished or was never there
    #[error("Directory does not exist: {}", .0.display())]
    Directory(PathBuf),
}

/// Errors raised while materializing a model artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// HTTP request failed or returned a non-success status
    #[error("Download of {name} from {url} failed: {message}")]
    Download {
        name: String,
        url: String,
        message: String,
    },

    /// Writing the artifact to the cache failed
    #[error("Cache write failed for {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry has no entry for this name
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Per-image processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Embedding generation failed
    #[error("Embedding failed for {path}: {message}")]
    Embedding { path: PathBuf, message: String },

    /// Model loading or text encoding failed
    #[error("Model error: {message}")]
    Model { message: String },

    /// Writing a scored image copy or chart failed
    #[error("Failed to write {path}: {message}")]
    Output { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience type alias for clipscore results.
pub type Result<T> = std::result::Result<T, ClipScoreError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
