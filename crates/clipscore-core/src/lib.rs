//! clipscore core - batch CLIP scoring of image folders against a prompt.
//!
//! Each run scores every image in a target directory against one text
//! prompt and isolates its outputs in a fresh numbered batch folder.
//!
//! # Architecture
//!
//! ```text
//! Prompt file ─┐
//!              ├→ CLIP (ONNX) → cosine score → scored copy + CSV/JSON + charts
//! Images ──────┘                                  └→ <base>/Batch_<n>/
//! ```
//!
//! Model weights are fetched once into a local cache by [`artifact::ArtifactCache`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipscore_core::{
//!     allocate_next_batch, ArtifactCache, BatchLayout, BatchScorer, ClipModel, Config,
//! };
//!
//! #[tokio::main]
//! async fn main() -> clipscore_core::Result<()> {
//!     let config = Config::load()?;
//!     let cache = ArtifactCache::from_config(&config);
//!     let model = ClipModel::load(&cache.ensure_model("ViT-B/32").await?)?;
//!
//!     let batch = allocate_next_batch(&config.output_base_dir())?;
//!     let layout = BatchLayout::create(batch)?;
//!     let scorer = BatchScorer::new(&config);
//!     let files = scorer.discover(&config.target_dir())?;
//!     let report = scorer
//!         .score_files(&model, "a photo of a cat", &files, &layout.scored_images, |_, _| {})
//!         .await?;
//!     clipscore_core::output::write_results(&report.records, &layout.results)?;
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod batch;
pub mod chart;
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use artifact::{ArtifactCache, ArtifactStatus, ModelFiles, ModelRegistry};
pub use batch::{allocate_next_batch, BatchLayout};
pub use chart::{ChartKind, ChartOptions, FigureSize, HexColor};
pub use config::Config;
pub use embedding::{ClipModel, SimilarityModel};
pub use error::{
    ArtifactError, ClipScoreError, ConfigError, NotFoundError, PipelineError, PipelineResult,
    Result,
};
pub use pipeline::BatchScorer;
pub use types::{ItemFailure, ScoreRecord, ScoreReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
