//! CLIP embedding generation.
//!
//! This module turns images and prompts into L2-normalized vectors in a
//! shared space, using a combined CLIP graph running locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipscore_core::artifact::ArtifactCache;
//! use clipscore_core::embedding::{ClipModel, SimilarityModel};
//!
//! let files = cache.ensure_model("ViT-B/32").await?;
//! let model = ClipModel::load(&files)?;
//! let text = model.encode_text("a photo of a cat")?;
//! ```

pub(crate) mod clip;
pub mod preprocess;

use std::path::Path;

use ndarray::Array4;

use crate::artifact::ModelFiles;
use crate::error::PipelineError;

use self::clip::ClipSession;

pub use self::preprocess::preprocess;

/// An image/text similarity model.
///
/// The scoring pipeline only talks to this trait, so tests can run it
/// against a deterministic fake instead of an ONNX graph.
pub trait SimilarityModel: Send + Sync {
    /// Square input resolution expected by [`encode_image`](Self::encode_image).
    fn image_size(&self) -> u32;

    /// Embed a preprocessed \[1, 3, S, S\] tensor. `path` is for error context.
    fn encode_image(&self, tensor: &Array4<f32>, path: &Path) -> Result<Vec<f32>, PipelineError>;

    /// Embed a text prompt.
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

/// CLIP model backed by ONNX Runtime.
pub struct ClipModel {
    name: String,
    session: ClipSession,
}

impl ClipModel {
    /// Load the model graph and tokenizer from cached artifacts.
    pub fn load(files: &ModelFiles) -> Result<Self, PipelineError> {
        for path in [&files.model, &files.tokenizer] {
            if !path.exists() {
                return Err(PipelineError::Model {
                    message: format!(
                        "{} not found. Run `clipscore models download` first.",
                        path.display()
                    ),
                });
            }
        }

        tracing::info!("Loading CLIP model {} from {:?}", files.name, files.model);
        let session = ClipSession::load(&files.model, &files.tokenizer, files.image_size)?;
        tracing::info!("CLIP model loaded successfully");

        Ok(Self {
            name: files.name.clone(),
            session,
        })
    }

    /// Registry name of the loaded model.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SimilarityModel for ClipModel {
    fn image_size(&self) -> u32 {
        self.session.image_size()
    }

    fn encode_image(&self, tensor: &Array4<f32>, path: &Path) -> Result<Vec<f32>, PipelineError> {
        self.session.encode_image(tensor, path)
    }

    fn encode_text(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        self.session.encode_text(text)
    }
}
