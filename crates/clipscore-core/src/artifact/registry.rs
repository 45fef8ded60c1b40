//! The table of downloadable model artifacts.

use crate::error::ConfigError;

const HF_BASE: &str = "https://huggingface.co";

/// Name of the tokenizer shared by all built-in CLIP models.
pub const CLIP_TOKENIZER: &str = "clip-tokenizer";

/// Smallest built-in model; used when nothing else picks one.
pub const DEFAULT_MODEL: &str = "ViT-B/32";

/// What an artifact is, and what a model needs next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Combined CLIP ONNX graph (image + text towers)
    Model {
        /// Registry name of the tokenizer this model expects
        tokenizer: String,
        /// Square input resolution of the vision tower
        image_size: u32,
    },
    /// HuggingFace `tokenizer.json`
    Tokenizer,
}

impl ArtifactKind {
    /// Fixed file extension for this kind in the cache directory.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Model { .. } => "onnx",
            ArtifactKind::Tokenizer => "json",
        }
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: String,
    pub url: String,
    /// Byte size a complete download must have, when known
    pub expected_size: Option<u64>,
    pub kind: ArtifactKind,
}

impl ArtifactSpec {
    /// A model entry.
    pub fn model(
        name: impl Into<String>,
        url: impl Into<String>,
        tokenizer: impl Into<String>,
        image_size: u32,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_size: None,
            kind: ArtifactKind::Model {
                tokenizer: tokenizer.into(),
                image_size,
            },
        }
    }

    /// A tokenizer entry.
    pub fn tokenizer(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_size: None,
            kind: ArtifactKind::Tokenizer,
        }
    }

    /// Pin the expected byte size.
    pub fn with_expected_size(mut self, bytes: u64) -> Self {
        self.expected_size = Some(bytes);
        self
    }

    /// Cache file name: the sanitized name plus the kind's extension.
    pub fn file_name(&self) -> String {
        format!("{}.{}", sanitize_name(&self.name), self.kind.extension())
    }

    pub fn is_model(&self) -> bool {
        matches!(self.kind, ArtifactKind::Model { .. })
    }
}

/// Replace characters that cannot appear in a single path component.
///
/// `ViT-B/32` becomes `ViT-B_32`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Immutable, ordered set of known artifacts.
///
/// Passed into [`ArtifactCache`](super::ArtifactCache) at construction so
/// tests can substitute their own table.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<ArtifactSpec>,
}

impl ModelRegistry {
    /// Build a registry from explicit entries. Later duplicates replace
    /// earlier ones.
    pub fn new(entries: impl IntoIterator<Item = ArtifactSpec>) -> Self {
        let mut registry = Self::default();
        for spec in entries {
            match registry.entries.iter_mut().find(|e| e.name == spec.name) {
                Some(existing) => *existing = spec,
                None => registry.entries.push(spec),
            }
        }
        registry
    }

    /// The compiled-in table of CLIP ONNX exports.
    pub fn builtin() -> Self {
        let hf = |repo: &str, file: &str| format!("{HF_BASE}/{repo}/resolve/main/{file}");

        Self::new([
            ArtifactSpec::model(
                "ViT-B/32",
                hf("Xenova/clip-vit-base-patch32", "onnx/model.onnx"),
                CLIP_TOKENIZER,
                224,
            ),
            ArtifactSpec::model(
                "ViT-B/16",
                hf("Xenova/clip-vit-base-patch16", "onnx/model.onnx"),
                CLIP_TOKENIZER,
                224,
            ),
            ArtifactSpec::model(
                "ViT-L/14",
                hf("Xenova/clip-vit-large-patch14", "onnx/model.onnx"),
                CLIP_TOKENIZER,
                224,
            ),
            ArtifactSpec::model(
                "ViT-L/14@336px",
                hf("Xenova/clip-vit-large-patch14-336", "onnx/model.onnx"),
                CLIP_TOKENIZER,
                336,
            ),
            ArtifactSpec::tokenizer(
                CLIP_TOKENIZER,
                hf("Xenova/clip-vit-base-patch32", "tokenizer.json"),
            ),
        ])
    }

    /// Look up an entry, failing with the list of known names.
    pub fn get(&self, name: &str) -> Result<&ArtifactSpec, ConfigError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownModel {
                name: name.to_string(),
                available: self.model_names(),
            })
    }

    /// All entries in registry order.
    pub fn entries(&self) -> &[ArtifactSpec] {
        &self.entries
    }

    /// Names of the model entries (tokenizers excluded).
    pub fn model_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_model())
            .map(|e| e.name.clone())
            .collect()
    }
}

/// Pick a built-in model that fits a GPU memory budget in megabytes.
///
/// Without a known budget the smallest model is used.
pub fn select_model_for_memory(available_mb: Option<u64>) -> &'static str {
    match available_mb {
        Some(mb) if mb >= 16_000 => "ViT-L/14@336px",
        Some(mb) if mb >= 12_000 => "ViT-L/14",
        Some(mb) if mb >= 8_000 => "ViT-B/16",
        _ => DEFAULT_MODEL,
    }
}
