//! CLIP ONNX session management and inference.
//!
//! Loads a combined CLIP graph (both towers in one file) and a HuggingFace
//! tokenizer. The graph takes `input_ids`, `pixel_values` and, for some
//! exports, `attention_mask`; it returns `image_embeds` and `text_embeds`.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// CLIP text context length.
const MAX_TOKENS: usize = 77;

const IMAGE_OUTPUT: &str = "image_embeds";
const TEXT_OUTPUT: &str = "text_embeds";

/// Token ids plus their attention mask.
struct TokenizedText {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

/// Wraps an ONNX Runtime session for a combined CLIP model.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct ClipSession {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    has_attention_mask: bool,
    image_size: u32,
    /// Placeholder text fed to the text tower when only the image matters.
    blank_text: TokenizedText,
}

impl ClipSession {
    /// Load the model graph and tokenizer.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        image_size: u32,
    ) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load ONNX model {:?}: {e}", model_path),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load tokenizer {:?}: {e}", tokenizer_path),
            }
        })?;

        let has_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP model from {:?} (inputs: {:?}, outputs: {:?})",
            model_path,
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        let blank_text = tokenize(&tokenizer, "")?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            has_attention_mask,
            image_size,
            blank_text,
        })
    }

    /// Square input resolution of the vision tower.
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Run the vision tower on a preprocessed \[1, 3, S, S\] tensor.
    pub fn encode_image(
        &self,
        preprocessed: &Array4<f32>,
        path: &Path,
    ) -> Result<Vec<f32>, PipelineError> {
        self.run(preprocessed, &self.blank_text, IMAGE_OUTPUT)
            .map_err(|message| PipelineError::Embedding {
                path: path.to_path_buf(),
                message,
            })
    }

    /// Run the text tower on one prompt.
    pub fn encode_text(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let tokens = tokenize(&self.tokenizer, text)?;
        let size = self.image_size as usize;
        let blank_pixels = Array4::<f32>::zeros((1, 3, size, size));
        self.run(&blank_pixels, &tokens, TEXT_OUTPUT)
            .map_err(|message| PipelineError::Model { message })
    }

    /// One forward pass; returns the L2-normalized vector of `output`.
    fn run(
        &self,
        pixels: &Array4<f32>,
        tokens: &TokenizedText,
        output: &str,
    ) -> Result<Vec<f32>, String> {
        // Convert ndarray to (shape, flat_data) for ort.
        let pixel_shape: Vec<i64> = pixels.shape().iter().map(|&d| d as i64).collect();
        let pixel_data: Vec<f32> = pixels.iter().copied().collect();
        let token_shape = vec![1i64, tokens.ids.len() as i64];

        let pixel_values = Value::from_array((pixel_shape, pixel_data))
            .map_err(|e| format!("Failed to create pixel tensor: {e}"))?;
        let input_ids = Value::from_array((token_shape.clone(), tokens.ids.clone()))
            .map_err(|e| format!("Failed to create input_ids tensor: {e}"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {e}"))?;

        let result = if self.has_attention_mask {
            let attention_mask = Value::from_array((token_shape, tokens.mask.clone()))
                .map_err(|e| format!("Failed to create attention_mask tensor: {e}"))?;
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "pixel_values" => pixel_values,
                "attention_mask" => attention_mask
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "pixel_values" => pixel_values
            ])
        };
        let outputs = result.map_err(|e| format!("ONNX inference failed: {e}"))?;

        let embeds = outputs
            .iter()
            .find(|(name, _)| *name == output)
            .ok_or_else(|| format!("Model did not produce {output}"))?;

        let (shape, data) = embeds
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("Failed to extract {output} tensor: {e}"))?;

        // Embeddings are [1, D]; keep the single row.
        let mut raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => return Err(format!("Unexpected {output} shape: {:?}", shape)),
        };

        crate::math::l2_normalize_in_place(&mut raw);
        Ok(raw)
    }
}

/// Tokenize with special tokens, keeping the end token when truncating.
fn tokenize(tokenizer: &tokenizers::Tokenizer, text: &str) -> Result<TokenizedText, PipelineError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| PipelineError::Model {
            message: format!("Tokenization failed: {e}"),
        })?;

    let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mut mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();

    truncate_keep_last(&mut ids, MAX_TOKENS);
    truncate_keep_last(&mut mask, MAX_TOKENS);

    if ids.is_empty() {
        return Err(PipelineError::Model {
            message: "Tokenizer produced no tokens".to_string(),
        });
    }
    Ok(TokenizedText { ids, mask })
}

/// Cut `v` to `max` elements, replacing the last kept element with the
/// original final element.
fn truncate_keep_last(v: &mut Vec<i64>, max: usize) {
    if v.len() <= max || max == 0 {
        return;
    }
    let last = v[v.len() - 1];
    v.truncate(max);
    v[max - 1] = last;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_end_token() {
        let mut ids: Vec<i64> = (0..100).collect();
        truncate_keep_last(&mut ids, MAX_TOKENS);
        assert_eq!(ids.len(), 77);
        assert_eq!(ids[0], 0);
        assert_eq!(ids[76], 99);
    }

    #[test]
    fn truncate_short_is_noop() {
        let mut ids = vec![49406, 320, 49407];
        truncate_keep_last(&mut ids, MAX_TOKENS);
        assert_eq!(ids, vec![49406, 320, 49407]);
    }
}
