//! Batch scoring - wires discovery, validation, decoding and the model.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::config::Config;
use crate::embedding::{preprocess, SimilarityModel};
use crate::error::{NotFoundError, PipelineError, PipelineResult, Result};
use crate::math::cosine_similarity;
use crate::types::{scored_file_name, ItemFailure, ScoreRecord, ScoreReport};

use super::decode::ImageDecoder;
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::validate::Validator;

/// Scores every image of a target directory against one prompt.
pub struct BatchScorer {
    decoder: ImageDecoder,
    validator: Validator,
    discovery: FileDiscovery,
}

/// A scored image before it is given its place in the batch.
struct Scored {
    score: f32,
    image: DynamicImage,
}

impl BatchScorer {
    pub fn new(config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            validator: Validator::new(config.limits.clone()),
            discovery: FileDiscovery::new(config.processing.clone()),
        }
    }

    /// Supported images in `target_dir`, sorted by name.
    pub fn discover(
        &self,
        target_dir: &Path,
    ) -> std::result::Result<Vec<DiscoveredFile>, NotFoundError> {
        self.discovery.discover(target_dir)
    }

    /// Score `files` in order and save a JPEG copy of each under `scored_dir`.
    ///
    /// The prompt is encoded once; failing to encode it fails the whole run.
    /// Per-image failures are collected in the report and do not stop the
    /// batch. `on_item` is called after each file with its outcome.
    pub async fn score_files<F>(
        &self,
        model: &dyn SimilarityModel,
        prompt: &str,
        files: &[DiscoveredFile],
        scored_dir: &Path,
        mut on_item: F,
    ) -> Result<ScoreReport>
    where
        F: FnMut(&DiscoveredFile, std::result::Result<&ScoreRecord, &ItemFailure>),
    {
        let text_embedding = model.encode_text(prompt)?;
        tracing::debug!("Encoded prompt ({} dims)", text_embedding.len());

        let mut report = ScoreReport::default();

        for file in files {
            let start = std::time::Instant::now();
            let outcome = match self.score_one(model, &text_embedding, &file.path).await {
                Ok(scored) => {
                    let index = report.records.len() + 1;
                    save_scored_copy(&scored, scored_dir).map(|name| ScoreRecord {
                        image_index: index,
                        image_name: file.file_name(),
                        clip_score: scored.score,
                        scored_image_path: name,
                    })
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(record) => {
                    tracing::debug!(
                        "Scored {} = {:.4} in {:?}",
                        record.image_name,
                        record.clip_score,
                        start.elapsed()
                    );
                    on_item(file, Ok(&record));
                    report.records.push(record);
                }
                Err(e) => {
                    tracing::error!(file = %file.path.display(), "Failed to score image: {e}");
                    let failure = ItemFailure {
                        file_name: file.file_name(),
                        path: file.path.clone(),
                        message: e.to_string(),
                    };
                    on_item(file, Err(&failure));
                    report.failures.push(failure);
                }
            }
        }

        Ok(report)
    }

    /// Validate, decode, embed and compare one image.
    async fn score_one(
        &self,
        model: &dyn SimilarityModel,
        text_embedding: &[f32],
        path: &Path,
    ) -> PipelineResult<Scored> {
        self.validator.validate(path)?;
        let decoded = self.decoder.decode(path).await?;

        let tensor = preprocess(&decoded.image, model.image_size());
        let image_embedding = model.encode_image(&tensor, path)?;
        let score = cosine_similarity(&image_embedding, text_embedding);

        Ok(Scored {
            score,
            image: decoded.image,
        })
    }
}

/// Write the image as `<score>.jpg`; an existing file with the same score
/// is overwritten.
fn save_scored_copy(
    scored: &Scored,
    scored_dir: &Path,
) -> PipelineResult<String> {
    let name = scored_file_name(scored.score);
    let dest = scored_dir.join(&name);
    scored
        .image
        .to_rgb8()
        .save_with_format(&dest, ImageFormat::Jpeg)
        .map_err(|e| PipelineError::Output {
            path: dest.clone(),
            message: e.to_string(),
        })?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds an image as (mean of channel 0, 1.0); the prompt as (1, 1).
    struct FakeModel {
        text_calls: AtomicUsize,
    }

    impl FakeModel {
        fn new() -> Self {
            Self {
                text_calls: AtomicUsize::new(0),
            }
        }
    }

    impl SimilarityModel for FakeModel {
        fn image_size(&self) -> u32 {
            8
        }

        fn encode_image(
            &self,
            tensor: &Array4<f32>,
            _path: &Path,
        ) -> PipelineResult<Vec<f32>> {
            let red = tensor.index_axis(ndarray::Axis(1), 0);
            let mean = red.mean().unwrap_or(0.0);
            Ok(vec![mean, 1.0])
        }

        fn encode_text(&self, _text: &str) -> PipelineResult<Vec<f32>> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 1.0])
        }
    }

    fn write_solid(dir: &Path, name: &str, red: u8) {
        image::RgbImage::from_pixel(16, 12, image::Rgb([red, 0, 0]))
            .save_with_format(dir.join(name), ImageFormat::Png)
            .unwrap();
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_batch() {
        let target = tempfile::tempdir().unwrap();
        let scored = tempfile::tempdir().unwrap();
        write_solid(target.path(), "a.png", 255);
        std::fs::write(target.path().join("b.jpg"), b"not an image").unwrap();
        write_solid(target.path(), "c.png", 0);

        let scorer = BatchScorer::new(&Config::default());
        let files = scorer.discover(target.path()).unwrap();
        assert_eq!(files.len(), 3);

        let model = FakeModel::new();
        let mut seen = Vec::new();
        let report = scorer
            .score_files(&model, "a red square", &files, scored.path(), |file, outcome| {
                seen.push((file.file_name(), outcome.is_ok()));
            })
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].file_name, "b.jpg");

        // Indices count successes only.
        let indices: Vec<_> = report.records.iter().map(|r| r.image_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(report.records[0].image_name, "a.png");
        assert_eq!(report.records[1].image_name, "c.png");

        // The red image is closer to the prompt than the black one.
        assert!(report.records[0].clip_score > report.records[1].clip_score);

        for record in &report.records {
            assert!(scored.path().join(&record.scored_image_path).exists());
        }

        assert_eq!(model.text_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            seen,
            vec![
                ("a.png".to_string(), true),
                ("b.jpg".to_string(), false),
                ("c.png".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let target = tempfile::tempdir().unwrap();
        let scored = tempfile::tempdir().unwrap();

        let scorer = BatchScorer::new(&Config::default());
        let files = scorer.discover(target.path()).unwrap();
        let report = scorer
            .score_files(&FakeModel::new(), "anything", &files, scored.path(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.total(), 0);
    }

    #[tokio::test]
    async fn test_missing_scored_dir_is_item_failure() {
        let target = tempfile::tempdir().unwrap();
        write_solid(target.path(), "a.png", 128);
        let scored = target.path().join("missing").join("scored_images");

        let scorer = BatchScorer::new(&Config::default());
        let files = scorer.discover(target.path()).unwrap();
        let report = scorer
            .score_files(&FakeModel::new(), "x", &files, &scored, |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 1);
    }
}
