//! Core data types produced by a scoring run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully scored image.
///
/// Field order is the column order of `results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// 1-based position among the successful items of the batch
    pub image_index: usize,

    /// Original file name in the target directory
    pub image_name: String,

    /// Cosine similarity between the image and the prompt
    pub clip_score: f32,

    /// File name of the copy saved under `scored_images/`
    pub scored_image_path: String,
}

impl ScoreRecord {
    /// Label used on chart axes and single-image chart file names.
    pub fn label(&self) -> String {
        format!("Target_{}", self.image_index)
    }
}

/// File name of the scored copy of an image: the score to four decimals.
pub fn scored_file_name(score: f32) -> String {
    format!("{score:.4}.jpg")
}

/// One image that could not be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub file_name: String,
    pub path: PathBuf,
    pub message: String,
}

/// Ordered outcome of scoring a whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreReport {
    pub records: Vec<ScoreRecord>,
    pub failures: Vec<ItemFailure>,
}

impl ScoreReport {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Lowest and highest score, or `None` for an empty report.
    pub fn score_range(&self) -> Option<(f32, f32)> {
        self.records.iter().map(|r| r.clip_score).fold(None, |acc, s| {
            Some(match acc {
                None => (s, s),
                Some((lo, hi)) => (lo.min(s), hi.max(s)),
            })
        })
    }

    /// Mean score, or `None` for an empty report.
    pub fn mean_score(&self) -> Option<f32> {
        if self.records.is_empty() {
            return None;
        }
        let sum: f32 = self.records.iter().map(|r| r.clip_score).sum();
        Some(sum / self.records.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, score: f32) -> ScoreRecord {
        ScoreRecord {
            image_index: index,
            image_name: format!("img{index}.png"),
            clip_score: score,
            scored_image_path: scored_file_name(score),
        }
    }

    #[test]
    fn test_scored_file_name_four_decimals() {
        assert_eq!(scored_file_name(0.312_345), "0.3123.jpg");
        assert_eq!(scored_file_name(0.25), "0.2500.jpg");
        assert_eq!(scored_file_name(-0.01), "-0.0100.jpg");
    }

    #[test]
    fn test_label() {
        assert_eq!(record(3, 0.2).label(), "Target_3");
    }

    #[test]
    fn test_report_counts_and_stats() {
        let report = ScoreReport {
            records: vec![record(1, 0.2), record(2, 0.3), record(3, 0.1)],
            failures: vec![ItemFailure {
                file_name: "bad.jpg".to_string(),
                path: PathBuf::from("target_images/bad.jpg"),
                message: "Decode error".to_string(),
            }],
        };

        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total(), 4);
        assert!(report.has_failures());
        assert_eq!(report.score_range(), Some((0.1, 0.3)));
        assert!((report.mean_score().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_empty_report() {
        let report = ScoreReport::default();
        assert!(!report.has_failures());
        assert_eq!(report.score_range(), None);
        assert_eq!(report.mean_score(), None);
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::to_string(&record(1, 0.5)).unwrap();
        assert!(json.contains("\"image_index\":1"));
        assert!(json.contains("\"scored_image_path\":\"0.5000.jpg\""));
    }
}
