//! Results output as CSV and pretty JSON.
//!
//! Both files hold the same records in the same order. They are written even
//! when some images of the batch failed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::ScoreRecord;

/// CSV file name inside `results/`.
pub const CSV_FILE_NAME: &str = "results.csv";

/// JSON file name inside `results/`.
pub const JSON_FILE_NAME: &str = "results.json";

/// Where a results write landed.
#[derive(Debug, Clone)]
pub struct ResultFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Write `records` to `results.csv` and `results.json` in `results_dir`.
pub fn write_results(records: &[ScoreRecord], results_dir: &Path) -> Result<ResultFiles> {
    let files = ResultFiles {
        csv: results_dir.join(CSV_FILE_NAME),
        json: results_dir.join(JSON_FILE_NAME),
    };

    write_csv(records, &files.csv)?;
    write_json(records, &files.json)?;

    tracing::info!(
        "Wrote {} results to {:?} and {:?}",
        records.len(),
        files.csv,
        files.json
    );
    Ok(files)
}

fn write_csv(records: &[ScoreRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        // serde only emits the header alongside the first row.
        writer.write_record(["image_index", "image_name", "clip_score", "scored_image_path"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(records: &[ScoreRecord], path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Read records back from a `results.csv`.
pub fn read_csv(path: &Path) -> Result<Vec<ScoreRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
