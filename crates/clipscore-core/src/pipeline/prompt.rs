//! Picking and reading the text prompt for a run.

use std::path::{Path, PathBuf};

use crate::error::{ClipScoreError, ConfigError, NotFoundError};

/// Sorted `.txt` files directly inside `dir`.
pub fn list_prompt_files(dir: &Path) -> Result<Vec<PathBuf>, ClipScoreError> {
    if !dir.is_dir() {
        return Err(ConfigError::MissingDirectory {
            role: "Prompt",
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
        .collect();

    if files.is_empty() {
        return Err(NotFoundError::NoPromptFiles(dir.to_path_buf()).into());
    }

    files.sort();
    Ok(files)
}

/// Pick a prompt file from a 1-based menu choice.
///
/// Anything that is not a number in `1..=files.len()` falls back to the
/// first file. Returns `None` only when `files` is empty.
pub fn choose_prompt_file<'a>(files: &'a [PathBuf], choice: Option<&str>) -> Option<&'a PathBuf> {
    let picked = choice
        .and_then(|c| c.trim().parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| files.get(i));

    if picked.is_none() && choice.is_some() {
        tracing::warn!("Invalid prompt choice, using the first prompt file");
    }
    picked.or_else(|| files.first())
}

/// Read and trim a prompt file.
pub fn read_prompt(path: &Path) -> Result<String, ClipScoreError> {
    let text = std::fs::read_to_string(path)?;
    let prompt = text.trim();
    if prompt.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Prompt file {} is empty",
            path.display()
        ))
        .into());
    }
    Ok(prompt.to_string())
}
