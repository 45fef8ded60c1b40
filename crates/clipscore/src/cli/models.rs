//! The `clipscore models` command for managing cached model artifacts.

use clap::{Args, Subcommand};
use clipscore_core::artifact::{ArtifactKind, DownloadOutcome, ModelRegistry};
use clipscore_core::{ArtifactCache, ArtifactStatus, Config};
use console::Style;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download models and the tokenizers they need (default: the configured model)
    Download {
        /// Registry names, e.g. ViT-B/32
        #[arg(conflicts_with = "all")]
        names: Vec<String>,

        /// Download every registry entry
        #[arg(long)]
        all: bool,
    },

    /// Check cached files against their expected sizes
    Verify {
        /// Registry names (default: everything in the registry)
        names: Vec<String>,

        /// Exit with an error when any artifact fails verification
        #[arg(long)]
        strict: bool,
    },

    /// List registry entries and their cache status
    List,

    /// Show model directory path
    Path,
}

/// Expand a download request into registry names, adding each model's
/// tokenizer after it. Unknown names are kept so the cache reports them.
pub fn download_names(
    registry: &ModelRegistry,
    requested: &[String],
    all: bool,
    configured: &str,
) -> Vec<String> {
    let roots: Vec<String> = if all {
        registry.entries().iter().map(|e| e.name.clone()).collect()
    } else if requested.is_empty() {
        vec![configured.to_string()]
    } else {
        requested.to_vec()
    };

    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    for root in &roots {
        push(root);
        if let Ok(spec) = registry.get(root) {
            if let ArtifactKind::Model { tokenizer, .. } = &spec.kind {
                push(tokenizer);
            }
        }
    }
    names
}

/// Short human label for an artifact status.
pub fn status_label(status: &ArtifactStatus) -> String {
    match status {
        ArtifactStatus::Missing => "not installed".to_string(),
        ArtifactStatus::Verified { size } => format!("ready ({})", format_size(*size)),
        ArtifactStatus::Unrecorded { size } => {
            format!("unverified ({}, no recorded size)", format_size(*size))
        }
        ArtifactStatus::SizeMismatch { expected, actual } => {
            format!("size mismatch ({actual} of {expected} bytes)")
        }
    }
}

/// Verify each name, logging problems, and return the statuses in order.
pub fn verify_report(
    cache: &ArtifactCache,
    names: &[String],
) -> anyhow::Result<Vec<(String, ArtifactStatus)>> {
    let mut report = Vec::with_capacity(names.len());
    for name in names {
        cache.verify(name)?;
        report.push((name.clone(), cache.inspect(name)?));
    }
    Ok(report)
}

/// A failed verification is reported, not fatal, unless `strict` is set.
fn verify_outcome(report: &[(String, ArtifactStatus)], strict: bool) -> anyhow::Result<()> {
    let bad = report.iter().filter(|(_, s)| !s.is_ok()).count();
    if bad > 0 {
        if strict {
            anyhow::bail!("{bad} artifact(s) missing or failed verification");
        }
        tracing::warn!("{bad} artifact(s) missing or failed verification");
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Download `names` one after another and print a per-name report.
///
/// Returns how many downloads failed.
pub async fn download(cache: &ArtifactCache, names: &[String]) -> usize {
    let outcomes = cache.ensure_all(names).await;
    print_download_report(&outcomes);
    outcomes.iter().filter(|o| o.result.is_err()).count()
}

fn print_download_report(outcomes: &[DownloadOutcome]) {
    let ok = Style::new().for_stderr().green();
    let err = Style::new().for_stderr().red();

    eprintln!();
    for outcome in outcomes {
        match &outcome.result {
            Ok(path) => eprintln!(
                "  {} {:<20} {}",
                ok.apply_to("✓"),
                outcome.name,
                path.display()
            ),
            Err(e) => eprintln!("  {} {:<20} {e}", err.apply_to("✗"), outcome.name),
        }
    }
    eprintln!();
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let cache = ArtifactCache::from_config(&config);

    match args.command {
        ModelsCommand::Download { names, all } => {
            let names = download_names(cache.registry(), &names, all, &config.model.name);
            let failed = download(&cache, &names).await;
            if failed > 0 {
                anyhow::bail!("{failed} of {} download(s) failed", names.len());
            }
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::Verify { names, strict } => {
            let names = if names.is_empty() {
                cache
                    .registry()
                    .entries()
                    .iter()
                    .map(|e| e.name.clone())
                    .collect()
            } else {
                names
            };

            let report = verify_report(&cache, &names)?;
            for (name, status) in &report {
                println!("  {:<20} {}", name, status_label(status));
            }
            verify_outcome(&report, strict)?;
        }

        ModelsCommand::List => {
            println!("Registry models:");
            println!("  Directory: {}\n", cache.dir().display());

            for spec in cache.registry().entries() {
                let status = cache.inspect(&spec.name)?;
                let marker = if spec.name == config.model.name {
                    "  (default)"
                } else {
                    ""
                };
                println!(
                    "    - {:20} {:32}{}",
                    spec.name,
                    status_label(&status),
                    marker
                );
            }
        }

        ModelsCommand::Path => {
            println!("{}", cache.dir().display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_download_is_configured_model_and_tokenizer() {
        let registry = ModelRegistry::builtin();
        let resolved = download_names(&registry, &[], false, "ViT-B/16");
        assert_eq!(resolved, names(&["ViT-B/16", "clip-tokenizer"]));
    }

    #[test]
    fn shared_tokenizer_is_listed_once() {
        let registry = ModelRegistry::builtin();
        let resolved = download_names(
            &registry,
            &names(&["ViT-B/32", "ViT-L/14"]),
            false,
            "ViT-B/32",
        );
        assert_eq!(resolved, names(&["ViT-B/32", "clip-tokenizer", "ViT-L/14"]));
    }

    #[test]
    fn all_covers_whole_registry() {
        let registry = ModelRegistry::builtin();
        let resolved = download_names(&registry, &[], true, "ViT-B/32");
        assert_eq!(resolved.len(), registry.entries().len());
    }

    #[test]
    fn unknown_names_pass_through() {
        let registry = ModelRegistry::builtin();
        let resolved = download_names(&registry, &names(&["RN50"]), false, "ViT-B/32");
        assert_eq!(resolved, names(&["RN50"]));
    }

    #[test]
    fn status_labels() {
        assert_eq!(status_label(&ArtifactStatus::Missing), "not installed");
        assert_eq!(
            status_label(&ArtifactStatus::SizeMismatch {
                expected: 10,
                actual: 4
            }),
            "size mismatch (4 of 10 bytes)"
        );
        assert!(status_label(&ArtifactStatus::Unrecorded { size: 1 }).contains("unverified"));
    }

    #[test]
    fn verify_reports_mismatch_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::with_http(dir.path(), ModelRegistry::builtin());
        std::fs::write(cache.local_path("ViT-B/32").unwrap(), b"abc").unwrap();

        let report = verify_report(&cache, &names(&["ViT-B/32", "ViT-B/16"])).unwrap();
        assert_eq!(
            report,
            vec![
                ("ViT-B/32".to_string(), ArtifactStatus::Unrecorded { size: 3 }),
                ("ViT-B/16".to_string(), ArtifactStatus::Missing),
            ]
        );
        assert!(verify_outcome(&report, false).is_ok());
        assert!(verify_outcome(&report, true).is_err());
    }

    #[test]
    fn verify_unknown_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::with_http(dir.path(), ModelRegistry::builtin());
        assert!(verify_report(&cache, &names(&["RN50"])).is_err());
    }
}
