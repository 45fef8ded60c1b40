//! Guided model management: cache status and downloads.

use crate::cli::models::{download, download_names, status_label};
use clipscore_core::{ArtifactCache, ArtifactStatus, Config};
use console::Style;
use dialoguer::Select;

use super::theme::clipscore_theme;

/// Internal action type for the model menu.
enum ModelAction {
    Download(String),
    DownloadAll,
    ShowPath,
    Back,
}

/// Show the cache status and offer downloads for missing models.
pub async fn guided_models(config: &Config) -> anyhow::Result<()> {
    let theme = clipscore_theme();
    let cache = ArtifactCache::from_config(config);

    loop {
        let statuses = print_status(&cache)?;

        let mut items: Vec<String> = Vec::new();
        let mut actions: Vec<ModelAction> = Vec::new();

        for (name, status) in &statuses {
            let is_model = cache
                .registry()
                .get(name)
                .map(|spec| spec.is_model())
                .unwrap_or(false);
            if is_model && *status == ArtifactStatus::Missing {
                items.push(format!("Download {name}"));
                actions.push(ModelAction::Download(name.clone()));
            }
        }
        if statuses
            .iter()
            .filter(|(_, s)| *s == ArtifactStatus::Missing)
            .count()
            > 1
        {
            items.push("Download everything missing".to_string());
            actions.push(ModelAction::DownloadAll);
        }

        items.push("Show model directory".to_string());
        actions.push(ModelAction::ShowPath);
        items.push("Back".to_string());
        actions.push(ModelAction::Back);

        let selection = Select::with_theme(&theme)
            .with_prompt("Model management")
            .items(&items)
            .default(0)
            .interact_opt()?;

        let Some(idx) = selection else {
            break;
        };

        match &actions[idx] {
            ModelAction::Download(name) => {
                let names = download_names(cache.registry(), &[name.clone()], false, name);
                report(download(&cache, &names).await);
            }
            ModelAction::DownloadAll => {
                let names = download_names(cache.registry(), &[], true, &config.model.name);
                report(download(&cache, &names).await);
            }
            ModelAction::ShowPath => {
                eprintln!("  {}", cache.dir().display());
                eprintln!();
            }
            ModelAction::Back => break,
        }
    }

    Ok(())
}

fn report(failed: usize) {
    if failed == 0 {
        let done = Style::new().for_stderr().green();
        eprintln!("{}", done.apply_to("  Downloads complete."));
    } else {
        let err = Style::new().for_stderr().red();
        eprintln!("{}", err.apply_to(format!("  {failed} download(s) failed.")));
    }
    eprintln!();
}

/// Print the cache status of every registry entry and return it.
fn print_status(cache: &ArtifactCache) -> anyhow::Result<Vec<(String, ArtifactStatus)>> {
    let ok = Style::new().for_stderr().green();
    let bad = Style::new().for_stderr().red();
    let dim = Style::new().for_stderr().dim();

    eprintln!();
    eprintln!(
        "  {}",
        dim.apply_to(format!("Model directory: {}", cache.dir().display()))
    );
    eprintln!();

    let mut statuses = Vec::new();
    for spec in cache.registry().entries() {
        let status = cache.inspect(&spec.name)?;
        let marker = if status.is_ok() {
            ok.apply_to("✓")
        } else {
            bad.apply_to("✗")
        };
        eprintln!(
            "  {} {:<20} {}",
            marker,
            spec.name,
            dim.apply_to(status_label(&status))
        );
        statuses.push((spec.name.clone(), status));
    }
    eprintln!();

    Ok(statuses)
}
