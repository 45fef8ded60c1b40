//! Guided scoring flow.
//!
//! Walks the user through: target folder → prompt file → model → chart selection →
//! confirmation. Builds a `ScoreArgs` and delegates to `cli::score::execute()`.

use std::path::PathBuf;

use clipscore_core::artifact::ModelRegistry;
use clipscore_core::pipeline::{list_prompt_files, read_prompt, FileDiscovery};
use clipscore_core::Config;
use console::Style;
use dialoguer::{Confirm, Input, Select};

use crate::cli::score::ScoreArgs;

use super::theme::clipscore_theme;

/// Walk the user through one scoring run.
pub async fn guided_score(config: &Config) -> anyhow::Result<()> {
    let theme = clipscore_theme();
    let warn = Style::new().for_stderr().yellow();
    let dim = Style::new().for_stderr().dim();

    // ── Target folder ─────────────────────────────────────────────────────

    let discovery = FileDiscovery::new(config.processing.clone());
    let (target_dir, image_count) = loop {
        let Some(raw) = super::handle_interrupt(
            Input::<String>::with_theme(&theme)
                .with_prompt("Folder of images to score")
                .default(config.input.target_dir.display().to_string())
                .interact_text(),
        )?
        else {
            return Ok(());
        };
        let path = PathBuf::from(shellexpand::tilde(&raw).into_owned());

        match discovery.discover(&path) {
            Ok(files) if files.is_empty() => {
                eprintln!("  {}", warn.apply_to("No supported images in that folder."));
            }
            Ok(files) => break (path, files.len()),
            Err(e) => eprintln!("  {}", warn.apply_to(e.to_string())),
        }
    };
    eprintln!("  {}", dim.apply_to(format!("Found {image_count} image(s)")));

    // ── Prompt file ───────────────────────────────────────────────────────

    let prompt_files = match list_prompt_files(&config.prompt_dir()) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("  {}", warn.apply_to(e.to_string()));
            return Ok(());
        }
    };

    let prompt_choice = if prompt_files.len() == 1 {
        0
    } else {
        let items: Vec<String> = prompt_files
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();
        let Some(choice) = Select::with_theme(&theme)
            .with_prompt("Prompt file")
            .items(&items)
            .default(0)
            .interact_opt()?
        else {
            return Ok(());
        };
        choice
    };
    match read_prompt(&prompt_files[prompt_choice]) {
        Ok(prompt) => eprintln!("  {}", dim.apply_to(format!("Prompt: {prompt}"))),
        Err(e) => {
            eprintln!("  {}", warn.apply_to(e.to_string()));
            return Ok(());
        }
    }

    // ── Model ─────────────────────────────────────────────────────────────

    let model_names = ModelRegistry::builtin().model_names();
    let default_model = model_names
        .iter()
        .position(|n| *n == config.model.name)
        .unwrap_or(0);
    let Some(model_choice) = Select::with_theme(&theme)
        .with_prompt("Model")
        .items(&model_names)
        .default(default_model)
        .interact_opt()?
    else {
        return Ok(());
    };

    // ── Charts ────────────────────────────────────────────────────────────

    let draw_charts = Confirm::with_theme(&theme)
        .with_prompt("Render charts?")
        .default(config.charts.enabled)
        .interact_opt()?;
    let Some(draw_charts) = draw_charts else {
        return Ok(());
    };

    let args = ScoreArgs::default();
    let chart_options = if draw_charts {
        let defaults = args.resolve_chart_options(config);
        match super::charts::select_chart_options(&defaults)? {
            Some(options) => Some(options),
            None => return Ok(()),
        }
    } else {
        None
    };

    // ── Confirmation ──────────────────────────────────────────────────────

    eprintln!();
    let bold = Style::new().for_stderr().bold();
    eprintln!(
        "  {}",
        bold.apply_to(format!("Ready to score {image_count} image(s)"))
    );
    let charts_label = match &chart_options {
        Some(o) => format!("{} / {}", o.summary_kind, o.single_kind),
        None => "off".to_string(),
    };
    eprintln!(
        "  {}",
        dim.apply_to(format!(
            "Model: {} | Charts: {charts_label} | Output: {}",
            model_names[model_choice],
            config.output.base_dir.display()
        ))
    );
    eprintln!();

    let confirm = Confirm::with_theme(&theme)
        .with_prompt("Start scoring?")
        .default(true)
        .interact_opt()?;
    if !matches!(confirm, Some(true)) {
        return Ok(());
    }

    // ── Delegate ──────────────────────────────────────────────────────────

    let args = ScoreArgs {
        target_dir: Some(target_dir),
        prompt_file: Some((prompt_choice + 1).to_string()),
        model: Some(model_names[model_choice].clone()),
        no_charts: !draw_charts,
        chart_options,
        ..args
    };

    crate::cli::score::execute(args).await?;

    eprintln!();
    let again = Select::with_theme(&theme)
        .with_prompt("What next?")
        .items(&["Score another folder", "Back to main menu"])
        .default(0)
        .interact_opt()?;

    if matches!(again, Some(0)) {
        Box::pin(guided_score(config)).await?;
    }

    Ok(())
}
