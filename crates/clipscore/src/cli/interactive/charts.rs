//! Guided chart selection: kind and color for both chart families, then
//! figure size and axis labels.

use clipscore_core::chart::{ChartKind, ChartOptions, FigureSize, HexColor};
use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use super::theme::clipscore_theme;

/// Ask for chart options, starting from `defaults`.
///
/// Returns `Ok(None)` if the user backs out.
pub fn select_chart_options(defaults: &ChartOptions) -> anyhow::Result<Option<ChartOptions>> {
    let theme = clipscore_theme();

    let Some(summary_kind) = select_kind(&theme, "Summary chart type", defaults.summary_kind)?
    else {
        return Ok(None);
    };
    let Some(summary_color) = input_color(&theme, "Summary chart color", defaults.summary_color)?
    else {
        return Ok(None);
    };
    let Some(single_kind) = select_kind(&theme, "Per-image chart type", defaults.single_kind)?
    else {
        return Ok(None);
    };
    let Some(single_color) = input_color(&theme, "Per-image chart color", defaults.single_color)?
    else {
        return Ok(None);
    };
    let Some(figure) = input_figure(&theme, defaults.figure)? else {
        return Ok(None);
    };
    let Some(x_label) = input_label(&theme, "X-axis label", &defaults.x_label)? else {
        return Ok(None);
    };
    let Some(y_label) = input_label(&theme, "Y-axis label", &defaults.y_label)? else {
        return Ok(None);
    };

    Ok(Some(ChartOptions {
        summary_kind,
        summary_color,
        single_kind,
        single_color,
        figure,
        x_label,
        y_label,
        ..defaults.clone()
    }))
}

fn select_kind(
    theme: &ColorfulTheme,
    prompt: &str,
    current: ChartKind,
) -> anyhow::Result<Option<ChartKind>> {
    let items: Vec<String> = ChartKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| format!("{}. {kind}", i + 1))
        .collect();
    let default = ChartKind::ALL
        .iter()
        .position(|k| *k == current)
        .unwrap_or(0);

    let selection = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&items)
        .default(default)
        .interact_opt()?;

    Ok(selection.and_then(|i| ChartKind::ALL.get(i).copied()))
}

fn input_color(
    theme: &ColorfulTheme,
    prompt: &str,
    current: HexColor,
) -> anyhow::Result<Option<HexColor>> {
    let Some(raw) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt(format!("{prompt} (#rrggbb)"))
            .default(current.to_string())
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(resolve(&raw, HexColor::parse(&raw), HexColor::DEFAULT)))
}

fn input_figure(theme: &ColorfulTheme, current: FigureSize) -> anyhow::Result<Option<FigureSize>> {
    let Some(raw) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Figure size in inches (width,height)")
            .default(current.to_string())
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(resolve(&raw, FigureSize::parse(&raw), FigureSize::DEFAULT)))
}

fn input_label(
    theme: &ColorfulTheme,
    prompt: &str,
    current: &str,
) -> anyhow::Result<Option<String>> {
    let raw = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt(prompt)
            .default(current.to_string())
            .interact_text(),
    )?;
    Ok(raw.map(|raw| label_or(&raw, current)))
}

/// A blank label keeps the current one.
fn label_or(raw: &str, current: &str) -> String {
    match raw.trim() {
        "" => current.to_string(),
        label => label.to_string(),
    }
}

/// Keep a valid answer; otherwise tell the user and use the default.
fn resolve<T: std::fmt::Display>(raw: &str, parsed: Option<T>, default: T) -> T {
    match parsed {
        Some(value) => value,
        None => {
            let warn = Style::new().for_stderr().yellow();
            eprintln!(
                "  {}",
                warn.apply_to(format!("'{raw}' is not valid, using {default}"))
            );
            default
        }
    }
}
