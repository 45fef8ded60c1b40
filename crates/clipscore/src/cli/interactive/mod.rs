//! Guided mode for bare `clipscore` invocation.
//!
//! When `clipscore` is invoked with no subcommand on a TTY, this module
//! provides a menu-driven interface that delegates to the same logic as the
//! flag-based CLI.

pub mod charts;
pub mod models;
pub mod score;
pub mod theme;

use clipscore_core::Config;
use console::Style;
use dialoguer::Select;

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
///
/// Wraps `interact_text()` calls, which lack an `_opt` variant.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Main menu options presented to the user.
const MENU_ITEMS: &[&str] = &[
    "Score images",
    "Download / manage models",
    "Show configuration",
    "Exit",
];

/// Entry point for guided mode.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    theme::print_banner();

    let theme = theme::clipscore_theme();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => score::guided_score(config).await?,
            Some(1) => models::guided_models(config).await?,
            Some(2) => show_config(config)?,
            _ => break,
        }
    }

    Ok(())
}

/// Config viewer: a summary of current settings, with the full TOML on request.
fn show_config(config: &Config) -> anyhow::Result<()> {
    let theme = theme::clipscore_theme();
    let dim = Style::new().for_stderr().dim();
    let cyan = Style::new().for_stderr().cyan();
    let label = Style::new().for_stderr().bold();

    loop {
        eprintln!();
        eprintln!("  {}", cyan.apply_to("Current configuration:"));
        eprintln!();

        let config_path = Config::default_path();
        let path_note = if config_path.exists() {
            "(exists)"
        } else {
            "(using defaults)"
        };

        eprintln!(
            "    {:<20} {} {}",
            label.apply_to("Config file:"),
            config_path.display(),
            dim.apply_to(path_note)
        );
        let rows = [
            ("Model dir:", config.model_dir().display().to_string()),
            ("Model:", config.model.name.clone()),
            ("Target images:", config.target_dir().display().to_string()),
            ("Prompts:", config.prompt_dir().display().to_string()),
            ("Batches:", config.output_base_dir().display().to_string()),
            (
                "Charts:",
                if config.charts.enabled {
                    format!(
                        "{} / {} at {}x{} in",
                        config.charts.summary_kind,
                        config.charts.single_kind,
                        config.charts.figure_width,
                        config.charts.figure_height
                    )
                } else {
                    "disabled".to_string()
                },
            ),
            ("Log level:", config.logging.level.clone()),
        ];
        for (name, value) in &rows {
            eprintln!("    {:<20} {}", label.apply_to(name), value);
        }
        eprintln!();

        let items = &["View full config (TOML)", "Show config file path", "Back"];

        let selection = Select::with_theme(&theme)
            .with_prompt("Configuration")
            .items(items)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => match config.to_toml() {
                Ok(toml) => {
                    eprintln!();
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!("{toml}");
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!();
                }
                Err(e) => {
                    let err = Style::new().for_stderr().red();
                    eprintln!("  {} Failed to serialize config: {e}", err.apply_to("✗"));
                    eprintln!();
                }
            },
            Some(1) => {
                eprintln!();
                eprintln!("  {}", config_path.display());
                eprintln!();
            }
            _ => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_is_not_an_error() {
        let interrupted: dialoguer::Result<String> = Err(dialoguer::Error::IO(
            std::io::Error::new(std::io::ErrorKind::Interrupted, "ctrl-c"),
        ));
        assert!(handle_interrupt(interrupted).unwrap().is_none());

        let answered: dialoguer::Result<String> = Ok("yes".to_string());
        assert_eq!(handle_interrupt(answered).unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn other_io_errors_propagate() {
        let broken: dialoguer::Result<String> = Err(dialoguer::Error::IO(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        )));
        assert!(handle_interrupt(broken).is_err());
    }
}
