//! clipscore CLI - score a folder of images against a text prompt with CLIP.
//!
//! Every run writes its outputs to a fresh `Batch_<n>` folder: a re-encoded
//! copy of each scored image, `results.csv` / `results.json`, and charts.
//!
//! # Usage
//!
//! ```bash
//! # Score ./target_images against the first prompt in ./prompts
//! clipscore score
//!
//! # Pick the model and chart styles explicitly
//! clipscore score --model ViT-B/16 --summary-chart bar --single-color '#ff7f0e'
//!
//! # Manage the model cache
//! clipscore models download --all
//! clipscore models verify
//!
//! # Guided mode
//! clipscore
//! ```

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// clipscore - batch CLIP scoring with per-run output folders.
#[derive(Parser, Debug)]
#[command(name = "clipscore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Subcommand; omit on a terminal for guided mode
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Score images against a prompt and write results and charts
    Score(cli::score::ScoreArgs),

    /// Manage cached model artifacts (download, verify, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match clipscore_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `clipscore config path`."
            );
            clipscore_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("clipscore v{}", clipscore_core::VERSION);

    let result = match cli.command {
        Some(Commands::Score(args)) => cli::score::execute(args).await,
        Some(Commands::Models(args)) => {
            cli::models::execute(args).await.map(|()| ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => {
            cli::config::execute(args).await.map(|()| ExitCode::SUCCESS)
        }
        None if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() => {
            cli::interactive::run(&config).await.map(|()| ExitCode::SUCCESS)
        }
        None => Err(anyhow::anyhow!(
            "No command given. Run `clipscore --help` for usage."
        )),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
