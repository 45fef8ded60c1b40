//! The `clipscore score` command: one full batch run.
//!
//! Picks a prompt, makes sure the model is cached, scores every image in the
//! target directory into a fresh `Batch_<n>` folder, then writes results and
//! charts.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Args;
use console::Style;

use clipscore_core::artifact::select_model_for_memory;
use clipscore_core::chart::{
    render_batch, warn_if_defaulted, ChartKind, ChartOptions, FigureSize, HexColor,
};
use clipscore_core::output::write_results;
use clipscore_core::pipeline::{choose_prompt_file, list_prompt_files, read_prompt};
use clipscore_core::{
    allocate_next_batch, ArtifactCache, BatchLayout, BatchScorer, ClipModel, Config,
    NotFoundError, ScoreReport,
};

/// Exit code when `--fail-on-errors` is set and something non-fatal failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Arguments for the `score` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ScoreArgs {
    /// Folder of images to score (overrides config)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Folder of prompt .txt files (overrides config)
    #[arg(long, value_name = "DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Which prompt file to use, 1-based in name order (default: first)
    #[arg(long, value_name = "N")]
    pub prompt_file: Option<String>,

    /// Model name from the registry, e.g. ViT-B/32
    #[arg(short, long)]
    pub model: Option<String>,

    /// GPU memory budget in MB; picks the largest model that fits
    #[arg(long, value_name = "MB", conflicts_with = "model")]
    pub memory_mb: Option<u64>,

    /// Base folder for batch outputs (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Summary chart kind: number 1-7 or name (line, bar, dot, scatter, box, area, heatmap)
    #[arg(long, value_name = "KIND")]
    pub summary_chart: Option<String>,

    /// Summary chart color as #rrggbb
    #[arg(long, value_name = "HEX")]
    pub summary_color: Option<String>,

    /// Per-image chart kind: number 1-7 or name
    #[arg(long, value_name = "KIND")]
    pub single_chart: Option<String>,

    /// Per-image chart color as #rrggbb
    #[arg(long, value_name = "HEX")]
    pub single_color: Option<String>,

    /// Figure size in inches as "width,height"
    #[arg(long, value_name = "W,H")]
    pub figure_size: Option<String>,

    /// Summary chart x-axis label
    #[arg(long)]
    pub x_label: Option<String>,

    /// Summary chart y-axis label
    #[arg(long)]
    pub y_label: Option<String>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Choose chart kinds and colors with prompts
    #[arg(long, conflicts_with = "no_charts")]
    pub interactive_charts: bool,

    /// Exit with code 2 if any image, chart or integrity check failed
    #[arg(long)]
    pub fail_on_errors: bool,

    /// Chart options already chosen by guided mode
    #[arg(skip)]
    pub chart_options: Option<ChartOptions>,
}

impl ScoreArgs {
    /// Apply directory overrides to the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref dir) = self.target_dir {
            config.input.target_dir = dir.clone();
        }
        if let Some(ref dir) = self.prompt_dir {
            config.input.prompt_dir = dir.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output.base_dir = dir.clone();
        }
    }

    /// Model to score with: `--model`, then `--memory-mb`, then config.
    pub fn model_name(&self, config: &Config) -> String {
        if let Some(ref name) = self.model {
            return name.clone();
        }
        if let Some(mb) = self.memory_mb {
            let name = select_model_for_memory(Some(mb));
            tracing::info!("Selected {name} for a {mb} MB memory budget");
            return name.to_string();
        }
        config.model.name.clone()
    }

    pub fn charts_enabled(&self, config: &Config) -> bool {
        !self.no_charts && config.charts.enabled
    }

    /// Chart options from config with any chart flags laid over them.
    ///
    /// An invalid flag value falls back to the default with a warning.
    pub fn resolve_chart_options(&self, config: &Config) -> ChartOptions {
        let mut options = ChartOptions::from_config(&config.charts);

        if let Some(ref raw) = self.summary_chart {
            options.summary_kind =
                warn_if_defaulted("summary_kind", raw, ChartKind::parse_or_default(raw));
        }
        if let Some(ref raw) = self.summary_color {
            options.summary_color =
                warn_if_defaulted("summary_color", raw, HexColor::parse_or_default(raw));
        }
        if let Some(ref raw) = self.single_chart {
            options.single_kind =
                warn_if_defaulted("single_kind", raw, ChartKind::parse_or_default(raw));
        }
        if let Some(ref raw) = self.single_color {
            options.single_color =
                warn_if_defaulted("single_color", raw, HexColor::parse_or_default(raw));
        }
        if let Some(ref raw) = self.figure_size {
            options.figure =
                warn_if_defaulted("figure_size", raw, FigureSize::parse_or_default(raw));
        }
        if let Some(ref label) = self.x_label {
            options.x_label = label.clone();
        }
        if let Some(ref label) = self.y_label {
            options.y_label = label.clone();
        }

        options
    }
}

/// Execute the score command.
pub async fn execute(args: ScoreArgs) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    let mut config = Config::load()?;
    args.apply_overrides(&mut config);

    // Prompt
    let prompt_files = list_prompt_files(&config.prompt_dir())?;
    let prompt_path = choose_prompt_file(&prompt_files, args.prompt_file.as_deref())
        .ok_or_else(|| NotFoundError::NoPromptFiles(config.prompt_dir()))?;
    let prompt = read_prompt(prompt_path)?;
    tracing::info!("Prompt ({}): {prompt}", prompt_path.display());

    // Target images, checked before a batch folder is claimed
    let scorer = BatchScorer::new(&config);
    let files = scorer.discover(&config.target_dir())?;
    if files.is_empty() {
        tracing::warn!(
            "No supported images in {}; the batch will be empty",
            config.target_dir().display()
        );
    } else {
        tracing::info!("Found {} image(s) to score", files.len());
    }

    // Model
    let model_name = args.model_name(&config);
    let cache = ArtifactCache::from_config(&config);
    let model_files = cache.ensure_model(&model_name).await?;
    let model_verified = cache.verify(&model_name)?;
    let model = ClipModel::load(&model_files)?;

    // Chart choices are made before the long scoring run
    let chart_options = if !args.charts_enabled(&config) {
        None
    } else if let Some(ref options) = args.chart_options {
        Some(options.clone())
    } else if args.interactive_charts {
        let defaults = args.resolve_chart_options(&config);
        match super::interactive::charts::select_chart_options(&defaults)? {
            Some(options) => Some(options),
            None => return Ok(ExitCode::SUCCESS),
        }
    } else {
        Some(args.resolve_chart_options(&config))
    };

    // Batch
    let batch_dir = allocate_next_batch(&config.output_base_dir())?;
    let layout = BatchLayout::create(&batch_dir)?;
    tracing::info!("Writing to {}", batch_dir.display());

    let progress = create_progress_bar(files.len() as u64);
    let report = scorer
        .score_files(
            &model,
            &prompt,
            &files,
            &layout.scored_images,
            |file, outcome| {
                match outcome {
                    Ok(record) => progress.set_message(format!(
                        "{} = {:.4}",
                        record.image_name, record.clip_score
                    )),
                    Err(_) => progress.set_message(format!("failed: {}", file.file_name())),
                }
                progress.inc(1);
            },
        )
        .await?;
    progress.finish_and_clear();

    let results = write_results(&report.records, &layout.results)?;
    tracing::info!("Results written to {}", results.csv.display());

    let chart_errors = match chart_options {
        Some(ref options) => {
            let outcome = render_batch(
                &report.records,
                options,
                &layout.charts,
                &layout.images_chart,
            );
            tracing::info!("Rendered {} chart(s)", outcome.written.len());
            outcome.errors.len()
        }
        None => {
            tracing::info!("Chart rendering disabled");
            0
        }
    };

    print_summary(
        &layout.name(),
        model_files.name.as_str(),
        &report,
        chart_errors,
        start.elapsed(),
    );

    let degraded = report.has_failures() || chart_errors > 0 || !model_verified;
    Ok(exit_code(args.fail_on_errors, degraded))
}

/// Exit code for a finished run.
pub fn exit_code(fail_on_errors: bool, degraded: bool) -> ExitCode {
    if fail_on_errors && degraded {
        ExitCode::from(EXIT_PARTIAL_FAILURE)
    } else {
        ExitCode::SUCCESS
    }
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("scoring...");
    pb
}

fn print_summary(
    batch: &str,
    model: &str,
    report: &ScoreReport,
    chart_errors: usize,
    elapsed: Duration,
) {
    let red = Style::new().for_stderr().red();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        report.total() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Batch:        {:>8}", batch);
    eprintln!("    Model:        {:>8}", model);
    eprintln!("    Scored:       {:>8}", report.succeeded());
    if report.has_failures() {
        eprintln!(
            "    {}",
            red.apply_to(format!("Failed:       {:>8}", report.failed()))
        );
    }
    if chart_errors > 0 {
        eprintln!(
            "    {}",
            red.apply_to(format!("Chart errors: {:>8}", chart_errors))
        );
    }
    if let (Some((lo, hi)), Some(mean)) = (report.score_range(), report.mean_score()) {
        eprintln!("  ------------------------------------");
        eprintln!("    Min score:    {:>8.4}", lo);
        eprintln!("    Max score:    {:>8.4}", hi);
        eprintln!("    Mean score:   {:>8.4}", mean);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", report.total());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");

    for failure in &report.failures {
        eprintln!("    {} {}: {}", red.apply_to("✗"), failure.file_name, failure.message);
    }
}
