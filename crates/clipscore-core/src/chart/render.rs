//! Bitmap rendering with plotters.
//!
//! Captions and axis labels use the DejaVu Sans face bundled under
//! `assets/`, registered with plotters' `ab_glyph` backend on first use.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use super::{y_range, ChartKind, ChartOptions, HexColor, SUMMARY_FILE_NAME};
use crate::error::{PipelineError, PipelineResult};
use crate::types::ScoreRecord;

type DrawResult = Result<(), Box<dyn Error>>;

static CHART_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Register the bundled face as "sans-serif" once per process.
fn ensure_font() -> Result<(), &'static str> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, CHART_FONT).is_ok());
    if ok {
        Ok(())
    } else {
        Err("bundled chart font could not be parsed")
    }
}

/// What a batch chart run produced.
#[derive(Debug, Default)]
pub struct ChartOutcome {
    pub written: Vec<PathBuf>,
    pub errors: Vec<PipelineError>,
}

/// Render the summary chart and one chart per record.
///
/// A failed chart is recorded and the rest are still drawn.
pub fn render_batch(
    records: &[ScoreRecord],
    options: &ChartOptions,
    charts_dir: &Path,
    images_chart_dir: &Path,
) -> ChartOutcome {
    let mut outcome = ChartOutcome::default();
    let Some(range) = y_range(records) else {
        tracing::info!("No scores to chart");
        return outcome;
    };

    let mut push = |result: PipelineResult<Option<PathBuf>>| match result {
        Ok(Some(path)) => outcome.written.push(path),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("{e}");
            outcome.errors.push(e);
        }
    };

    push(render_summary(records, options, charts_dir));
    for record in records {
        push(render_single(record, range, options, images_chart_dir).map(Some));
    }

    outcome
}

/// Write `charts/clip_scores_summary.png`. Renders nothing for no records.
pub fn render_summary(
    records: &[ScoreRecord],
    options: &ChartOptions,
    charts_dir: &Path,
) -> PipelineResult<Option<PathBuf>> {
    let Some(range) = y_range(records) else {
        return Ok(None);
    };

    let path = charts_dir.join(SUMMARY_FILE_NAME);
    let points: Vec<(f32, f32)> = records
        .iter()
        .map(|r| (r.image_index as f32, r.clip_score))
        .collect();

    draw(
        &path,
        options,
        "CLIP Scores",
        options.summary_kind,
        options.summary_color,
        &points,
        range,
    )
    .map_err(|e| output_error(&path, e))?;

    tracing::debug!("Wrote summary chart {:?}", path);
    Ok(Some(path))
}

/// Write `images_chart/Target_<index>_chart.png` on the shared `y_range`.
pub fn render_single(
    record: &ScoreRecord,
    y_range: (f32, f32),
    options: &ChartOptions,
    images_chart_dir: &Path,
) -> PipelineResult<PathBuf> {
    let label = record.label();
    let path = images_chart_dir.join(format!("{label}_chart.png"));

    draw(
        &path,
        options,
        &format!("CLIP Score for {label}"),
        options.single_kind,
        options.single_color,
        &[(record.image_index as f32, record.clip_score)],
        y_range,
    )
    .map_err(|e| output_error(&path, e))?;

    Ok(path)
}

fn output_error(path: &Path, e: Box<dyn Error>) -> PipelineError {
    PipelineError::Output {
        path: path.to_path_buf(),
        message: format!("Chart rendering failed: {e}"),
    }
}

/// Axis label for an x position; only whole-numbered positions with a
/// record get a name.
fn x_label_for(x: f32, indices: &[usize]) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-3 || rounded < 1.0 {
        return String::new();
    }
    let index = rounded as usize;
    if indices.contains(&index) {
        format!("Target_{index}")
    } else {
        String::new()
    }
}

/// Blue to red by position of `score` within `[lo, hi]`.
fn heat_color(score: f32, (lo, hi): (f32, f32)) -> RGBColor {
    let t = if hi > lo {
        ((score - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    RGBColor(lerp(59, 180), lerp(76, 4), lerp(192, 38))
}

fn draw(
    path: &Path,
    options: &ChartOptions,
    caption: &str,
    kind: ChartKind,
    color: HexColor,
    points: &[(f32, f32)],
    (y_lo, y_hi): (f32, f32),
) -> DrawResult {
    ensure_font()?;
    let color = RGBColor(color.r, color.g, color.b);
    let root = BitMapBackend::new(path, options.figure.pixels()).into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let x_max = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let indices: Vec<usize> = points.iter().map(|p| p.0 as usize).collect();

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(caption, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((x_min - 1.0)..(x_max + 1.0), y_lo..y_hi)?;

    let label_fmt = |x: &f32| x_label_for(*x, &indices);
    chart
        .configure_mesh()
        .x_labels(points.len() + 2)
        .x_label_formatter(&label_fmt)
        .x_desc(options.x_label.as_str())
        .y_desc(options.y_label.as_str())
        .draw()?;

    match kind {
        ChartKind::Line => {
            chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
        }
        ChartKind::Bar => {
            chart.draw_series(points.iter().map(|&(x, y)| {
                Rectangle::new([(x - 0.4, y_lo), (x + 0.4, y)], color.filled())
            }))?;
        }
        ChartKind::Dot => {
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
        }
        ChartKind::Scatter => {
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 7, color.stroke_width(2))))?;
        }
        ChartKind::Box => {
            let values: Vec<f32> = points.iter().map(|p| p.1).collect();
            let quartiles = Quartiles::new(&values);
            let center = (x_min + x_max) / 2.0;
            chart.draw_series(std::iter::once(
                Boxplot::new_vertical(center, &quartiles)
                    .style(color.stroke_width(2))
                    .width(40),
            ))?;
        }
        ChartKind::Area => {
            chart.draw_series(
                AreaSeries::new(points.iter().copied(), y_lo, color.mix(0.3))
                    .border_style(color.stroke_width(2)),
            )?;
        }
        ChartKind::Heatmap => {
            chart.draw_series(points.iter().map(|&(x, y)| {
                Rectangle::new(
                    [(x - 0.5, y_lo), (x + 0.5, y_hi)],
                    heat_color(y, (y_lo, y_hi)).filled(),
                )
            }))?;
            chart.draw_series(points.iter().map(|&p| Cross::new(p, 5, BLACK.stroke_width(2))))?;
        }
    }

    root.present()?;
    Ok(())
}
