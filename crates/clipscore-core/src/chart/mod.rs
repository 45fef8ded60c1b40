//! Chart options and rendering.
//!
//! Every option is parsed by a pure function that falls back to a default on
//! bad input and reports that it did, so the caller decides how to warn.
//! The interactive menu and the `score` flags both just produce a
//! [`ChartOptions`].

mod render;

use std::fmt;

use crate::config::ChartsConfig;
use crate::types::ScoreRecord;

pub use render::{render_batch, render_single, render_summary, ChartOutcome};

/// File name of the batch summary chart inside `charts/`.
pub const SUMMARY_FILE_NAME: &str = "clip_scores_summary.png";

/// Padding added above and below the score range on every chart.
pub const Y_PADDING: f32 = 0.01;

/// A parsed value plus whether it came from the default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Parsed<T> {
    fn given(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}

/// How a set of scores is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Dot,
    Scatter,
    Box,
    Area,
    Heatmap,
}

impl ChartKind {
    /// Menu order; position + 1 is the menu number.
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Dot,
        ChartKind::Scatter,
        ChartKind::Box,
        ChartKind::Area,
        ChartKind::Heatmap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Dot => "dot",
            ChartKind::Scatter => "scatter",
            ChartKind::Box => "box",
            ChartKind::Area => "area",
            ChartKind::Heatmap => "heatmap",
        }
    }

    /// Parse a 1-based menu number or a case-insensitive name.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(n) = input.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied();
        }
        Self::ALL
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(input))
            .copied()
    }

    pub fn parse_or_default(input: &str) -> Parsed<Self> {
        match Self::parse(input) {
            Some(kind) => Parsed::given(kind),
            None => Parsed::fallback(Self::default()),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An opaque RGB color written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    /// `#1f77b4`
    pub const DEFAULT: HexColor = HexColor {
        r: 0x1f,
        g: 0x77,
        b: 0xb4,
    };

    /// Parse `#` followed by exactly six hex digits.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn parse_or_default(input: &str) -> Parsed<Self> {
        match Self::parse(input) {
            Some(color) => Parsed::given(color),
            None => Parsed::fallback(Self::DEFAULT),
        }
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Figure size in inches; rendered at 100 pixels per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureSize {
    pub width: u32,
    pub height: u32,
}

impl FigureSize {
    pub const DEFAULT: FigureSize = FigureSize {
        width: 12,
        height: 6,
    };

    const MAX: u32 = 100;
    const DPI: u32 = 100;

    fn in_range(v: u32) -> bool {
        (1..=Self::MAX).contains(&v)
    }

    /// Build from explicit dimensions, each in `1..=100`.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (Self::in_range(width) && Self::in_range(height)).then_some(Self { width, height })
    }

    /// Parse `"w,h"`.
    pub fn parse(input: &str) -> Option<Self> {
        let (w, h) = input.split_once(',')?;
        Self::new(w.trim().parse().ok()?, h.trim().parse().ok()?)
    }

    pub fn parse_or_default(input: &str) -> Parsed<Self> {
        match Self::parse(input) {
            Some(size) => Parsed::given(size),
            None => Parsed::fallback(Self::DEFAULT),
        }
    }

    /// Bitmap size in pixels.
    pub fn pixels(&self) -> (u32, u32) {
        (self.width * Self::DPI, self.height * Self::DPI)
    }
}

impl Default for FigureSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FigureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

/// Everything needed to draw one batch's charts.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub summary_kind: ChartKind,
    pub summary_color: HexColor,
    pub single_kind: ChartKind,
    pub single_color: HexColor,
    pub figure: FigureSize,
    pub x_label: String,
    pub y_label: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            summary_kind: ChartKind::Line,
            summary_color: HexColor::DEFAULT,
            single_kind: ChartKind::Line,
            single_color: HexColor::DEFAULT,
            figure: FigureSize::DEFAULT,
            x_label: "Images".to_string(),
            y_label: "CLIP Scores".to_string(),
        }
    }
}

impl ChartOptions {
    /// Build from the `[charts]` section, warning on each defaulted field.
    pub fn from_config(config: &ChartsConfig) -> Self {
        let summary_kind = warn_if_defaulted(
            "summary_kind",
            &config.summary_kind,
            ChartKind::parse_or_default(&config.summary_kind),
        );
        let summary_color = warn_if_defaulted(
            "summary_color",
            &config.summary_color,
            HexColor::parse_or_default(&config.summary_color),
        );
        let single_kind = warn_if_defaulted(
            "single_kind",
            &config.single_kind,
            ChartKind::parse_or_default(&config.single_kind),
        );
        let single_color = warn_if_defaulted(
            "single_color",
            &config.single_color,
            HexColor::parse_or_default(&config.single_color),
        );
        let figure = match FigureSize::new(config.figure_width, config.figure_height) {
            Some(size) => size,
            None => {
                tracing::warn!(
                    "Invalid figure size {}x{}, using {}",
                    config.figure_width,
                    config.figure_height,
                    FigureSize::DEFAULT
                );
                FigureSize::DEFAULT
            }
        };

        Self {
            summary_kind,
            summary_color,
            single_kind,
            single_color,
            figure,
            x_label: config.x_label.clone(),
            y_label: config.y_label.clone(),
        }
    }
}

/// Unwrap a parsed chart setting, warning when it fell back to the default.
pub fn warn_if_defaulted<T: fmt::Display>(field: &str, input: &str, parsed: Parsed<T>) -> T {
    if parsed.defaulted {
        tracing::warn!("Invalid chart {field} '{input}', using {}", parsed.value);
    }
    parsed.value
}

/// Shared y-axis range for a set of records, padded by [`Y_PADDING`].
pub fn y_range(records: &[ScoreRecord]) -> Option<(f32, f32)> {
    let mut scores = records.iter().map(|r| r.clip_score);
    let first = scores.next()?;
    let (lo, hi) = scores.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
    Some((lo - Y_PADDING, hi + Y_PADDING))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_kind_from_number_or_name() {
        assert_eq!(ChartKind::parse("1"), Some(ChartKind::Line));
        assert_eq!(ChartKind::parse("5"), Some(ChartKind::Box));
        assert_eq!(ChartKind::parse("7"), Some(ChartKind::Heatmap));
        assert_eq!(ChartKind::parse("Scatter"), Some(ChartKind::Scatter));
        assert_eq!(ChartKind::parse(" bar "), Some(ChartKind::Bar));
        assert_eq!(ChartKind::parse("0"), None);
        assert_eq!(ChartKind::parse("8"), None);
        assert_eq!(ChartKind::parse("violin"), None);
    }

    #[test]
    fn test_chart_kind_defaults_with_flag() {
        assert_eq!(
            ChartKind::parse_or_default("pie"),
            Parsed {
                value: ChartKind::Line,
                defaulted: true
            }
        );
        assert!(!ChartKind::parse_or_default("area").defaulted);
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(
            HexColor::parse("#FF8000"),
            Some(HexColor {
                r: 255,
                g: 128,
                b: 0
            })
        );
        assert_eq!(HexColor::parse("ff8000"), None);
        assert_eq!(HexColor::parse("#ff80"), None);
        assert_eq!(HexColor::parse("#gg0000"), None);
        assert_eq!(HexColor::parse("#ff80001"), None);

        let parsed = HexColor::parse_or_default("red");
        assert!(parsed.defaulted);
        assert_eq!(parsed.value.to_string(), "#1f77b4");
    }

    #[test]
    fn test_figure_size() {
        assert_eq!(FigureSize::parse("10, 5"), Some(FigureSize { width: 10, height: 5 }));
        assert_eq!(FigureSize::parse("0,5"), None);
        assert_eq!(FigureSize::parse("101,5"), None);
        assert_eq!(FigureSize::parse("10x5"), None);
        assert_eq!(FigureSize::parse("a,b"), None);

        let parsed = FigureSize::parse_or_default("");
        assert!(parsed.defaulted);
        assert_eq!(parsed.value.pixels(), (1200, 600));
    }

    #[test]
    fn test_from_config_defaults_bad_fields() {
        let config = ChartsConfig {
            summary_kind: "bar".to_string(),
            summary_color: "blue".to_string(),
            figure_width: 0,
            ..ChartsConfig::default()
        };

        let options = ChartOptions::from_config(&config);
        assert_eq!(options.summary_kind, ChartKind::Bar);
        assert_eq!(options.summary_color, HexColor::DEFAULT);
        assert_eq!(options.figure, FigureSize::DEFAULT);
        assert_eq!(options.y_label, "CLIP Scores");
    }

    #[test]
    fn test_y_range_is_padded() {
        let records: Vec<ScoreRecord> = [0.2_f32, 0.3, 0.25]
            .iter()
            .enumerate()
            .map(|(i, s)| ScoreRecord {
                image_index: i + 1,
                image_name: format!("{i}.png"),
                clip_score: *s,
                scored_image_path: crate::types::scored_file_name(*s),
            })
            .collect();

        let (lo, hi) = y_range(&records).unwrap();
        assert!((lo - 0.19).abs() < 1e-6);
        assert!((hi - 0.31).abs() < 1e-6);
        assert_eq!(y_range(&[]), None);
    }
}
