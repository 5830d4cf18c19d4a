//! Chart rendering for the numeric series.
//!
//! The renderer is a thin collaborator: it draws bars, a trend line and
//! markers as a standalone SVG. Output is a pure function of the series and
//! the style, so the file name can carry a content hash.

use crate::config::PipelineConfig;
use crate::hash::sha256_hex;
use crate::record::NumericSeries;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const MARGIN_X: f64 = 60.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 50.0;

/// Chart errors.
#[derive(Error, Debug)]
pub enum ChartError {
    /// The series violates its length or finiteness invariant.
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Writing the artifact failed.
    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    /// File name, `chart-<hash>.svg`.
    pub file_name: String,
    /// Encoded image.
    pub content: Vec<u8>,
    /// URL path the site serves the file under.
    pub public_path: String,
}

impl ChartArtifact {
    /// Writes the artifact into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ChartError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)?;
        debug!(path = %path.display(), bytes = self.content.len(), "Wrote chart");
        Ok(path)
    }
}

/// Turns a series into an image artifact.
pub trait ChartRenderer: Send + Sync {
    /// Renders `series`.
    fn render(&self, series: &NumericSeries) -> Result<ChartArtifact, ChartError>;
}

/// Deterministic SVG bar-and-line chart.
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    bar_color: String,
    line_color: String,
    url_prefix: String,
}

impl SvgChartRenderer {
    /// Creates a renderer with explicit colors and URL prefix.
    pub fn new(bar_color: &str, line_color: &str, url_prefix: &str) -> Self {
        Self {
            bar_color: bar_color.to_string(),
            line_color: line_color.to_string(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Creates a renderer from the configured style and image prefix.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.style.primary_color, &config.style.line_color, &config.site.image_url_prefix)
    }

    fn draw(&self, series: &NumericSeries) -> String {
        let (lo, hi) = series.bounds();
        let mut floor = lo.min(0.0);
        let mut ceil = hi.max(0.0);
        if (ceil - floor).abs() < f64::EPSILON {
            // Flat series at zero; give the axis some height.
            floor -= 1.0;
            ceil += 1.0;
        }
        let ceil = ceil + (ceil - floor) * 0.1;

        let plot_w = WIDTH - 2.0 * MARGIN_X;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let slot = plot_w / series.values.len() as f64;
        let bar_w = slot * 0.6;
        let y_of = |v: f64| MARGIN_TOP + (ceil - v) / (ceil - floor) * plot_h;
        let baseline = y_of(0.0);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="32" font-size="20" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape(&series.caption)
        );
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_X}" y1="{baseline:.1}" x2="{:.1}" y2="{baseline:.1}" stroke="#999"/>"##,
            WIDTH - MARGIN_X
        );

        let mut points = Vec::with_capacity(series.values.len());
        for (i, (label, value)) in series.labels.iter().zip(&series.values).enumerate() {
            let center = MARGIN_X + slot * (i as f64 + 0.5);
            let top = y_of(*value);
            let (y, h) = if top < baseline { (top, baseline - top) } else { (baseline, top - baseline) };
            let _ = writeln!(
                svg,
                r#"<rect x="{:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{}" fill-opacity="0.7"/>"#,
                center - bar_w / 2.0,
                self.bar_color
            );
            let _ = writeln!(
                svg,
                r#"<text x="{center:.1}" y="{:.1}" font-size="14" text-anchor="middle">{}</text>"#,
                HEIGHT - MARGIN_BOTTOM + 24.0,
                escape(label)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{center:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}{}</text>"#,
                top - 12.0,
                format_value(*value),
                escape(&series.unit)
            );
            points.push((center, top));
        }

        let polyline: Vec<String> = points.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
        let _ = writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            polyline.join(" "),
            self.line_color
        );
        for (x, y) in &points {
            let _ = writeln!(svg, r#"<circle cx="{x:.1}" cy="{y:.1}" r="5" fill="{}"/>"#, self.line_color);
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, series: &NumericSeries) -> Result<ChartArtifact, ChartError> {
        if !series.is_valid() {
            return Err(ChartError::InvalidSeries(format!(
                "{} labels, {} values",
                series.labels.len(),
                series.values.len()
            )));
        }

        let content = self.draw(series).into_bytes();
        let digest = sha256_hex(&content);
        let file_name = format!("chart-{}.svg", &digest[..12]);
        let public_path = format!("{}/{}", self.url_prefix, file_name);

        Ok(ChartArtifact { file_name, content, public_path })
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
