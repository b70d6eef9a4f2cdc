// SPDX-License-Identifier: MIT OR Apache-2.0

//! Radar-chart rendering of scan results.
//!
//! [`BiasVisualizer`] draws one spoke per profession, the score polygon,
//! and a dashed neutral circle at 0.5 onto a 3000×3000 PNG (a 10-inch
//! figure at 300 DPI) with `plotters`' bitmap backend.

mod font;
mod geometry;

use std::path::Path;

use plotters::element::DashedPathElement;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::{BiasError, Result};
use crate::scanner::ScanResults;

pub use self::font::FONT_ENV;
pub use self::geometry::{PlotArea, spoke_angles};

/// Bitmap side length in pixels.
pub const CHART_SIZE: u32 = 3000;

/// Score polygon color (`#2E86AB`).
pub const SCORE_COLOR: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
/// Neutral baseline color (`#06A77D`).
pub const NEUTRAL_COLOR: RGBColor = RGBColor(0x06, 0xA7, 0x7D);
/// Grid and spoke color.
const GRID_COLOR: RGBColor = RGBColor(0xB0, 0xB0, 0xB0);

/// Radii of the dashed grid circles.
const GRID_LEVELS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];
/// Radius of the neutral baseline.
const NEUTRAL_LEVEL: f64 = 0.5;
/// Opacity of the polygon fill.
const FILL_OPACITY: f64 = 0.25;

const TITLE: &str = "Gender Bias Radar Chart";
const SUBTITLE: &str = "(1.0 = Male bias, 0.0 = Female bias)";

// Pixel sizes at 300 DPI.
const LINE_WIDTH: u32 = 6;
const GRID_WIDTH: u32 = 3;
const MARKER_RADIUS: i32 = 16;
const TITLE_SIZE: f64 = 80.0;
const SUBTITLE_SIZE: f64 = 54.0;
const LABEL_SIZE: f64 = 60.0;
const TICK_SIZE: f64 = 42.0;
const LEGEND_SIZE: f64 = 48.0;
const CIRCLE_SEGMENTS: usize = 360;
/// Dash and gap length of the grid circles.
const GRID_DASH: (u32, u32) = (24, 16);
/// Dash and gap length of the neutral baseline and its legend swatch.
const NEUTRAL_DASH: (u32, u32) = (40, 24);

/// Renders profession scores as a radar chart.
///
/// # Example
///
/// ```no_run
/// use bias_radar::{BiasVisualizer, ScanResults};
///
/// # fn main() -> bias_radar::Result<()> {
/// let results: ScanResults = [("doctor", 0.85), ("nurse", 0.10)].into_iter().collect();
/// BiasVisualizer::new(&results).render("bias_report.png")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BiasVisualizer {
    /// Spoke labels, in mapping order.
    professions: Vec<String>,
    /// Scores, parallel to `professions`.
    scores: Vec<f64>,
}

impl BiasVisualizer {
    /// Capture the professions and scores of `results` in order.
    #[must_use]
    pub fn new(results: &ScanResults) -> Self {
        Self {
            professions: results.professions(),
            scores: results.scores(),
        }
    }

    /// Profession names, in spoke order.
    #[must_use]
    pub fn professions(&self) -> &[String] {
        &self.professions
    }

    /// Scores, parallel to [`professions()`](Self::professions).
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Spoke angles in radians, clockwise from 12 o'clock.
    #[must_use]
    pub fn angles(&self) -> Vec<f64> {
        spoke_angles(self.professions.len())
    }

    /// Pixel region of the polar axes.
    #[must_use]
    pub fn plot_area() -> PlotArea {
        let size = f64::from(CHART_SIZE);
        PlotArea {
            center: (size / 2.0, size * 0.53),
            radius: size * 0.34,
        }
    }

    /// Draw the chart and write it as a PNG to `output_path`.
    ///
    /// Text is drawn only if a TrueType font could be found; the geometry
    /// is written either way.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Render`] if drawing fails or the file cannot be
    /// written.
    pub fn render(&self, output_path: impl AsRef<Path>) -> Result<()> {
        let output_path = output_path.as_ref();
        let root = BitMapBackend::new(output_path, (CHART_SIZE, CHART_SIZE)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let area = Self::plot_area();
        let angles = self.angles();

        // --- Grid ---
        for level in GRID_LEVELS {
            root.draw(&DashedPathElement::new(
                area.circle(level, CIRCLE_SEGMENTS),
                GRID_DASH.0,
                GRID_DASH.1,
                GRID_COLOR.stroke_width(GRID_WIDTH),
            ))
            .map_err(render_err)?;
        }
        for &angle in &angles {
            root.draw(&PathElement::new(
                vec![area.polar_to_pixel(angle, 0.0), area.polar_to_pixel(angle, 1.0)],
                GRID_COLOR.stroke_width(GRID_WIDTH),
            ))
            .map_err(render_err)?;
        }

        // --- Scores ---
        let mut outline: Vec<(i32, i32)> = angles
            .iter()
            .zip(&self.scores)
            .map(|(&angle, &score)| area.polar_to_pixel(angle, score.clamp(0.0, 1.0)))
            .collect();
        if outline.len() >= 3 {
            root.draw(&Polygon::new(
                outline.clone(),
                SCORE_COLOR.mix(FILL_OPACITY).filled(),
            ))
            .map_err(render_err)?;
        }
        if let Some(&first) = outline.first() {
            outline.push(first);
            root.draw(&PathElement::new(
                outline.clone(),
                SCORE_COLOR.stroke_width(LINE_WIDTH),
            ))
            .map_err(render_err)?;
            for &point in &outline {
                root.draw(&Circle::new(point, MARKER_RADIUS, SCORE_COLOR.filled()))
                    .map_err(render_err)?;
            }
        }

        // --- Neutral baseline ---
        root.draw(&DashedPathElement::new(
            area.circle(NEUTRAL_LEVEL, CIRCLE_SEGMENTS),
            NEUTRAL_DASH.0,
            NEUTRAL_DASH.1,
            NEUTRAL_COLOR.stroke_width(LINE_WIDTH),
        ))
        .map_err(render_err)?;

        // --- Text ---
        if font::ensure_font().is_some() {
            self.draw_text(&root, &area, &angles)?;
        }

        root.present().map_err(|e| {
            BiasError::Render(format!("write {}: {e}", output_path.display()))
        })?;
        tracing::info!(path = %output_path.display(), spokes = angles.len(), "radar chart written");
        Ok(())
    }

    /// Spoke labels, radial ticks, legend, and title.
    fn draw_text<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        area: &PlotArea,
        angles: &[f64],
    ) -> Result<()> {
        let centered = Pos::new(HPos::Center, VPos::Center);
        let size = f64::from(CHART_SIZE);
        let half = size / 2.0;

        // Spoke labels just outside the outer circle.
        for (profession, &angle) in self.professions.iter().zip(angles) {
            let at = area.polar_to_pixel(angle, 1.12);
            root.draw(&Text::new(profession.as_str(), at, text_style(LABEL_SIZE).pos(centered)))
                .map_err(render_err)?;
        }

        // Radial ticks along a fixed bearing between the first two spokes.
        let tick_angle = std::f64::consts::PI / 8.0;
        for level in GRID_LEVELS {
            let at = area.polar_to_pixel(tick_angle, level);
            let label = format!("{level}");
            root.draw(&Text::new(
                label,
                at,
                text_style(TICK_SIZE)
                    .color(&RGBColor(0x60, 0x60, 0x60))
                    .pos(Pos::new(HPos::Left, VPos::Bottom)),
            ))
            .map_err(render_err)?;
        }

        // Legend in the upper right.
        let x0 = pixel(size * 0.74);
        let y0 = pixel(size * 0.09);
        let x1 = pixel(size * 0.98);
        let y1 = pixel(size * 0.17);
        root.draw(&Rectangle::new([(x0, y0), (x1, y1)], WHITE.filled()))
            .map_err(render_err)?;
        root.draw(&Rectangle::new([(x0, y0), (x1, y1)], GRID_COLOR.stroke_width(GRID_WIDTH)))
            .map_err(render_err)?;

        let entries = [
            ("Bias Score", SCORE_COLOR, false),
            ("Neutral (0.5)", NEUTRAL_COLOR, true),
        ];
        let row_height = (y1 - y0) / 2;
        for (i, (label, color, dashed)) in (0_i32..).zip(entries) {
            let y = y0 + row_height * i + row_height / 2;
            let swatch = vec![(x0 + 30, y), (x0 + 150, y)];
            if dashed {
                root.draw(&DashedPathElement::new(
                    swatch,
                    NEUTRAL_DASH.0,
                    NEUTRAL_DASH.1,
                    color.stroke_width(LINE_WIDTH),
                ))
                .map_err(render_err)?;
            } else {
                root.draw(&PathElement::new(swatch, color.stroke_width(LINE_WIDTH)))
                    .map_err(render_err)?;
                root.draw(&Circle::new((x0 + 90, y), MARKER_RADIUS, color.filled()))
                    .map_err(render_err)?;
            }
            root.draw(&Text::new(
                label,
                (x0 + 180, y),
                text_style(LEGEND_SIZE).pos(Pos::new(HPos::Left, VPos::Center)),
            ))
            .map_err(render_err)?;
        }

        // Title and subtitle.
        root.draw(&Text::new(
            TITLE,
            (pixel(half), pixel(size * 0.04)),
            text_style(TITLE_SIZE).pos(centered),
        ))
        .map_err(render_err)?;
        root.draw(&Text::new(
            SUBTITLE,
            (pixel(half), pixel(size * 0.075)),
            text_style(SUBTITLE_SIZE)
                .color(&RGBColor(0x40, 0x40, 0x40))
                .pos(centered),
        ))
        .map_err(render_err)?;

        Ok(())
    }
}

/// Black text in the registered chart font.
fn text_style(size: f64) -> TextStyle<'static> {
    TextStyle::from((font::FONT_FAMILY, size).into_font()).color(&BLACK)
}

/// Round a float coordinate to the pixel grid.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn pixel(v: f64) -> i32 {
    v.round() as i32
}

/// Wrap a `plotters` error.
fn render_err<E: std::fmt::Display>(e: E) -> BiasError {
    BiasError::Render(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
