// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line arguments and the scan-then-render sequence of `bias-scan`.

use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::report::{ResultsTable, Theme};
use crate::scanner::{DEFAULT_MODEL, Scanner};
use crate::visualizer::BiasVisualizer;

/// Scan a masked language model for gender bias and generate a radar chart.
#[derive(Debug, Parser)]
#[command(name = "bias-scan")]
#[command(
    author,
    version,
    about = "Scan a masked language model for gender bias and generate a radar chart",
    long_about = None
)]
pub struct Cli {
    /// `HuggingFace` model name or local path
    #[arg(short, long, env = "BIAS_RADAR_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Output path for the radar chart PNG [default: bias_report_<model>.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Default chart path for `model`: `bias_report_{last path segment}.png`.
///
/// ```
/// use bias_radar::cli::default_output_path;
///
/// assert_eq!(
///     default_output_path("org/model-x"),
///     std::path::PathBuf::from("bias_report_model-x.png")
/// );
/// ```
#[must_use]
pub fn default_output_path(model: &str) -> PathBuf {
    let trimmed = model.trim_end_matches(['/', '\\']);
    let name = trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("model");
    PathBuf::from(format!("bias_report_{name}.png"))
}

/// Load, scan, print the table, and render the chart.
///
/// Returns the path the chart was written to.
///
/// # Errors
///
/// Returns the first failure of loading, scanning, or rendering.
pub fn run(cli: &Cli, theme: &Theme) -> Result<PathBuf> {
    println!("{}", theme.format_banner(&cli.model));

    let mut scanner = Scanner::new(cli.model.as_str());
    println!("{}", theme.format_progress("Loading model..."));
    scanner.load()?;

    println!("{}\n", theme.format_progress("Scanning professions..."));
    let results = scanner.scan_all()?;

    println!("{}", ResultsTable::new(&results).render(theme));
    println!("\n{}", theme.format_rule());

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.model));
    BiasVisualizer::new(&results).render(&output)?;

    println!("\n{}\n", theme.format_saved(&output.display().to_string()));
    Ok(output)
}
