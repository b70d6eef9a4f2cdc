// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal presentation: console theme and the results table.

use console::{Alignment, Style, measure_text_width, pad_str};

use crate::scanner::ScanResults;

/// Scores above this are flagged male-leaning.
pub const MALE_THRESHOLD: f64 = 0.6;
/// Scores below this are flagged female-leaning.
pub const FEMALE_THRESHOLD: f64 = 0.4;

/// Horizontal rule printed around the table.
pub const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// Coarse reading of a bias score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Score above [`MALE_THRESHOLD`].
    MaleLeaning,
    /// Score below [`FEMALE_THRESHOLD`].
    FemaleLeaning,
    /// Anything in between, bounds included.
    Balanced,
}

impl Indicator {
    /// Classify `score`.
    ///
    /// ```
    /// use bias_radar::report::Indicator;
    ///
    /// assert_eq!(Indicator::from_score(0.61), Indicator::MaleLeaning);
    /// assert_eq!(Indicator::from_score(0.6), Indicator::Balanced);
    /// ```
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > MALE_THRESHOLD {
            Self::MaleLeaning
        } else if score < FEMALE_THRESHOLD {
            Self::FemaleLeaning
        } else {
            Self::Balanced
        }
    }

    /// Emoji shown in the table.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::MaleLeaning => "🔴",
            Self::FemaleLeaning => "🔵",
            Self::Balanced => "🟢",
        }
    }
}

/// `score` as a whole percentage of male-coded mass, e.g. `"85%"`.
#[must_use]
pub fn he_percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

/// Complement of [`he_percent`], e.g. `"15%"`.
#[must_use]
pub fn she_percent(score: f64) -> String {
    format!("{:.0}%", (1.0 - score) * 100.0)
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// Console styles for the CLI.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Banner label (cyan).
    pub banner: Style,
    /// Rules and borders (dim).
    pub dim: Style,
    /// Progress messages (yellow).
    pub progress: Style,
    /// Success label (green).
    pub success: Style,
    /// Error label (red).
    pub error: Style,
    /// Table headers (bold magenta).
    pub header: Style,
    /// Profession column (cyan).
    pub profession: Style,
    /// He% column (blue).
    pub he: Style,
    /// She% column (red).
    pub she: Style,
    /// Score column (yellow).
    pub score: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// The colored theme.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: Style::new().cyan(),
            dim: Style::new().dim(),
            progress: Style::new().yellow(),
            success: Style::new().green(),
            error: Style::new().red(),
            header: Style::new().bold().magenta(),
            profession: Style::new().cyan(),
            he: Style::new().blue(),
            she: Style::new().red(),
            score: Style::new().yellow(),
        }
    }

    /// A theme without colors (for `--no-color` or non-TTY output).
    #[must_use]
    pub fn plain() -> Self {
        Self {
            banner: Style::new(),
            dim: Style::new(),
            progress: Style::new(),
            success: Style::new(),
            error: Style::new(),
            header: Style::new(),
            profession: Style::new(),
            he: Style::new(),
            she: Style::new(),
            score: Style::new(),
        }
    }

    /// `🔍 Scanning model: {model}` followed by a rule.
    #[must_use]
    pub fn format_banner(&self, model: &str) -> String {
        format!(
            "\n{} {model}\n{}\n",
            self.banner.apply_to("🔍 Scanning model:"),
            self.dim.apply_to(RULE)
        )
    }

    /// A progress line such as `Loading model...`.
    #[must_use]
    pub fn format_progress(&self, msg: &str) -> String {
        self.progress.apply_to(msg).to_string()
    }

    /// The closing rule after the table.
    #[must_use]
    pub fn format_rule(&self) -> String {
        self.dim.apply_to(RULE).to_string()
    }

    /// `📸 Radar chart saved to: {path}`.
    #[must_use]
    pub fn format_saved(&self, path: &str) -> String {
        format!("{} {path}", self.success.apply_to("📸 Radar chart saved to:"))
    }

    /// `❌ Error: {message}`.
    #[must_use]
    pub fn format_error(&self, message: &str) -> String {
        format!("{} {message}", self.error.apply_to("❌ Error:"))
    }
}

/// Whether colors should be enabled on stdout.
#[must_use]
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}

// ---------------------------------------------------------------------------
// ResultsTable
// ---------------------------------------------------------------------------

/// Column layout: header, minimum width, alignment.
const COLUMNS: [(&str, usize, Alignment); 5] = [
    ("Profession", 15, Alignment::Left),
    ("He%", 0, Alignment::Right),
    ("She%", 0, Alignment::Right),
    ("Bias Score", 0, Alignment::Right),
    ("", 3, Alignment::Center),
];

/// Box-drawn table of per-profession scores.
#[derive(Debug)]
pub struct ResultsTable {
    /// Formatted cells, one row per profession.
    rows: Vec<[String; 5]>,
    /// Display width of each column.
    widths: [usize; 5],
}

impl ResultsTable {
    /// Format `results` into table rows.
    #[must_use]
    pub fn new(results: &ScanResults) -> Self {
        let rows: Vec<[String; 5]> = results
            .iter()
            .map(|(profession, score)| {
                [
                    profession.to_owned(),
                    he_percent(score),
                    she_percent(score),
                    format!("{score:.2}"),
                    Indicator::from_score(score).symbol().to_owned(),
                ]
            })
            .collect();

        let mut widths = COLUMNS.map(|(header, min, _)| measure_text_width(header).max(min));
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(measure_text_width(cell));
            }
        }
        Self { rows, widths }
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render with `theme`'s styles.
    #[must_use]
    pub fn render(&self, theme: &Theme) -> String {
        let mut output = String::new();

        output.push_str(&self.render_border(theme, '┏', '┳', '┓', '━'));
        output.push('\n');

        let headers = COLUMNS.map(|(header, _, _)| header.to_owned());
        output.push_str(&self.render_row(theme, &headers, |_| &theme.header));
        output.push('\n');

        output.push_str(&self.render_border(theme, '┡', '╇', '┩', '━'));
        output.push('\n');

        let column_styles = [
            &theme.profession,
            &theme.he,
            &theme.she,
            &theme.score,
            &theme.dim,
        ];
        for row in &self.rows {
            output.push_str(&self.render_row(theme, row, |i| column_styles[i]));
            output.push('\n');
        }

        output.push_str(&self.render_border(theme, '└', '┴', '┘', '─'));
        output
    }

    fn render_border(&self, theme: &Theme, left: char, mid: char, right: char, fill: char) -> String {
        let mut s = String::new();
        s.push(left);
        for (i, width) in self.widths.iter().enumerate() {
            s.extend(std::iter::repeat_n(fill, width + 2));
            if i < self.widths.len() - 1 {
                s.push(mid);
            }
        }
        s.push(right);
        theme.dim.apply_to(s).to_string()
    }

    fn render_row<'t>(
        &self,
        theme: &'t Theme,
        cells: &[String; 5],
        style_for: impl Fn(usize) -> &'t Style,
    ) -> String {
        let bar = theme.dim.apply_to("│").to_string();
        let mut s = bar.clone();
        for (i, (cell, width)) in cells.iter().zip(self.widths).enumerate() {
            let (_, _, align) = COLUMNS[i];
            let padded = pad_str(cell, width, align, None);
            s.push(' ');
            s.push_str(&style_for(i).apply_to(padded).to_string());
            s.push(' ');
            s.push_str(&bar);
        }
        s
    }
}
