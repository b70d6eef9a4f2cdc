// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-time discovery and registration of the chart font.
//!
//! `plotters` draws text through `ab_glyph`, which needs the raw bytes of
//! a TrueType font registered under a family name. The first readable
//! font among [`FONT_ENV`] and a list of common system paths is registered
//! once per process.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use plotters::style::FontStyle;

/// Family name the chart font is registered under.
pub(crate) const FONT_FAMILY: &str = "bias-radar-sans";

/// Environment variable naming a TrueType font to use for chart text.
pub const FONT_ENV: &str = "BIAS_RADAR_FONT";

/// Common locations of a sans-serif TrueType font.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Registered font path, resolved at most once.
static REGISTERED: Lazy<Option<PathBuf>> = Lazy::new(register_first_available);

/// Register the chart font if not done yet.
///
/// Returns the path of the registered font, or `None` when no usable font
/// was found (chart text is then skipped).
pub(crate) fn ensure_font() -> Option<&'static Path> {
    REGISTERED.as_deref()
}

/// Try each candidate until one registers.
fn register_first_available() -> Option<PathBuf> {
    for path in candidate_paths() {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        // BORROW: ab_glyph keeps the font bytes for the process lifetime
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "registered chart font");
                return Some(path);
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "not a usable TrueType font");
            }
        }
    }
    tracing::warn!("no TrueType font found; chart text will be omitted (set {FONT_ENV} to a .ttf file)");
    None
}

/// The override from [`FONT_ENV`] first, then the system locations.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::env::var_os(FONT_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .collect();
    paths.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
    paths
}
