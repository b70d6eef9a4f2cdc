// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bias-scan` entry point.

use std::process::ExitCode;

use bias_radar::cli::{Cli, run};
use bias_radar::report::{Theme, should_use_colors};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber on stderr.
///
/// Log level is controlled by:
/// 1. `--debug` sets `bias_radar=debug`
/// 2. `RUST_LOG` (if set)
/// 3. Default is `bias_radar=warn`
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("bias_radar=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bias_radar=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("bias-scan starting with args: {:?}", cli);

    let theme = if cli.no_color || !should_use_colors() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
        Theme::plain()
    } else {
        Theme::new()
    };

    match run(&cli, &theme) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{}\n", theme.format_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
