//! pixtrace - trace raster images to SVG or re-encode them, over HTTP or the CLI.

mod batch;
mod cli;
mod config;
mod core;
mod embed;
mod image;
mod logger;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::AppConfig;
use std::sync::Arc;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(AppConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::bind_server(config)?.run(),
        Commands::Convert {
            inputs,
            format,
            output,
            ..
        } => cli::convert::convert_files(inputs, *format, output.as_deref(), &config).map(|_| ()),
    }
}
