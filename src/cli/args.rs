//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};

use crate::image::TargetFormat;

/// Raster-to-vector and raster format conversion service
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: pixtrace.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the upload form and conversion endpoint
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Worker threads handling requests
        #[arg(short, long)]
        workers: Option<usize>,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },

    /// Convert local files with the same rules as the HTTP endpoint
    #[command(visible_alias = "c")]
    Convert {
        /// Input image files, converted in the given order
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        inputs: Vec<PathBuf>,

        /// Target format (svg, png, jpg, jpeg, webp, bmp)
        #[arg(short, long, value_parser = TargetFormat::from_str)]
        format: Option<TargetFormat>,

        /// Output file (default: 01.<ext> or the archive name)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Serve { verbose, .. } | Commands::Convert { verbose, .. } => *verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["pixtrace", "serve", "-p", "8080", "-w", "2", "-V"]);
        assert!(cli.verbose());
        match cli.command {
            Commands::Serve {
                port,
                workers,
                interface,
                ..
            } => {
                assert_eq!(port, Some(8080));
                assert_eq!(workers, Some(2));
                assert_eq!(interface, None);
            }
            Commands::Convert { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_convert_alias() {
        let cli = Cli::parse_from(["pixtrace", "c", "a.png", "b.png", "-f", "JPG"]);
        match cli.command {
            Commands::Convert {
                inputs,
                format,
                output,
                verbose,
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(format, Some(TargetFormat::Jpeg));
                assert!(output.is_none());
                assert!(!verbose);
            }
            Commands::Serve { .. } => panic!("expected convert"),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = Cli::try_parse_from(["pixtrace", "convert", "a.png", "-f", "tiff"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["pixtrace", "serve", "-C", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
