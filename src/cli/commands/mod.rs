//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod config_cmd;
mod extract;
mod parse;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use earnings_ocr::config::load_config;

use super::helpers::OutputFormat;

#[derive(Parser)]
#[command(name = "earnocr")]
#[command(about = "Extract earnings announcement dates from calendar screenshots")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "EARNINGS_OCR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (before full parsing).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run OCR over one or more images and report announcements
    Extract {
        /// Image files (JPEG, PNG or WebP), processed in order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Stop at the first image that fails
        #[arg(long)]
        fail_fast: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Extract announcements from already-recognized text
    Parse {
        /// Text file to read (stdin when omitted)
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Check which OCR backends are usable
    Check,

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract {
            images,
            format,
            fail_fast,
            no_progress,
        } => extract::cmd_extract(&config, &images, format, fail_fast, !no_progress).await,
        Commands::Parse { file, format } => parse::cmd_parse(file.as_deref(), format).await,
        Commands::Check => check::cmd_check(&config).await,
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
