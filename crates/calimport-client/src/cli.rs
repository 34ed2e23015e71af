//! Command-line interface definition.

use std::path::PathBuf;

use calimport_core::TracingOutputFormat;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// calimport - Import a calendar feed into the events API
#[derive(Debug, Parser)]
#[command(name = "calimport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALIMPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format on stderr (compact, pretty, json)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the import (default)
    Run(RunArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options of an import run. Each one overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Download the feed instead of reading the cached copy
    #[arg(long)]
    pub fetch: bool,

    /// Drop events ending after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub cutoff: Option<NaiveDate>,

    /// Send accepted events to the export endpoint
    #[arg(long)]
    pub export: bool,

    /// Directory receiving events.json, broken.json and unparsed.json
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
