//! CLI module for azure-rm
//!
//! Argument parsing and subcommand dispatch. The binary in `main.rs` only
//! loads configuration, initializes logging and hands over to
//! [`commands::CommandContext`].

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// azure-rm - declarative Azure Resource Manager modules
#[derive(Parser, Debug, Clone)]
#[command(name = "azure-rm")]
#[command(version)]
#[command(about = "Declarative Azure Resource Manager modules", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "json")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "AZURE_RM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Result dict as JSON on stdout
    #[default]
    Json,
    /// One colored status line per result
    Human,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List registered modules
    List,

    /// Print the argument spec of a module
    Doc(commands::catalog::DocArgs),

    /// Run a module
    Run(commands::run::RunArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
