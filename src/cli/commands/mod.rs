//! Subcommands module for azure-rm CLI

pub mod catalog;
pub mod run;

use super::{Cli, Commands};
use crate::cli::output::OutputFormatter;
use crate::config::Config;
use crate::error::Result;
use crate::modules::ModuleRegistry;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Registered modules
    pub registry: ModuleRegistry,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.output.colors;
        Self {
            output: OutputFormatter::new(use_color, cli.output),
            config,
            registry: ModuleRegistry::with_builtins(),
        }
    }
}

impl Commands {
    /// Run the subcommand and return the process exit code
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        match self {
            Commands::List => catalog::list(ctx),
            Commands::Doc(args) => args.execute(ctx),
            Commands::Run(args) => args.execute(ctx).await,
        }
    }
}
