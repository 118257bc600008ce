//! azure-rm - declarative Azure Resource Manager modules
//!
//! This is the main entry point for the azure-rm CLI.

use anyhow::Result;
use azure_rm::cli::commands::CommandContext;
use azure_rm::cli::Cli;
use azure_rm::config::Config;
use azure_rm::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        Config::default()
    });

    // Initialize logging from config, raised by -v
    if let Err(e) = logging::init(&config.logging, cli.verbosity()) {
        eprintln!("Warning: {}", e);
    }

    tracing::debug!("azure-rm v{}", azure_rm::version());
    let ctx = CommandContext::new(&cli, config);

    let exit_code = match cli.command.execute(&ctx).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}
