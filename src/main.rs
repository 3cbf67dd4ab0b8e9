//! ReelTrim command-line front end
//!
//! # Usage
//!
//! ```bash
//! reeltrim resolve --asset-id sim-0001
//! reeltrim simulate --duration 2:00 --saved-start 30 --saved-end 90 --script steps.json
//! reeltrim --min-gap 2 config
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use reeltrim::adapters::init_tracing;
use reeltrim::app::container::DefaultAppContainer;
use reeltrim::cli::{commands, Cli, Commands};
use reeltrim::config_initialization::initialize_configuration_hierarchy;

/// Main entry point for the ReelTrim CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli).context("Failed to load configuration")?;
    init_tracing(config.logging.level, config.logging.json);
    debug!(?config, "effective configuration");

    let container = DefaultAppContainer::new(config).context("Failed to initialize application")?;

    match cli.command {
        Commands::Resolve(args) => {
            info!("Executing resolve command");
            commands::resolve(&container, args).await?;
        }
        Commands::Simulate(args) => {
            info!("Executing simulate command");
            commands::simulate(&container, args).await?;
        }
        Commands::Config => commands::config(&container)?,
    }

    Ok(())
}
