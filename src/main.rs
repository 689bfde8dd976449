//! Klipp CLI entry point.

use anyhow::Result;
use clap::Parser;
use klipp::cli::{commands, Cli, Commands};
use klipp::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("klipp={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Score { input, output, topic } => {
            commands::run_score(input, output.clone(), topic.as_deref(), settings).await?;
        }

        Commands::Dedupe { input, output, topic } => {
            commands::run_dedupe(input, output.clone(), topic.as_deref(), settings).await?;
        }

        Commands::Reel {
            input,
            output,
            topic,
            budget,
        } => {
            commands::run_reel(input, output, topic.as_deref(), *budget, settings).await?;
        }

        Commands::Dialogue { input, output, topic } => {
            commands::run_dialogue(input, output, topic.as_deref(), settings).await?;
        }

        Commands::Story { input, output } => {
            commands::run_story(input, output, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
