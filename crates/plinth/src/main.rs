//! plinth CLI - build orchestrator for a hugo site with asset pipelines.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plinth_hugo::BuildMode;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "plinth")]
#[command(about = "Build orchestrator: hugo, stylesheet and script pipelines, watch server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to plinth.toml config file
    #[arg(short, long, default_value = "plinth.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Production build into the output directory
    Build,

    /// Build including drafts and future-dated content
    Preview,

    /// Watch server with live reload (the default)
    Dev {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the browser once serving
        #[arg(long)]
        open: bool,
    },

    /// Remove the output directory
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::load(&cli.config)?;

    // Execute command; no subcommand starts the watch server.
    match cli.command {
        Some(Commands::Build) => {
            commands::build::run(&config, BuildMode::Production).await?;
        }
        Some(Commands::Preview) => {
            commands::preview::run(&config).await?;
        }
        Some(Commands::Dev { port, open }) => {
            commands::dev::run(&config, port, open).await?;
        }
        Some(Commands::Clean) => {
            commands::clean::run(&config.output()).await?;
        }
        None => {
            commands::dev::run(&config, None, false).await?;
        }
    }

    Ok(())
}
