//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Module coordination and dependency-resolution core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory scanned for module descriptors (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Deployment configuration file
    #[arg(short, long, default_value = "trellis.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and print the load order for a configured group
    Order {
        /// Group name from the configuration
        #[arg(short, long)]
        group: String,
    },
    /// Scan registered modules and print instantiation proposals
    Scan,
    /// Print a registry snapshot
    Stats,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("trellis={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Descriptor root: {}", cli.root.display());

    match cli.command {
        Commands::Order { group } => commands::order(cli.root, cli.config, group).await,
        Commands::Scan => commands::scan(cli.root, cli.config).await,
        Commands::Stats => commands::stats(cli.root, cli.config).await,
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
