//! Slack relay CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! relay-cli migrate
//!
//! # Validate a seed file without touching the database
//! relay-cli seed relay.yaml --check
//!
//! # Create applications, templates, actions blocks and buttons
//! relay-cli seed relay.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Load applications and templates from YAML

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(author, version, about = "Slack relay CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create applications and templates from a YAML file
    Seed {
        /// Path to the seed file
        file: String,

        /// Validate the file and exit without connecting to the database
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, check } => commands::seed::run(&file, check).await?,
    }
    Ok(())
}
