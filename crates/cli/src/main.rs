//! Shipline CLI - migrations and manual recovery tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply the worker's schema migrations
//! shipline migrate
//!
//! # Re-publish a dropped event from a file
//! shipline publish --queue shipment.created --file trk1.json
//!
//! # ...or from stdin
//! cat trk1.json | shipline publish --queue shipment.created
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `publish` - Validate a payload and publish it to its event queue

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shipline_core::EventKind;

mod commands;

#[derive(Parser)]
#[command(name = "shipline")]
#[command(author, version, about = "Shipline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Publish an event payload to its queue
    Publish {
        /// Target queue (`user.registered`, `shipment.created`, `shipment.updated`)
        #[arg(short, long)]
        queue: EventKind,

        /// JSON payload file; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Publish even if the payload does not decode
        #[arg(long)]
        skip_validation: bool,
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
        Commands::Publish {
            queue,
            file,
            skip_validation,
        } => {
            commands::publish::run(queue, file.as_deref(), !skip_validation).await?;
        }
    }
    Ok(())
}
