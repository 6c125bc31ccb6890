//! Command-line interface for stripe-sync
//!
//! # Usage Examples
//!
//! ## Sync
//! ```bash
//! # Snapshot all subscriptions, then follow their events
//! STRIPE_SECRET_KEY=sk_live_... stripe-sync sync --resource-name subscription
//!
//! # Only new events for invoices, written to a file, for at most 30 minutes
//! stripe-sync sync --resource-name invoice --snapshot false \
//!   --output invoices.jsonl --timeout 30m
//! ```
//!
//! ## Positions
//! ```bash
//! stripe-sync position decode '{"mode":"cdc","watermark":1652790765,"cursor":"evt_1","index":0}'
//! stripe-sync position show --resource-name subscription
//! ```

use std::path::PathBuf;

use anyhow::Context;
use checkpoint::{Checkpoint, CheckpointFile};
use clap::{Parser, Subcommand};
use stripe_sync::config::DEFAULT_CHECKPOINT_DIR;
use stripe_sync::RunOpts;
use stripe_sync_source::resources::RESOURCES;
use stripe_sync_source::{Position, SourceOpts};

#[derive(Parser)]
#[command(name = "stripe-sync")]
#[command(about = "Capture Stripe resource changes as an ordered, resumable record stream")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a resource and follow its change events
    Sync {
        /// Stripe connection options
        #[command(flatten)]
        source: SourceOpts,

        /// Session options
        #[command(flatten)]
        run: RunOpts,
    },

    /// List the resources that can be synced
    Resources,

    /// Inspect position tokens
    Position {
        #[command(subcommand)]
        command: PositionCommands,
    },
}

#[derive(Subcommand)]
enum PositionCommands {
    /// Decode a position token
    Decode {
        /// Token as printed in the `position` field of a record
        token: String,
    },

    /// Show the stored checkpoint of a resource
    Show {
        #[arg(long, env = "STRIPE_RESOURCE_NAME")]
        resource_name: String,

        /// Directory holding checkpoint files
        #[arg(long, default_value = DEFAULT_CHECKPOINT_DIR)]
        checkpoint_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { source, run } => {
            tracing::debug!("Source options: {:?}", source);
            stripe_sync::sync::sync(source, run).await?;
        }
        Commands::Resources => {
            for resource in RESOURCES {
                let events = if resource.events.is_empty() {
                    "-".to_string()
                } else {
                    resource.events.join(",")
                };
                println!("{}\t{}\t{}", resource.name, resource.list_path, events);
            }
        }
        Commands::Position { command } => match command {
            PositionCommands::Decode { token } => {
                let position = Position::from_cli_string(&token)
                    .with_context(|| format!("Invalid position token: {token}"))?;
                print_position(&position);
            }
            PositionCommands::Show {
                resource_name,
                checkpoint_dir,
            } => {
                let file: CheckpointFile = checkpoint::read_checkpoint_from_dir(
                    &checkpoint_dir,
                    Position::SOURCE_TYPE,
                    &resource_name,
                )
                .await?;
                let position: Position = file.parse()?;
                println!("stored_at:\t{}", file.created_at().to_rfc3339());
                print_position(&position);
            }
        },
    }

    Ok(())
}

fn print_position(position: &Position) {
    println!("mode:\t{}", position.mode);
    println!("watermark:\t{}", position.watermark);
    println!("cursor:\t{}", position.cursor);
    println!("index:\t{}", position.index);
    println!("token:\t{}", position);
}
