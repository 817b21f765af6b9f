//! geosheet CLI - Export Shopify shipping addresses to Google Sheets.
//!
//! # Usage
//!
//! ```bash
//! # Export all orders (default command)
//! geosheet
//! geosheet sync
//!
//! # Authorize Google Sheets access and cache the token
//! geosheet authorize
//!
//! # Load settings from a specific env file
//! geosheet --env-file prod.env sync
//! ```
//!
//! # Commands
//!
//! - `sync` - Write one row per order, starting below the header row
//! - `authorize` - Run the Google OAuth flow and save the token
//!
//! # Logging
//!
//! `RUST_LOG` overrides the default filter. Set `GEOSHEET_LOG_JSON` for JSON
//! log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use geosheet::SyncConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "geosheet")]
#[command(author, version, about = "Export Shopify shipping addresses to Google Sheets")]
struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every order's shipping address (default)
    Sync,
    /// Authorize Google Sheets access and save the token
    Authorize,
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geosheet=info,geosheet_cli=info".into());

    let json = std::env::var_os("GEOSHEET_LOG_JSON").is_some();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(kind = %e.kind(), "Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let config = match &cli.env_file {
        Some(path) => SyncConfig::from_env_file(path)?,
        None => SyncConfig::from_env()?,
    };

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let report = commands::sync::run(&config).await?;
            tracing::info!(
                expected = report.orders_expected,
                written = report.rows_written,
                pages = report.pages_fetched,
                "Done"
            );
        }
        Commands::Authorize => commands::authorize::run(&config).await?,
    }
    Ok(())
}
