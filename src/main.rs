mod api;
mod cli;
mod config;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::SqliteStore;
use crate::models::MatchStatus;

#[derive(Parser)]
#[command(name = "tennis-snapshot")]
#[command(about = "Keeps a daily snapshot of scheduled tennis matches and their odds")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the results page and replace the scheduled-match snapshot
    Sync,
    /// Same as `sync`, reading an already-rendered page from disk
    SyncFile {
        #[arg(short, long)]
        path: PathBuf,
    },
    /// List the scheduled matches currently stored
    Scheduled {
        /// Include settled and archived matches
        #[arg(long)]
        all: bool,
    },
    /// Move a stored match out of the scheduled set
    Settle {
        #[arg(short, long)]
        id: String,
        #[arg(short, long, default_value = "settled")]
        status: MatchStatus,
    },
    /// Export scheduled matches as csv or json
    Export {
        #[arg(short, long, default_value = "csv")]
        format: String,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Initialize the database
    InitDb,
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database(&config.database_url).await?;
        }
        Some(Commands::Sync) => {
            let store = open_store(&config).await?;
            cli::sync_from_web(&config, &store).await?;
        }
        Some(Commands::SyncFile { path }) => {
            let store = open_store(&config).await?;
            cli::sync_from_file(&config, &store, &path).await?;
        }
        Some(Commands::Scheduled { all }) => {
            let store = open_store(&config).await?;
            cli::show_matches(&store, all).await?;
        }
        Some(Commands::Settle { id, status }) => {
            let store = open_store(&config).await?;
            cli::settle_match(&store, &id, status).await?;
        }
        Some(Commands::Export { format, out }) => {
            let store = open_store(&config).await?;
            cli::export_snapshot(&store, &format, &out, &config.bookmaker).await?;
        }
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting tennis snapshot API on port {}", port);
            api::serve(port, &config, open_store(&config).await?).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting tennis snapshot API on port 3000");
            api::serve(3000, &config, open_store(&config).await?).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::create_pool(&config.database_url).await?;
    db::init_database_with_pool(&pool).await?;
    Ok(SqliteStore::new(pool))
}
