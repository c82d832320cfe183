pub mod sqlite_store;
pub mod store;

#[cfg(test)]
pub mod memory_store;

pub use sqlite_store::SqliteStore;
pub use store::{CommitSummary, DocumentStore, StoreError, WriteBatch, WriteOp};

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Single-connection in-memory database; every connection to `sqlite::memory:` is a fresh db.
#[cfg(test)]
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    // document holds the full JSON body; the other columns exist for filtering and ordering
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id              TEXT PRIMARY KEY,
            status          TEXT NOT NULL DEFAULT 'scheduled',
            sport           TEXT NOT NULL,
            tournament_name TEXT NOT NULL,
            document        TEXT NOT NULL,
            scraped_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}
