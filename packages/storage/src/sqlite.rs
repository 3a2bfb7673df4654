// ABOUTME: SQLite connection pool setup
// ABOUTME: Creates the database file, applies connection pragmas and runs embedded migrations

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::{StorageConfig, StorageError, StorageResult};

/// Embedded schema for the tags and taggables tables
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool for the given configuration and bring the schema up to date
pub async fn open_pool(config: &StorageConfig) -> StorageResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(path) = config.database_path() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let mut options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(StorageError::Sqlx)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

    if config.enable_wal && !config.is_in_memory() {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    debug!(
        "Connecting to {} (max_connections: {})",
        config.database_url, config.max_connections
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.busy_timeout_seconds))
        .connect_with(options)
        .await
        .map_err(StorageError::Sqlx)?;

    run_migrations(&pool).await?;

    info!("Database ready at {}", config.database_url);
    Ok(pool)
}

/// Apply all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> StorageResult<()> {
    debug!("Running migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}
