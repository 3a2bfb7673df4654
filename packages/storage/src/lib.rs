// ABOUTME: Data layer and persistence for polytag
// ABOUTME: Storage errors, connection configuration and embedded schema migrations

pub mod config;
pub mod sqlite;

use thiserror::Error;

pub use config::StorageConfig;
pub use sqlite::{open_pool, run_migrations};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
