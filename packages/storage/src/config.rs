// ABOUTME: Storage configuration for the SQLite backend
// ABOUTME: Defaults plus environment overrides for connection settings

use serde::{Deserialize, Serialize};

use polytag_config::constants::{
    DEFAULT_BUSY_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_ENABLE_WAL, DEFAULT_MAX_CONNECTIONS,
    POLYTAG_BUSY_TIMEOUT_SECS, POLYTAG_DATABASE_URL, POLYTAG_ENABLE_WAL, POLYTAG_MAX_CONNECTIONS,
};
use polytag_config::{env_value, parse_bool};

use crate::{StorageError, StorageResult};

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
    pub enable_wal: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_seconds: DEFAULT_BUSY_TIMEOUT_SECS,
            enable_wal: DEFAULT_ENABLE_WAL,
        }
    }
}

impl StorageConfig {
    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            enable_wal: false,
            ..Self::default()
        }
    }

    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> StorageResult<Self> {
        let mut config = Self::default();

        if let Some(url) = env_value(POLYTAG_DATABASE_URL) {
            config.database_url = url;
        }

        if let Some(raw) = env_value(POLYTAG_MAX_CONNECTIONS) {
            config.max_connections = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(StorageError::InvalidInput(format!(
                        "{} must be a positive integer, got '{}'",
                        POLYTAG_MAX_CONNECTIONS, raw
                    )))
                }
            };
        }

        if let Some(raw) = env_value(POLYTAG_BUSY_TIMEOUT_SECS) {
            config.busy_timeout_seconds = raw.parse::<u64>().map_err(|_| {
                StorageError::InvalidInput(format!(
                    "{} must be a number of seconds, got '{}'",
                    POLYTAG_BUSY_TIMEOUT_SECS, raw
                ))
            })?;
        }

        if let Some(raw) = env_value(POLYTAG_ENABLE_WAL) {
            config.enable_wal = parse_bool(&raw).ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "{} must be 'true' or 'false', got '{}'",
                    POLYTAG_ENABLE_WAL, raw
                ))
            })?;
        }

        Ok(config)
    }

    /// Whether the URL points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Filesystem path of the database file, if any
    pub fn database_path(&self) -> Option<std::path::PathBuf> {
        if self.is_in_memory() {
            return None;
        }

        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url);
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() {
            None
        } else {
            Some(std::path::PathBuf::from(path))
        }
    }
}
