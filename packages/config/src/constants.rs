// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names and defaults used by polytag

// Database Configuration
pub const POLYTAG_DATABASE_URL: &str = "POLYTAG_DATABASE_URL";
pub const POLYTAG_MAX_CONNECTIONS: &str = "POLYTAG_MAX_CONNECTIONS";
pub const POLYTAG_BUSY_TIMEOUT_SECS: &str = "POLYTAG_BUSY_TIMEOUT_SECS";
pub const POLYTAG_ENABLE_WAL: &str = "POLYTAG_ENABLE_WAL";

// Defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite:polytag.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ENABLE_WAL: bool = true;
