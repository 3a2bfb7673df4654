// ABOUTME: Configuration helpers for polytag
// ABOUTME: Reads environment variables and falls back to documented defaults

pub mod constants;

use tracing::debug;

/// Read an environment variable, treating empty values as unset
pub fn env_value(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            debug!("Environment variable {} not set, using default", key);
            None
        }
    }
}

/// Parse a boolean flag. Accepts true/false, 1/0, yes/no, on/off.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
