//! Application configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                | Default       |
//! |-------------------------|---------------|
//! | `FOLIO_DB_PATH`         | `./folio.db`  |
//! | `FOLIO_RECEIPT_DIR`     | `./receipts`  |
//! | `FOLIO_STORE_NAME`      | unset         |
//! | `FOLIO_MAX_CONNECTIONS` | `5`           |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::pool::DbConfig;

pub const ENV_DB_PATH: &str = "FOLIO_DB_PATH";
pub const ENV_RECEIPT_DIR: &str = "FOLIO_RECEIPT_DIR";
pub const ENV_STORE_NAME: &str = "FOLIO_STORE_NAME";
pub const ENV_MAX_CONNECTIONS: &str = "FOLIO_MAX_CONNECTIONS";

/// Back-office configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Directory the file receipt sink writes into
    pub receipt_dir: PathBuf,

    /// Printed at the top of every receipt
    pub store_name: Option<String>,

    /// Pool size
    pub max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("./folio.db"),
            receipt_dir: PathBuf::from("./receipts"),
            store_name: None,
            max_connections: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let max_connections = match lookup(ENV_MAX_CONNECTIONS) {
            Some(raw) => {
                let parsed: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()))?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()));
                }
                parsed
            }
            None => defaults.max_connections,
        };

        Ok(AppConfig {
            database_path: lookup(ENV_DB_PATH)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            receipt_dir: lookup(ENV_RECEIPT_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.receipt_dir),

            store_name: lookup(ENV_STORE_NAME)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            max_connections,
        })
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
