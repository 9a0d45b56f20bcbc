//! Ledger settings loaded from `ledger.toml`.
//!
//! The file is optional: every field has a default, and `DATABASE_URL` in the environment
//! (or a `.env` file) overrides the configured store location.

use super::database::{DEFAULT_DATABASE_URL, database_url_or};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "ledger.toml";

/// Structure of `ledger.toml`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// `SeaORM` connection URL for the shared store
    pub database_url: String,
    /// Prefix of generated receipt numbers (`OUT-1700000000000`)
    pub receipt_prefix: String,
    /// Branches this installation serves
    pub branches: Vec<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            receipt_prefix: "OUT".to_string(),
            branches: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Returns true when `branch` is listed, or when no branch list is configured.
    #[must_use]
    pub fn serves_branch(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
    }
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<LedgerConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse ledger settings: {e}"),
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LedgerConfig> {
    let path_ref = path.as_ref();
    debug!("Loading ledger settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads `.env`, then `ledger.toml` if present, then applies the `DATABASE_URL` override.
pub fn load_app_configuration() -> Result<LedgerConfig> {
    dotenvy::dotenv().ok();

    let mut config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)?
    } else {
        info!("No {DEFAULT_CONFIG_PATH} found, using default settings");
        LedgerConfig::default()
    };
    config.database_url = database_url_or(&config.database_url);
    if config.receipt_prefix.trim().is_empty() {
        return Err(Error::Config {
            message: "receipt_prefix cannot be empty".to_string(),
        });
    }
    Ok(config)
}
