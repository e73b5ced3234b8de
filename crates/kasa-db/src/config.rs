//! # Engine Configuration
//!
//! Settings for the database pool and the transaction engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASA_DB_PATH=/var/lib/kasa/kasa.db                                 │
//! │     KASA_ORDER_PREFIX=POS1-                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     kasa.toml (path supplied by the caller)                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "kasa.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [engine]
//! order_number_prefix = "ORD-"
//! shift_number_prefix = "SH-"
//! max_cart_items = 100
//! max_item_quantity = 999
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Database section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the write lock (milliseconds).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("kasa.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration these settings describe.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Limits and numbering used by [`crate::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prepended to `YYYYMMDD-NNNNN` order numbers.
    #[serde(default = "default_order_prefix")]
    pub order_number_prefix: String,

    /// Prepended to `YYYYMMDD-NNN` shift numbers.
    #[serde(default = "default_shift_prefix")]
    pub shift_number_prefix: String,

    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,
}

fn default_order_prefix() -> String {
    "ORD-".to_string()
}

fn default_shift_prefix() -> String {
    "SH-".to_string()
}

fn default_max_cart_items() -> usize {
    kasa_core::MAX_CART_ITEMS
}

fn default_max_item_quantity() -> i64 {
    kasa_core::MAX_ITEM_QUANTITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            order_number_prefix: default_order_prefix(),
            shift_number_prefix: default_shift_prefix(),
            max_cart_items: default_max_cart_items(),
            max_item_quantity: default_max_item_quantity(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Loads configuration: file (if given and present), then environment,
    /// then validation.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies `KASA_*` environment variables.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable numbers are ignored
    /// with a warning.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("KASA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("KASA_DB_MAX_CONNECTIONS") {
            match raw.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid KASA_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(prefix) = lookup("KASA_ORDER_PREFIX") {
            self.engine.order_number_prefix = prefix;
        }

        if let Some(prefix) = lookup("KASA_SHIFT_PREFIX") {
            self.engine.shift_number_prefix = prefix;
        }

        if let Some(raw) = lookup("KASA_MAX_CART_ITEMS") {
            match raw.parse::<usize>() {
                Ok(n) => self.engine.max_cart_items = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid KASA_MAX_CART_ITEMS"),
            }
        }

        if let Some(raw) = lookup("KASA_MAX_ITEM_QUANTITY") {
            match raw.parse::<i64>() {
                Ok(n) => self.engine.max_item_quantity = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid KASA_MAX_ITEM_QUANTITY"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.max_cart_items == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_cart_items must be greater than 0".into(),
            ));
        }

        if self.engine.max_item_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "engine.max_item_quantity must be greater than 0".into(),
            ));
        }

        for (name, prefix) in [
            ("engine.order_number_prefix", &self.engine.order_number_prefix),
            ("engine.shift_number_prefix", &self.engine.shift_number_prefix),
        ] {
            if prefix.len() > 16 || prefix.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most 16 characters without whitespace"
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
