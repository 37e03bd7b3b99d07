//! # Application Configuration
//!
//! Store identity, database location and checkout policies.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     NDAYANE_DB_PATH=/var/lib/ndayane/ndayane.db                        │
//! │     NDAYANE_DB_MAX_CONNECTIONS=8                                       │
//! │     NDAYANE_STORE_NAME="Quincaillerie Ndayane Services"                │
//! │     NDAYANE_MISSING_STOCK=reject                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ndayane-pos/config.toml (Linux)                          │
//! │     ~/Library/Application Support/sn.ndayane.ndayane-pos (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Quincaillerie Ndayane Services"
//! address = "Route nationale, Ndayane"
//! phone = "+221 33 000 00 00"
//! currency = "FCFA"
//!
//! [database]
//! path = "/var/lib/ndayane/ndayane.db"
//! max_connections = 5
//!
//! [sales]
//! missing_stock = "skip"  # skip | reject
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::error::{ServiceError, ServiceResult};
use ndayane_db::DbConfig;

// =============================================================================
// Missing Stock Policy
// =============================================================================

/// What checkout does when a sold product has no stock row in the warehouse.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  SKIP (Default)                    │  REJECT                            │
/// │  ──────────────                    │  ──────                            │
/// │  • Line treated as unstocked       │  • Whole sale fails (NOT_FOUND)    │
/// │    (service, cut-to-order item)    │  • Nothing is written              │
/// │  • Sale goes through, warning      │  • For shops that stock every      │
/// │    logged per skipped line         │    single item they sell           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Validating a held sale later always rejects a missing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingStockPolicy {
    #[default]
    Skip,
    Reject,
}

impl std::fmt::Display for MissingStockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingStockPolicy::Skip => write!(f, "skip"),
            MissingStockPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for MissingStockPolicy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "ignore" => Ok(MissingStockPolicy::Skip),
            "reject" | "fail" => Ok(MissingStockPolicy::Reject),
            other => Err(ServiceError::config(format!(
                "Unknown missing stock policy: '{}'. Valid options: skip, reject",
                other
            ))),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Identity printed on invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    /// Label printed after amounts.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_store_name() -> String {
    "Quincaillerie Ndayane Services".to_string()
}

fn default_currency() -> String {
    ndayane_core::money::CURRENCY_LABEL.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
            address: None,
            phone: None,
            currency: default_currency(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("sn", "ndayane", "ndayane-pos")
        .map(|dirs| dirs.data_dir().join("ndayane.db"))
        .unwrap_or_else(|| PathBuf::from("ndayane.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    #[serde(default)]
    pub missing_stock: MissingStockPolicy,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ServiceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ServiceError::config("No config path available"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(ServiceError::config("store.name must not be empty"));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ServiceError::config("database.path must not be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(ServiceError::config(
                "database.max_connections must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Applies overrides from a variable source (the process environment in
    /// [`AppConfig::load`]).
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("NDAYANE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("NDAYANE_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid NDAYANE_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(name) = var("NDAYANE_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(policy) = var("NDAYANE_MISSING_STOCK") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %parsed, "Overriding missing stock policy from environment");
                    self.sales.missing_stock = parsed;
                }
                Err(_) => warn!(policy = %policy, "Unknown missing stock policy in environment"),
            }
        }
    }

    /// Pool settings for [`ndayane_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("sn", "ndayane", "ndayane-pos")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.name, "Quincaillerie Ndayane Services");
        assert_eq!(config.store.currency, "FCFA");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sales.missing_stock, MissingStockPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("skip".parse::<MissingStockPolicy>().unwrap(), MissingStockPolicy::Skip);
        assert_eq!(
            "REJECT".parse::<MissingStockPolicy>().unwrap(),
            MissingStockPolicy::Reject
        );
        assert!("maybe".parse::<MissingStockPolicy>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            name = "Ndayane Services - Dépôt Mbour"
            phone = "+221 33 957 00 00"

            [sales]
            missing_stock = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Ndayane Services - Dépôt Mbour");
        assert_eq!(config.store.currency, "FCFA");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sales.missing_stock, MissingStockPolicy::Reject);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NDAYANE_DB_PATH", "/tmp/ndayane-test.db"),
            ("NDAYANE_DB_MAX_CONNECTIONS", "not-a-number"),
            ("NDAYANE_MISSING_STOCK", "reject"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/ndayane-test.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sales.missing_stock, MissingStockPolicy::Reject);
        assert_eq!(config.db_config().database_path, PathBuf::from("/tmp/ndayane-test.db"));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.store.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("missing_stock = \"skip\""));
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
