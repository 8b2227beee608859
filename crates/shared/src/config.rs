//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Attachment storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Ledger behaviour configuration.
    #[serde(default)]
    pub ledger: LedgerSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Where attachment files live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Local filesystem rooted at a directory.
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests and throwaway environments).
    Memory,
}

/// Attachment storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage backend.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Maximum attachment size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_backend() -> StorageBackend {
    StorageBackend::LocalFs {
        root: PathBuf::from("./data/attachments"),
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Ledger behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// When true, proposing a change to an entry that already has an outstanding
    /// proposal fails with a conflict instead of replacing the earlier proposal.
    #[serde(default)]
    pub reject_superseding_proposals: bool,
    /// Maximum number of customer summaries kept in the cache.
    #[serde(default = "default_summary_cache_capacity")]
    pub summary_cache_capacity: u64,
    /// Time-to-live of a cached customer summary in seconds.
    #[serde(default = "default_summary_cache_ttl")]
    pub summary_cache_ttl_secs: u64,
}

fn default_summary_cache_capacity() -> u64 {
    1000
}

fn default_summary_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            reject_superseding_proposals: false,
            summary_cache_capacity: default_summary_cache_capacity(),
            summary_cache_ttl_secs: default_summary_cache_ttl(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, then `LEDGERBOOK__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGERBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
