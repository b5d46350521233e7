//! Configuration management for the Shop Stock Assistant backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SSA_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Per-account file storage configuration
    pub storage: StorageConfig,

    /// Marketplace statistics API configuration
    pub marketplace: MarketplaceConfig,

    /// Secondary warehouse system configuration
    pub warehouse: WarehouseConfig,

    /// In-memory result cache configuration
    pub cache: CacheConfig,

    /// Display / reconciliation output configuration
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for per-account data (cache, uploads, exports)
    pub accounts_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketplaceConfig {
    /// Statistics API base URL
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Warehouse system API base URL
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Simultaneous in-flight requests for per-article lookups
    pub max_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// TTL for memoized stock row sets, in seconds
    pub ttl_seconds: u64,

    /// Minimum spacing between forced upstream refreshes, in seconds
    pub refresh_window_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store name written into every reconciled output row
    pub label: String,

    /// Default lines per chat page
    pub page_size: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("SSA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("storage.accounts_dir", "data/accounts")?
            .set_default("marketplace.base_url", "https://statistics-api.wildberries.ru")?
            .set_default("marketplace.request_timeout_secs", 25)?
            .set_default("marketplace.connect_timeout_secs", 5)?
            .set_default("warehouse.base_url", "https://api.moysklad.ru/api/remap/1.2")?
            .set_default("warehouse.request_timeout_secs", 25)?
            .set_default("warehouse.max_concurrency", 4)?
            .set_default("cache.ttl_seconds", 45)?
            .set_default("cache.refresh_window_seconds", 60)?
            .set_default("store.label", "Main Store")?
            .set_default("store.page_size", 40)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SSA_ prefix)
            .add_source(
                Environment::with_prefix("SSA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
