use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used when constructing cover image links
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to run with the in-process fallback store only
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_url")]
    pub url: String,
    #[serde(default = "default_books_ttl_secs")]
    pub books_ttl_secs: u64,
    #[serde(default = "default_authors_ttl_secs")]
    pub authors_ttl_secs: u64,
    #[serde(default = "default_cache_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory where uploaded cover images are stored and served from
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_url")]
    pub url: String,
    #[serde(default = "default_seed_query")]
    pub query: String,
    #[serde(default = "default_seed_limit")]
    pub limit: u32,
    #[serde(default = "default_seed_timeout_secs")]
    pub timeout_secs: u64,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Database defaults
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

// Cache defaults
fn default_cache_enabled() -> bool {
    true
}

fn default_cache_url() -> String {
    DEFAULT_CACHE_URL.to_string()
}

fn default_books_ttl_secs() -> u64 {
    DEFAULT_BOOKS_TTL_SECS
}

fn default_authors_ttl_secs() -> u64 {
    DEFAULT_AUTHORS_TTL_SECS
}

fn default_cache_connect_timeout_secs() -> u64 {
    DEFAULT_CACHE_CONNECT_TIMEOUT_SECS
}

// Storage defaults
fn default_image_path() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_PATH)
}

// Seed defaults
fn default_seed_url() -> String {
    DEFAULT_SEED_URL.to_string()
}

fn default_seed_query() -> String {
    DEFAULT_SEED_QUERY.to_string()
}

fn default_seed_limit() -> u32 {
    DEFAULT_SEED_LIMIT
}

fn default_seed_timeout_secs() -> u64 {
    DEFAULT_SEED_TIMEOUT_SECS
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            url: default_cache_url(),
            books_ttl_secs: default_books_ttl_secs(),
            authors_ttl_secs: default_authors_ttl_secs(),
            connect_timeout_secs: default_cache_connect_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            url: default_seed_url(),
            query: default_seed_query(),
            limit: default_seed_limit(),
            timeout_secs: default_seed_timeout_secs(),
        }
    }
}

impl CacheConfig {
    pub fn books_ttl(&self) -> Duration {
        Duration::from_secs(self.books_ttl_secs)
    }

    pub fn authors_ttl(&self) -> Duration {
        Duration::from_secs(self.authors_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl SeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.web.port, DEFAULT_PORT);
        assert_eq!(parsed.cache.books_ttl_secs, DEFAULT_BOOKS_TTL_SECS);
        assert_eq!(parsed.cache.authors_ttl_secs, DEFAULT_AUTHORS_TTL_SECS);
        assert_eq!(parsed.seed.limit, DEFAULT_SEED_LIMIT);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [web]
            port = 9001

            [cache]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(parsed.web.port, 9001);
        assert_eq!(parsed.web.host, DEFAULT_HOST);
        assert!(!parsed.cache.enabled);
        assert_eq!(parsed.cache.books_ttl_secs, DEFAULT_BOOKS_TTL_SECS);
        assert_eq!(parsed.database.url, DEFAULT_DATABASE_URL);
    }
}
