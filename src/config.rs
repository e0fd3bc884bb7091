use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub shopify: ShopifyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyConfig {
    /// e.g. `toy-shop.myshopify.com`
    pub shop_domain: String,
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_namespace")]
    pub metafield_namespace: String,
}

/// Tuning for the tier sync batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub page_size: u32,
    pub max_pages: u32,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub write_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 20,
            batch_size: 10,
            batch_delay_ms: 1000,
            write_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl SyncConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_api_version() -> String {
    "2024-10".to_string()
}

fn default_namespace() -> String {
    "loyalty".to_string()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("Cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Builds a config purely from environment variables and defaults.
    fn from_env_defaults() -> Result<Self, Box<dyn std::error::Error>> {
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            shopify: ShopifyConfig {
                shop_domain: get_env("SHOPIFY_SHOP_DOMAIN").unwrap_or_default(),
                access_token: get_env("SHOPIFY_ACCESS_TOKEN").unwrap_or_default(),
                api_version: get_env("SHOPIFY_API_VERSION").unwrap_or_else(default_api_version),
                metafield_namespace: get_env("SHOPIFY_METAFIELD_NAMESPACE")
                    .unwrap_or_else(default_namespace),
            },
            sync: SyncConfig::default(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("SHOPIFY_SHOP_DOMAIN") {
            self.shopify.shop_domain = v;
        }
        if let Some(v) = get_env("SHOPIFY_ACCESS_TOKEN") {
            self.shopify.access_token = v;
        }
        if let Some(v) = get_env("SHOPIFY_API_VERSION") {
            self.shopify.api_version = v;
        }
        if let Some(v) = get_env("SHOPIFY_METAFIELD_NAMESPACE") {
            self.shopify.metafield_namespace = v;
        }

        let sync = &mut self.sync;
        if let Some(n) = get_env("SYNC_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            sync.page_size = n;
        }
        if let Some(n) = get_env("SYNC_MAX_PAGES").and_then(|v| v.parse().ok()) {
            sync.max_pages = n;
        }
        if let Some(n) = get_env("SYNC_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            sync.batch_size = n;
        }
        if let Some(n) = get_env("SYNC_BATCH_DELAY_MS").and_then(|v| v.parse().ok()) {
            sync.batch_delay_ms = n;
        }
        if let Some(n) = get_env("SYNC_WRITE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            sync.write_timeout_secs = n;
        }
        if let Some(n) = get_env("SYNC_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            sync.max_retries = n;
        }
        if let Some(n) = get_env("SYNC_RETRY_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            sync.retry_backoff_ms = n;
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
