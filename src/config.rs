use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::models::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub aggregator: AggregatorConfig,
    pub cache: CacheConfig,
    pub ranking: RankingSettings,
    pub connectors: ConnectorsConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub request_timeout: u64,
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Budget for a single connector branch.
    pub connector_timeout_ms: u64,
    /// Budget for the whole fan-out; pending branches are abandoned after it.
    pub request_timeout_ms: u64,
    pub default_max_results: usize,
    pub max_results_cap: usize,
}

impl AggregatorConfig {
    pub fn connector_timeout(&self) -> Duration {
        Duration::from_millis(self.connector_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            connector_timeout_ms: 5_000,
            request_timeout_ms: 8_000,
            default_max_results: 25,
            max_results_cap: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub search_ttl_secs: u64,
    pub deals_ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_secs: 300,
            deals_ttl_secs: 600,
            max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSettings {
    pub review_count_offset: f64,
    pub default_deal_limit: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            review_count_offset: 2.0,
            default_deal_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    pub amazon: ConnectorConfig,
    pub bestbuy: ConnectorConfig,
    pub ebay: ConnectorConfig,
    pub walmart: ConnectorConfig,
}

impl ConnectorsConfig {
    pub fn for_platform(&self, platform: Platform) -> &ConnectorConfig {
        match platform {
            Platform::Amazon => &self.amazon,
            Platform::BestBuy => &self.bestbuy,
            Platform::Ebay => &self.ebay,
            Platform::Walmart => &self.walmart,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl ConnectorConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            enabled: true,
            base_url: base_url.into(),
            api_key: api_key.map(str::to_string),
            retry_attempts: 1,
            retry_delay_ms: 200,
            user_agent: format!("deal-aggregator/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "DEALS_"
            .add_source(Environment::with_prefix("DEALS").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single configuration file, still honouring environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("DEALS").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server configuration
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if Url::parse(&self.server.base_url).is_err() {
            return Err(ConfigError::Message("Invalid base URL format".into()));
        }

        if self.server.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Server request_timeout must be greater than 0".into(),
            ));
        }

        // The HTTP budget must cover a full fan-out
        if self.server.request_timeout.saturating_mul(1_000) < self.aggregator.request_timeout_ms {
            return Err(ConfigError::Message(
                "Server request_timeout cannot be shorter than aggregator request_timeout_ms".into(),
            ));
        }

        // Validate aggregator configuration
        if self.aggregator.connector_timeout_ms == 0 || self.aggregator.request_timeout_ms == 0 {
            return Err(ConfigError::Message("Aggregator timeouts must be greater than 0".into()));
        }

        if self.aggregator.connector_timeout_ms > self.aggregator.request_timeout_ms {
            return Err(ConfigError::Message(
                "Aggregator connector_timeout_ms cannot exceed request_timeout_ms".into(),
            ));
        }

        if self.aggregator.default_max_results == 0
            || self.aggregator.default_max_results > self.aggregator.max_results_cap
        {
            return Err(ConfigError::Message(
                "Aggregator default_max_results must be between 1 and max_results_cap".into(),
            ));
        }

        // Validate cache configuration
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Message("Cache max_entries must be greater than 0".into()));
        }

        if self.cache.search_ttl_secs == 0 || self.cache.deals_ttl_secs == 0 {
            return Err(ConfigError::Message("Cache TTLs must be greater than 0".into()));
        }

        // Validate ranking configuration
        if !(self.ranking.review_count_offset > 0.0) {
            return Err(ConfigError::Message(
                "Ranking review_count_offset must be greater than 0".into(),
            ));
        }

        if self.ranking.default_deal_limit == 0 {
            return Err(ConfigError::Message("Ranking default_deal_limit must be greater than 0".into()));
        }

        // Validate connector configuration
        for platform in Platform::ALL {
            let connector = self.connectors.for_platform(platform);
            if connector.enabled && Url::parse(&connector.base_url).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid base_url for connector {}",
                    platform
                )));
            }
        }

        // Validate metrics configuration
        if !self.metrics.endpoint.starts_with('/') {
            return Err(ConfigError::Message("Metrics endpoint must start with '/'".into()));
        }

        Ok(())
    }
}
