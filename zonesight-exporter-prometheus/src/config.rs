//! Configuration for the Prometheus exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use zonesight_cloudflare::CloudflareConfig;
use zonesight_common::{LoggingConfig, load_config, parse_config};

use crate::http::RESERVED_PATHS;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] zonesight_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Upstream API settings.
    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Per-scrape behavior.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Zone filtering settings.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:9199").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9199".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Scrape behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Deadline for a whole scrape (seconds). In-flight zone fetches are
    /// abandoned when it elapses.
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// Fail the whole scrape when any zone fetch fails, instead of omitting
    /// that zone.
    #[serde(default)]
    pub fail_on_zone_error: bool,

    /// Maximum concurrent zone fetches (0 = one task per zone, unbounded).
    #[serde(default)]
    pub max_concurrency: usize,
}

fn default_scrape_timeout() -> u64 {
    30
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout(),
            fail_on_zone_error: false,
            max_concurrency: 0,
        }
    }
}

impl ScrapeConfig {
    /// Scrape deadline as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Zone filtering configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Glob patterns for zone names to include (empty = all).
    #[serde(default)]
    pub include_zones: Vec<String>,

    /// Glob patterns for zone names to exclude.
    #[serde(default)]
    pub exclude_zones: Vec<String>,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ExporterConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cloudflare
            .validate()
            .map_err(ConfigError::Validation)?;

        if self.scrape.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        // Validate listen address format
        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        // Validate path starts with /
        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }
        if RESERVED_PATHS.contains(&self.prometheus.path.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.prometheus.path
            )));
        }

        for pattern in self
            .filters
            .include_zones
            .iter()
            .chain(&self.filters.exclude_zones)
        {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Validation(format!(
                    "Invalid zone pattern '{}': {}",
                    pattern, e
                )));
            }
        }

        Ok(())
    }
}
