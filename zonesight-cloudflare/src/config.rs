//! Cloudflare API connection settings.

use serde::{Deserialize, Serialize};

/// Upstream API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// Base URL of the v4 REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API token sent as a bearer token.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Account email for legacy global API key authentication.
    #[serde(default)]
    pub api_email: Option<String>,

    /// Legacy global API key (used together with `api_email`).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Analytics window, in minutes before now.
    #[serde(default = "default_since_minutes")]
    pub since_minutes: u64,

    /// Timeout for a single upstream HTTP request (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Page size used when listing zones (the API caps this at 50).
    #[serde(default = "default_zones_per_page")]
    pub zones_per_page: u32,
}

/// Largest page size accepted by the zones listing endpoint.
pub const MAX_ZONES_PER_PAGE: u32 = 50;

fn default_api_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_since_minutes() -> u64 {
    1440 // 24 hours
}

fn default_request_timeout() -> u64 {
    10
}

fn default_zones_per_page() -> u32 {
    MAX_ZONES_PER_PAGE
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            api_email: None,
            api_key: None,
            since_minutes: default_since_minutes(),
            request_timeout_secs: default_request_timeout(),
            zones_per_page: default_zones_per_page(),
        }
    }
}

impl CloudflareConfig {
    /// Whether any credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_token.is_some() || (self.api_email.is_some() && self.api_key.is_some())
    }

    /// Check value ranges. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("api_url must not be empty".to_string());
        }
        if self.since_minutes == 0 {
            return Err("since_minutes must be > 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        if self.zones_per_page == 0 || self.zones_per_page > MAX_ZONES_PER_PAGE {
            return Err(format!(
                "zones_per_page must be between 1 and {}",
                MAX_ZONES_PER_PAGE
            ));
        }
        if self.api_email.is_some() != self.api_key.is_some() {
            return Err("api_email and api_key must be set together".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CloudflareConfig::default();

        assert_eq!(config.api_url, "https://api.cloudflare.com/client/v4");
        assert_eq!(config.since_minutes, 1440);
        assert_eq!(config.zones_per_page, 50);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials() {
        let token = CloudflareConfig {
            api_token: Some("t".to_string()),
            ..Default::default()
        };
        assert!(token.has_credentials());

        let half_legacy = CloudflareConfig {
            api_email: Some("ops@example.com".to_string()),
            ..Default::default()
        };
        assert!(!half_legacy.has_credentials());
        assert!(half_legacy.validate().unwrap_err().contains("set together"));
    }

    #[test]
    fn test_validate_page_size() {
        let config = CloudflareConfig {
            zones_per_page: 51,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("zones_per_page"));

        let config = CloudflareConfig {
            zones_per_page: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = CloudflareConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
