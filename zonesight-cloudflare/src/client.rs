//! HTTP client for the Cloudflare v4 REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use zonesight_common::{SourceError, StatsSource, Zone, ZoneTotals};

use crate::config::CloudflareConfig;

/// API error codes that mean the zone identifier is unknown.
const ZONE_NOT_FOUND_CODES: [u32; 2] = [1001, 7003];

/// Standard response envelope wrapping every v4 API result.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct DashboardResult {
    totals: ZoneTotals,
}

/// Cloudflare analytics client implementing [`StatsSource`].
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: reqwest::Client,
    config: CloudflareConfig,
}

impl CloudflareClient {
    /// Create a new client from configuration.
    pub fn new(config: CloudflareConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("zonesight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Issue a GET and unwrap the response envelope.
    ///
    /// `zone_id` is set for zone-scoped endpoints so that "unknown zone"
    /// responses map to [`SourceError::NotFound`].
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        zone_id: Option<&str>,
    ) -> Result<ApiResponse<T>, SourceError> {
        let url = self.url(path);
        trace!(url = %url, "Cloudflare API request");

        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        } else if let (Some(email), Some(key)) = (&self.config.api_email, &self.config.api_key) {
            request = request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::unavailable(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            SourceError::unavailable(format!("Failed to read response for {}: {}", path, e))
        })?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(SourceError::Decode(format!("{}: {}", path, e)));
            }
            Err(_) => {
                return Err(status_error(status, path, zone_id, &[]));
            }
        };

        if !status.is_success() || !envelope.success {
            return Err(status_error(status, path, zone_id, &envelope.errors));
        }

        debug!(path = %path, status = status.as_u16(), "Cloudflare API response");
        Ok(envelope)
    }
}

/// Map a failed API call to a [`SourceError`].
fn status_error(
    status: StatusCode,
    path: &str,
    zone_id: Option<&str>,
    errors: &[ApiMessage],
) -> SourceError {
    if let Some(zone_id) = zone_id
        && (status == StatusCode::NOT_FOUND
            || errors.iter().any(|e| ZONE_NOT_FOUND_CODES.contains(&e.code)))
    {
        return SourceError::not_found(zone_id);
    }

    let detail = if errors.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    };

    SourceError::unavailable(format!("GET {} returned HTTP {}: {}", path, status.as_u16(), detail))
}

#[async_trait]
impl StatsSource for CloudflareClient {
    async fn list_zones(&self) -> Result<Vec<Zone>, SourceError> {
        let mut zones = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response: ApiResponse<Vec<Zone>> = self
                .get(
                    "zones",
                    &[
                        ("page", page.to_string()),
                        ("per_page", self.config.zones_per_page.to_string()),
                    ],
                    None,
                )
                .await?;

            let batch = response
                .result
                .ok_or_else(|| SourceError::Decode("zones: response has no result".to_string()))?;
            let total_pages = response.result_info.map(|i| i.total_pages).unwrap_or(1);

            debug!(page, total_pages, count = batch.len(), "Fetched zone page");
            let empty = batch.is_empty();
            zones.extend(batch);

            if empty || page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(zones)
    }

    async fn fetch_zone_totals(&self, zone_id: &str) -> Result<ZoneTotals, SourceError> {
        let path = format!("zones/{}/analytics/dashboard", zone_id);
        let response: ApiResponse<DashboardResult> = self
            .get(
                &path,
                &[
                    ("since", format!("-{}", self.config.since_minutes)),
                    ("continuous", "true".to_string()),
                ],
                Some(zone_id),
            )
            .await?;

        response
            .result
            .map(|r| r.totals)
            .ok_or_else(|| SourceError::Decode(format!("{}: response has no result", path)))
    }
}
