use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A managed zone (site) tracked by the upstream analytics source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    /// Opaque upstream identifier, used to query totals.
    pub id: String,

    /// Display name (e.g., "example.com"), used as the `zone` label.
    pub name: String,
}

impl Zone {
    /// Create a new zone.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Aggregate totals for one zone over the source's reporting window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTotals {
    /// Request counts.
    #[serde(default)]
    pub requests: TrafficTotals,

    /// Bandwidth in bytes.
    #[serde(default)]
    pub bandwidth: TrafficTotals,
}

/// Counters broken down by cache status, TLS status, content type,
/// country and HTTP status.
///
/// Breakdown maps are ordered by key, which keeps the emitted sample order
/// stable for a given snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficTotals {
    #[serde(default)]
    pub all: u64,

    #[serde(default)]
    pub cached: u64,

    #[serde(default)]
    pub uncached: u64,

    #[serde(default)]
    pub ssl: SslTotals,

    /// Keyed by content type (e.g., "html", "png").
    #[serde(default)]
    pub content_type: BTreeMap<String, u64>,

    /// Keyed by ISO country code.
    #[serde(default)]
    pub country: BTreeMap<String, u64>,

    /// Keyed by HTTP status code rendered as a string.
    #[serde(default)]
    pub http_status: BTreeMap<String, u64>,
}

impl TrafficTotals {
    /// Number of breakdown entries across content type, country and status.
    pub fn breakdown_len(&self) -> usize {
        self.content_type.len() + self.country.len() + self.http_status.len()
    }
}

/// Encrypted vs. unencrypted split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslTotals {
    #[serde(default)]
    pub encrypted: u64,

    #[serde(default)]
    pub unencrypted: u64,
}
