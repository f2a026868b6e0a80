//! Static catalog of exported metric series.
//!
//! The catalog is a process-wide constant table: 8 request series followed by
//! 8 bandwidth series. It is never mutated, so every scrape shares it
//! read-only.

/// Label holding the zone display name.
pub const LABEL_ZONE: &str = "zone";
/// Label holding a content-type breakdown key.
pub const LABEL_CONTENT_TYPE: &str = "content_type";
/// Label holding a country breakdown key.
pub const LABEL_COUNTRY: &str = "country";
/// Label holding an HTTP status breakdown key.
pub const LABEL_STATUS: &str = "status";

const ZONE_ONLY: &[&str] = &[LABEL_ZONE];
const ZONE_CONTENT_TYPE: &[&str] = &[LABEL_ZONE, LABEL_CONTENT_TYPE];
const ZONE_COUNTRY: &[&str] = &[LABEL_ZONE, LABEL_COUNTRY];
const ZONE_STATUS: &[&str] = &[LABEL_ZONE, LABEL_STATUS];

/// Prometheus metric type of an emitted sample.
///
/// Upstream totals are cumulative over the query window, so zone samples
/// are only ever counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
}

impl MetricKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
        }
    }
}

/// Identity of one exported series: name, help text and label schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub name: &'static str,
    pub help: &'static str,
    /// Label names, in the order label values are supplied.
    pub labels: &'static [&'static str],
}

impl Descriptor {
    const fn new(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> Self {
        Self { name, help, labels }
    }
}

static CATALOG: [Descriptor; 16] = [
    // Requests
    Descriptor::new(
        "cloudflare_zone_requests_total",
        "Number of requests for zone",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_cached",
        "Number of cached requests for zone",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_uncached",
        "Number of uncached requests for zone",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_ssl_encrypted",
        "Number of encrypted requests for zone",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_ssl_unencrypted",
        "Number of unencrypted requests for zone",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_content_type",
        "Number of requests for zone per content type",
        ZONE_CONTENT_TYPE,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_country",
        "Number of requests for zone per country",
        ZONE_COUNTRY,
    ),
    Descriptor::new(
        "cloudflare_zone_requests_status",
        "Number of requests for zone per HTTP status",
        ZONE_STATUS,
    ),
    // Bandwidth
    Descriptor::new(
        "cloudflare_zone_bandwidth_total",
        "Total bandwidth per zone in bytes",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_cached",
        "Cached bandwidth per zone in bytes",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_uncached",
        "Uncached bandwidth per zone in bytes",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_ssl_encrypted",
        "Encrypted bandwidth per zone in bytes",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_ssl_unencrypted",
        "Unencrypted bandwidth per zone in bytes",
        ZONE_ONLY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_content_type",
        "Bandwidth per zone per content type in bytes",
        ZONE_CONTENT_TYPE,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_country",
        "Bandwidth per zone per country in bytes",
        ZONE_COUNTRY,
    ),
    Descriptor::new(
        "cloudflare_zone_bandwidth_status",
        "Bandwidth per zone per HTTP status in bytes",
        ZONE_STATUS,
    ),
];

/// The eight series emitted for one traffic group (requests or bandwidth).
#[derive(Debug)]
pub struct TrafficDescriptors {
    pub total: &'static Descriptor,
    pub cached: &'static Descriptor,
    pub uncached: &'static Descriptor,
    pub ssl_encrypted: &'static Descriptor,
    pub ssl_unencrypted: &'static Descriptor,
    pub content_type: &'static Descriptor,
    pub country: &'static Descriptor,
    pub status: &'static Descriptor,
}

/// Request-count series.
pub static REQUESTS: TrafficDescriptors = TrafficDescriptors {
    total: &CATALOG[0],
    cached: &CATALOG[1],
    uncached: &CATALOG[2],
    ssl_encrypted: &CATALOG[3],
    ssl_unencrypted: &CATALOG[4],
    content_type: &CATALOG[5],
    country: &CATALOG[6],
    status: &CATALOG[7],
};

/// Bandwidth series.
pub static BANDWIDTH: TrafficDescriptors = TrafficDescriptors {
    total: &CATALOG[8],
    cached: &CATALOG[9],
    uncached: &CATALOG[10],
    ssl_encrypted: &CATALOG[11],
    ssl_unencrypted: &CATALOG[12],
    content_type: &CATALOG[13],
    country: &CATALOG[14],
    status: &CATALOG[15],
};

/// All 16 descriptors in catalog order.
pub fn describe() -> &'static [Descriptor] {
    &CATALOG
}
