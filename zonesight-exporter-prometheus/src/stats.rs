//! Exporter self-metrics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::collector::ScrapeReport;

/// Prefix of every self-metric series.
pub const PREFIX: &str = "zonesight_exporter";

/// Health counters for the exporter itself, appended to every `/metrics` body.
#[derive(Debug)]
pub struct ExporterStats {
    registry: Registry,
    scrapes: Counter,
    scrape_failures: Counter,
    zone_fetch_failures: Counter,
    last_scrape_duration: Gauge<f64, AtomicU64>,
    last_scrape_zones: Gauge,
    last_scrape_failed: AtomicBool,
}

impl ExporterStats {
    /// Create and register all self-metrics.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(PREFIX);

        let scrapes = Counter::default();
        let scrape_failures = Counter::default();
        let zone_fetch_failures = Counter::default();
        let last_scrape_duration = Gauge::<f64, AtomicU64>::default();
        let last_scrape_zones = Gauge::default();

        registry.register("scrapes", "Scrapes attempted", scrapes.clone());
        registry.register(
            "scrape_failures",
            "Scrapes that failed as a whole",
            scrape_failures.clone(),
        );
        registry.register(
            "zone_fetch_failures",
            "Per-zone totals fetches that failed",
            zone_fetch_failures.clone(),
        );
        registry.register(
            "last_scrape_duration_seconds",
            "Wall-clock duration of the most recent scrape",
            last_scrape_duration.clone(),
        );
        registry.register(
            "last_scrape_zones",
            "Zones fanned out to in the most recent successful scrape",
            last_scrape_zones.clone(),
        );

        Self {
            registry,
            scrapes,
            scrape_failures,
            zone_fetch_failures,
            last_scrape_duration,
            last_scrape_zones,
            last_scrape_failed: AtomicBool::new(false),
        }
    }

    /// Record a completed scrape.
    pub fn record_success(&self, report: &ScrapeReport) {
        self.scrapes.inc();
        self.zone_fetch_failures.inc_by(report.failed() as u64);
        self.last_scrape_duration.set(report.elapsed.as_secs_f64());
        self.last_scrape_zones.set(report.zones as i64);
        self.last_scrape_failed.store(false, Ordering::Relaxed);
    }

    /// Record a scrape that failed as a whole.
    pub fn record_failure(&self, elapsed: Duration) {
        self.scrapes.inc();
        self.scrape_failures.inc();
        self.last_scrape_duration.set(elapsed.as_secs_f64());
        self.last_scrape_failed.store(true, Ordering::Relaxed);
    }

    /// Total scrapes attempted.
    pub fn scrapes(&self) -> u64 {
        self.scrapes.get()
    }

    /// Total scrapes that failed.
    pub fn scrape_failures(&self) -> u64 {
        self.scrape_failures.get()
    }

    /// Total failed zone fetches across all scrapes.
    pub fn zone_fetch_failures(&self) -> u64 {
        self.zone_fetch_failures.get()
    }

    /// Whether the most recent scrape failed.
    pub fn last_scrape_failed(&self) -> bool {
        self.last_scrape_failed.load(Ordering::Relaxed)
    }

    /// Encode the self-metrics in text exposition format.
    pub fn encode(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = encode(&mut output, &self.registry);
        output
    }
}

impl Default for ExporterStats {
    fn default() -> Self {
        Self::new()
    }
}
