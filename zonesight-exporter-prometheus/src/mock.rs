//! In-memory stats source for tests and demo mode.
//!
//! Provides a configurable [`StatsSource`] so the exporter can run without
//! reaching the real upstream API.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use zonesight_common::{SourceError, SslTotals, StatsSource, TrafficTotals, Zone, ZoneTotals};

/// Configurable fake source.
#[derive(Debug, Default)]
pub struct MockSource {
    zones: Vec<Zone>,
    totals: HashMap<String, ZoneTotals>,
    zone_errors: HashMap<String, SourceError>,
    panicking: HashSet<String>,
    list_error: Option<SourceError>,
    latency: Duration,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetches_completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockSource {
    /// Create an empty source (no zones).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone whose totals fetch succeeds.
    pub fn with_zone(mut self, zone: Zone, totals: ZoneTotals) -> Self {
        self.totals.insert(zone.id.clone(), totals);
        self.zones.push(zone);
        self
    }

    /// Add a listed zone whose totals fetch fails.
    pub fn with_failing_zone(mut self, zone: Zone, error: SourceError) -> Self {
        self.zone_errors.insert(zone.id.clone(), error);
        self.zones.push(zone);
        self
    }

    /// Add a listed zone whose totals fetch panics.
    pub fn with_panicking_zone(mut self, zone: Zone) -> Self {
        self.panicking.insert(zone.id.clone());
        self.zones.push(zone);
        self
    }

    /// Make the zone listing fail.
    pub fn with_list_error(mut self, error: SourceError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Delay every totals fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `list_zones` calls.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_zone_totals` calls started.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_zone_totals` calls that ran to completion.
    pub fn fetches_completed(&self) -> usize {
        self.fetches_completed.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous totals fetches observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for MockSource {
    async fn list_zones(&self) -> Result<Vec<Zone>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.list_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.zones.clone()),
        }
    }

    async fn fetch_zone_totals(&self, zone_id: &str) -> Result<ZoneTotals, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.fetches_completed.fetch_add(1, Ordering::SeqCst);

        if self.panicking.contains(zone_id) {
            panic!("mock source panicked for zone {}", zone_id);
        }
        if let Some(e) = self.zone_errors.get(zone_id) {
            return Err(e.clone());
        }
        self.totals
            .get(zone_id)
            .cloned()
            .ok_or_else(|| SourceError::not_found(zone_id))
    }
}

/// Build a traffic group from scalar totals and breakdown entries.
///
/// `all` is split 60/40 into cached/uncached and 90/10 into encrypted/unencrypted.
pub fn traffic(
    all: u64,
    content_types: &[(&str, u64)],
    countries: &[(&str, u64)],
    statuses: &[(&str, u64)],
) -> TrafficTotals {
    let cached = all * 6 / 10;
    let encrypted = all * 9 / 10;
    TrafficTotals {
        all,
        cached,
        uncached: all - cached,
        ssl: SslTotals {
            encrypted,
            unencrypted: all - encrypted,
        },
        content_type: to_map(content_types),
        country: to_map(countries),
        http_status: to_map(statuses),
    }
}

fn to_map(entries: &[(&str, u64)]) -> std::collections::BTreeMap<String, u64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Totals with one entry per breakdown, for both requests and bandwidth.
pub fn single_entry_totals() -> ZoneTotals {
    ZoneTotals {
        requests: traffic(100, &[("text/html", 100)], &[("US", 100)], &[("200", 100)]),
        bandwidth: traffic(5000, &[("text/html", 5000)], &[("US", 5000)], &[("200", 5000)]),
    }
}

/// A small fleet of zones with plausible traffic, used by `--demo`.
pub fn demo_source() -> MockSource {
    MockSource::new()
        .with_zone(
            Zone::new("demo-zone-1", "example.com"),
            ZoneTotals {
                requests: traffic(
                    1_250_000,
                    &[("html", 400_000), ("javascript", 350_000), ("png", 500_000)],
                    &[("US", 900_000), ("DE", 200_000), ("JP", 150_000)],
                    &[("200", 1_200_000), ("304", 40_000), ("404", 10_000)],
                ),
                bandwidth: traffic(
                    48_000_000_000,
                    &[("html", 8_000_000_000), ("png", 40_000_000_000)],
                    &[("US", 30_000_000_000), ("DE", 18_000_000_000)],
                    &[("200", 48_000_000_000)],
                ),
            },
        )
        .with_zone(
            Zone::new("demo-zone-2", "shop.example.org"),
            ZoneTotals {
                requests: traffic(
                    320_000,
                    &[("html", 120_000), ("json", 200_000)],
                    &[("FR", 320_000)],
                    &[("200", 300_000), ("500", 20_000)],
                ),
                bandwidth: traffic(
                    2_400_000_000,
                    &[("html", 900_000_000), ("json", 1_500_000_000)],
                    &[("FR", 2_400_000_000)],
                    &[("200", 2_300_000_000), ("500", 100_000_000)],
                ),
            },
        )
        .with_latency(Duration::from_millis(50))
}
