//! Scrape-time translation of zone totals into metric samples.
//!
//! Each scrape lists zones once, then runs one task per zone that fetches the
//! zone's totals and flattens them into samples. The scrape returns only after
//! every task has finished (the `JoinSet` is drained), and dropping a scrape
//! mid-flight drops the `JoinSet`, which aborts any fetch still running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};
use zonesight_common::{SharedSource, SourceError, TrafficTotals, Zone, ZoneTotals};

use crate::config::{FilterConfig, ScrapeConfig};
use crate::descriptors::{self, BANDWIDTH, Descriptor, REQUESTS, TrafficDescriptors};
use crate::sink::{MetricSink, Sample};

/// Errors that fail a whole scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The zone list could not be fetched; nothing was emitted.
    #[error("Failed to list zones: {0}")]
    ZoneList(#[source] SourceError),

    /// Strict mode only: at least one zone fetch failed.
    #[error("{failed} of {total} zone fetches failed")]
    ZoneFetch { failed: usize, total: usize },

    /// The scrape deadline elapsed; in-flight fetches were abandoned.
    #[error("Scrape timed out after {0:?}")]
    Timeout(Duration),
}

/// A zone whose totals could not be fetched during a scrape.
#[derive(Debug, Clone)]
pub struct ZoneFailure {
    pub zone: Zone,
    pub error: SourceError,
}

/// Outcome of a completed scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    /// Zones fanned out to (after filtering).
    pub zones: usize,
    /// Zones dropped by the zone filter.
    pub filtered: usize,
    /// Zones whose samples were emitted.
    pub succeeded: usize,
    /// Total samples emitted.
    pub samples: usize,
    /// Zones whose fetch returned an error.
    pub failures: Vec<ZoneFailure>,
    /// Units that panicked or were cancelled.
    pub aborted: usize,
    /// Wall-clock duration of the scrape.
    pub elapsed: Duration,
}

impl ScrapeReport {
    /// Number of zones that contributed no samples.
    pub fn failed(&self) -> usize {
        self.failures.len() + self.aborted
    }
}

/// Zone filter using glob patterns on zone names.
pub struct ZoneFilter {
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
}

impl ZoneFilter {
    /// Create a new filter from configuration.
    ///
    /// Invalid patterns are skipped; configuration validation reports them.
    pub fn new(config: &FilterConfig) -> Self {
        let compile = |patterns: &[String]| -> Vec<glob::Pattern> {
            patterns
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect()
        };

        Self {
            include: compile(config.include_zones.as_slice()),
            exclude: compile(config.exclude_zones.as_slice()),
        }
    }

    /// Check if a zone should be scraped.
    pub fn should_include(&self, zone: &Zone) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(&zone.name)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(&zone.name))
    }
}

impl Default for ZoneFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

/// Flatten one zone's totals into samples.
///
/// Order: request scalars, request breakdowns (content type, country,
/// status), then the same for bandwidth. Breakdown entries follow key order.
/// Only keys present in the snapshot produce samples.
pub fn zone_samples(zone_name: &str, totals: &ZoneTotals) -> Vec<Sample> {
    let capacity =
        10 + totals.requests.breakdown_len() + totals.bandwidth.breakdown_len();
    let mut samples = Vec::with_capacity(capacity);

    push_traffic(&mut samples, &REQUESTS, zone_name, &totals.requests);
    push_traffic(&mut samples, &BANDWIDTH, zone_name, &totals.bandwidth);

    samples
}

fn push_traffic(
    out: &mut Vec<Sample>,
    series: &TrafficDescriptors,
    zone: &str,
    traffic: &TrafficTotals,
) {
    let scalar = |descriptor, value| Sample::counter(descriptor, value, vec![zone.to_string()]);

    out.push(scalar(series.total, traffic.all));
    out.push(scalar(series.cached, traffic.cached));
    out.push(scalar(series.uncached, traffic.uncached));
    out.push(scalar(series.ssl_encrypted, traffic.ssl.encrypted));
    out.push(scalar(series.ssl_unencrypted, traffic.ssl.unencrypted));

    for (descriptor, breakdown) in [
        (series.content_type, &traffic.content_type),
        (series.country, &traffic.country),
        (series.status, &traffic.http_status),
    ] {
        for (key, value) in breakdown {
            out.push(Sample::counter(
                descriptor,
                *value,
                vec![zone.to_string(), key.clone()],
            ));
        }
    }
}

/// How a finished unit delivered its samples.
enum Delivery {
    /// Samples were written to the sink by the unit itself.
    Emitted(usize),
    /// Samples are held until the join barrier (strict mode).
    Held(Vec<Sample>),
}

/// Fetch one zone's totals and deliver its samples.
async fn zone_unit(
    source: SharedSource,
    zone: Zone,
    sink: Option<Arc<dyn MetricSink>>,
    limiter: Option<Arc<Semaphore>>,
) -> (Zone, Result<Delivery, SourceError>) {
    // Acquire only fails on a closed semaphore; ours is never closed.
    let _permit = match limiter {
        Some(limiter) => limiter.acquire_owned().await.ok(),
        None => None,
    };

    let result = source.fetch_zone_totals(&zone.id).await.map(|totals| {
        let samples = zone_samples(&zone.name, &totals);
        match &sink {
            Some(sink) => {
                let count = samples.len();
                sink.emit_all(samples);
                Delivery::Emitted(count)
            }
            None => Delivery::Held(samples),
        }
    });

    (zone, result)
}

/// Translates upstream zone analytics into metric samples on each scrape.
pub struct ZoneCollector {
    source: SharedSource,
    config: ScrapeConfig,
    filter: ZoneFilter,
    limiter: Option<Arc<Semaphore>>,
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<ZoneCollector>;

impl ZoneCollector {
    /// Create a new collector.
    pub fn new(source: SharedSource, config: ScrapeConfig, filters: &FilterConfig) -> Self {
        let limiter = (config.max_concurrency > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrency)));

        Self {
            source,
            config,
            filter: ZoneFilter::new(filters),
            limiter,
        }
    }

    /// The static descriptor catalog.
    pub fn describe(&self) -> &'static [Descriptor] {
        descriptors::describe()
    }

    /// Run one scrape bounded by the configured deadline.
    pub async fn scrape(&self, sink: Arc<dyn MetricSink>) -> Result<ScrapeReport, ScrapeError> {
        let deadline = self.config.timeout();
        match tokio::time::timeout(deadline, self.collect(sink)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = deadline.as_secs(), "Scrape deadline elapsed");
                Err(ScrapeError::Timeout(deadline))
            }
        }
    }

    /// Run one full fetch-and-flatten cycle, writing samples to `sink`.
    pub async fn collect(&self, sink: Arc<dyn MetricSink>) -> Result<ScrapeReport, ScrapeError> {
        let started = Instant::now();

        let listed = self.source.list_zones().await.map_err(ScrapeError::ZoneList)?;
        let listed_count = listed.len();
        let zones: Vec<Zone> = listed
            .into_iter()
            .filter(|z| self.filter.should_include(z))
            .collect();

        let strict = self.config.fail_on_zone_error;
        let mut report = ScrapeReport {
            zones: zones.len(),
            filtered: listed_count - zones.len(),
            ..Default::default()
        };

        let mut units = JoinSet::new();
        for zone in zones {
            let direct = (!strict).then(|| sink.clone());
            units.spawn(zone_unit(
                self.source.clone(),
                zone,
                direct,
                self.limiter.clone(),
            ));
        }

        let mut held = Vec::new();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((zone, Ok(Delivery::Emitted(count)))) => {
                    trace!(zone = %zone.name, samples = count, "Zone emitted");
                    report.succeeded += 1;
                    report.samples += count;
                }
                Ok((zone, Ok(Delivery::Held(samples)))) => {
                    trace!(zone = %zone.name, samples = samples.len(), "Zone held");
                    report.succeeded += 1;
                    report.samples += samples.len();
                    held.push(samples);
                }
                Ok((zone, Err(error))) => {
                    warn!(
                        zone = %zone.name,
                        zone_id = %zone.id,
                        error = %error,
                        "Zone totals fetch failed"
                    );
                    report.failures.push(ZoneFailure { zone, error });
                }
                Err(e) => {
                    warn!(error = %e, "Zone task did not complete");
                    report.aborted += 1;
                }
            }
        }

        report.elapsed = started.elapsed();

        if strict && report.failed() > 0 {
            return Err(ScrapeError::ZoneFetch {
                failed: report.failed(),
                total: report.zones,
            });
        }

        for samples in held {
            sink.emit_all(samples);
        }

        debug!(
            zones = report.zones,
            filtered = report.filtered,
            failed = report.failed(),
            samples = report.samples,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scrape completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::MetricKind;
    use crate::mock::{MockSource, single_entry_totals, traffic};
    use crate::sink::SampleBuffer;

    fn collector_with(source: MockSource, config: ScrapeConfig) -> (Arc<MockSource>, ZoneCollector) {
        let source = Arc::new(source);
        let collector = ZoneCollector::new(source.clone(), config, &FilterConfig::default());
        (source, collector)
    }

    fn names(samples: &[Sample]) -> Vec<&'static str> {
        samples.iter().map(|s| s.descriptor.name).collect()
    }

    #[test]
    fn test_zone_samples_order() {
        let samples = zone_samples("example.com", &single_entry_totals());

        assert_eq!(
            names(&samples),
            vec![
                "cloudflare_zone_requests_total",
                "cloudflare_zone_requests_cached",
                "cloudflare_zone_requests_uncached",
                "cloudflare_zone_requests_ssl_encrypted",
                "cloudflare_zone_requests_ssl_unencrypted",
                "cloudflare_zone_requests_content_type",
                "cloudflare_zone_requests_country",
                "cloudflare_zone_requests_status",
                "cloudflare_zone_bandwidth_total",
                "cloudflare_zone_bandwidth_cached",
                "cloudflare_zone_bandwidth_uncached",
                "cloudflare_zone_bandwidth_ssl_encrypted",
                "cloudflare_zone_bandwidth_ssl_unencrypted",
                "cloudflare_zone_bandwidth_content_type",
                "cloudflare_zone_bandwidth_country",
                "cloudflare_zone_bandwidth_status",
            ]
        );
        assert!(samples.iter().all(|s| s.kind == MetricKind::Counter));
        assert!(samples.iter().all(|s| s.label("zone") == Some("example.com")));
    }

    #[test]
    fn test_zone_samples_scalar_values() {
        let samples = zone_samples("example.com", &single_entry_totals());

        let values: Vec<f64> = samples[..5].iter().map(|s| s.value).collect();
        assert_eq!(values, vec![100.0, 60.0, 40.0, 90.0, 10.0]);
        assert_eq!(samples[8].value, 5000.0);
    }

    #[test]
    fn test_breakdown_cardinality_matches_mapping() {
        let totals = ZoneTotals {
            requests: traffic(13, &[("text/html", 10), ("image/png", 3)], &[], &[]),
            bandwidth: TrafficTotals::default(),
        };
        let samples = zone_samples("example.com", &totals);

        let content: Vec<_> = samples
            .iter()
            .filter(|s| s.descriptor == REQUESTS.content_type)
            .map(|s| (s.label("content_type").unwrap(), s.value))
            .collect();
        assert_eq!(content, vec![("image/png", 3.0), ("text/html", 10.0)]);

        // No padding for empty breakdowns: 5 scalars + 2 content types, 5 bandwidth scalars.
        assert_eq!(samples.len(), 12);
        assert!(!samples.iter().any(|s| s.descriptor == REQUESTS.country));
    }

    #[test]
    fn test_zone_filter() {
        let filter = ZoneFilter::new(&FilterConfig {
            include_zones: vec!["*.example.com".to_string()],
            exclude_zones: vec!["staging.*".to_string()],
        });

        assert!(filter.should_include(&Zone::new("1", "www.example.com")));
        assert!(!filter.should_include(&Zone::new("2", "staging.example.com")));
        assert!(!filter.should_include(&Zone::new("3", "example.org")));
        assert!(ZoneFilter::default().should_include(&Zone::new("4", "anything")));
    }

    #[tokio::test]
    async fn test_collect_single_zone() {
        let (_, collector) = collector_with(
            MockSource::new().with_zone(Zone::new("z1", "example.com"), single_entry_totals()),
            ScrapeConfig::default(),
        );
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.zones, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.samples, 16);
        assert_eq!(buffer.len(), 16);
    }

    #[tokio::test]
    async fn test_collect_no_zones() {
        let (source, collector) = collector_with(MockSource::new(), ScrapeConfig::default());
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.zones, 0);
        assert_eq!(report.samples, 0);
        assert!(buffer.is_empty());
        assert_eq!(source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_zone_list_failure_fails_scrape() {
        let (source, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "example.com"), single_entry_totals())
                .with_list_error(SourceError::unavailable("auth")),
            ScrapeConfig::default(),
        );
        let buffer = Arc::new(SampleBuffer::new());

        let err = collector.collect(buffer.clone()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::ZoneList(SourceError::SourceUnavailable(_))));
        assert!(buffer.is_empty());
        assert_eq!(source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_zone_is_omitted() {
        let (_, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_failing_zone(Zone::new("z2", "b.example"), SourceError::not_found("z2"))
                .with_zone(Zone::new("z3", "c.example"), single_entry_totals()),
            ScrapeConfig::default(),
        );
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].zone.name, "b.example");
        let samples = buffer.take();
        assert_eq!(samples.len(), 32);
        assert!(!samples.iter().any(|s| s.label("zone") == Some("b.example")));
    }

    #[tokio::test]
    async fn test_strict_mode_fails_scrape_and_emits_nothing() {
        let (_, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_failing_zone(
                    Zone::new("z2", "b.example"),
                    SourceError::unavailable("timeout"),
                ),
            ScrapeConfig {
                fail_on_zone_error: true,
                ..Default::default()
            },
        );
        let buffer = Arc::new(SampleBuffer::new());

        let err = collector.collect(buffer.clone()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::ZoneFetch { failed: 1, total: 2 }));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_success_emits_after_barrier() {
        let (_, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_zone(Zone::new("z2", "b.example"), single_entry_totals()),
            ScrapeConfig {
                fail_on_zone_error: true,
                ..Default::default()
            },
        );
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.samples, 32);
        assert_eq!(buffer.len(), 32);
    }

    #[tokio::test]
    async fn test_panicking_zone_is_isolated() {
        let (_, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_panicking_zone(Zone::new("z2", "b.example")),
            ScrapeConfig::default(),
        );
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.aborted, 1);
        assert_eq!(buffer.len(), 16);
    }

    #[tokio::test]
    async fn test_filtered_zones_are_not_fetched() {
        let source = Arc::new(
            MockSource::new()
                .with_zone(Zone::new("z1", "www.example.com"), single_entry_totals())
                .with_zone(Zone::new("z2", "staging.example.com"), single_entry_totals()),
        );
        let collector = ZoneCollector::new(
            source.clone(),
            ScrapeConfig::default(),
            &FilterConfig {
                exclude_zones: vec!["staging.*".to_string()],
                ..Default::default()
            },
        );
        let buffer = Arc::new(SampleBuffer::new());

        let report = collector.collect(buffer.clone()).await.unwrap();

        assert_eq!(report.zones, 1);
        assert_eq!(report.filtered, 1);
        assert_eq!(source.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_scrape_timeout_abandons_fetches() {
        let (source, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_latency(Duration::from_millis(300)),
            ScrapeConfig {
                timeout_secs: 1,
                ..Default::default()
            },
        );
        let buffer = Arc::new(SampleBuffer::new());

        // Drive `collect` directly with a shorter deadline than the fetch latency.
        let result =
            tokio::time::timeout(Duration::from_millis(50), collector.collect(buffer.clone())).await;
        assert!(result.is_err());
        assert_eq!(source.fetch_calls(), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.fetches_completed(), 0);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_deadline_reports_timeout() {
        let (_, collector) = collector_with(
            MockSource::new()
                .with_zone(Zone::new("z1", "a.example"), single_entry_totals())
                .with_latency(Duration::from_millis(1500)),
            ScrapeConfig {
                timeout_secs: 1,
                ..Default::default()
            },
        );

        let err = collector
            .scrape(Arc::new(SampleBuffer::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_describe_matches_catalog() {
        let (_, collector) = collector_with(MockSource::new(), ScrapeConfig::default());
        assert_eq!(collector.describe(), descriptors::describe());
        assert_eq!(collector.describe().len(), 16);
    }
}
