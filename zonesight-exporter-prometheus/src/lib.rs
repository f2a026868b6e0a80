//! Prometheus exporter for Cloudflare zone analytics.
//!
//! This crate exposes per-zone traffic totals (requests and bandwidth, with
//! cache, TLS, content type, country and status breakdowns) via an HTTP
//! `/metrics` endpoint. Nothing is cached between scrapes: each request lists
//! the account's zones and fetches every zone's totals concurrently.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Cloudflare API │<────│    Collector    │<────│   HTTP Server   │
//! │  (zones, totals)│     │ (one task/zone) │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary with a configuration file:
//!
//! ```bash
//! zonesight-exporter-prometheus --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod descriptors;
pub mod http;
pub mod mock;
pub mod render;
pub mod sink;
pub mod stats;

pub use collector::{ScrapeError, ScrapeReport, SharedCollector, ZoneCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use sink::{MetricSink, Sample, SampleBuffer};
pub use stats::ExporterStats;
