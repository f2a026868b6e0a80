//! Cloudflare zone analytics client for ZoneSight.
//!
//! [`CloudflareClient`] implements [`zonesight_common::StatsSource`] on top of
//! the v4 REST API:
//!
//! ```text
//! GET {api_url}/zones?page=N&per_page=M                     -> zone list (paginated)
//! GET {api_url}/zones/{id}/analytics/dashboard?since=-MIN   -> zone totals
//! ```
//!
//! Authentication uses either an API token (bearer) or the legacy
//! email + global API key header pair.

pub mod client;
pub mod config;

pub use client::CloudflareClient;
pub use config::CloudflareConfig;
