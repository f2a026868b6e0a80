//! Upstream statistics source abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Zone, ZoneTotals};

/// Errors returned by a [`StatsSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Network, transport or authentication failure reaching the source.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The zone id is not known to the source (e.g., deleted since listing).
    #[error("Zone not found: {0}")]
    NotFound(String),

    /// A response arrived but could not be decoded.
    #[error("Failed to decode source response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Create a source-unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(zone_id: impl Into<String>) -> Self {
        Self::NotFound(zone_id.into())
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A source of per-zone traffic analytics.
///
/// Implementations must be usable from several tasks at once: the exporter
/// fans out one [`fetch_zone_totals`](Self::fetch_zone_totals) call per zone.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// List every zone currently visible to the source.
    async fn list_zones(&self) -> Result<Vec<Zone>, SourceError>;

    /// Fetch the aggregate totals snapshot for one zone.
    async fn fetch_zone_totals(&self, zone_id: &str) -> Result<ZoneTotals, SourceError>;
}

/// Shareable source handle.
pub type SharedSource = Arc<dyn StatsSource>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SourceError::unavailable("connection refused").to_string(),
            "Source unavailable: connection refused"
        );
        assert_eq!(
            SourceError::not_found("z1").to_string(),
            "Zone not found: z1"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(SourceError::not_found("z1").is_not_found());
        assert!(!SourceError::unavailable("x").is_not_found());
        assert!(!SourceError::Decode("x".to_string()).is_not_found());
    }
}
