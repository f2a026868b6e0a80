//! HTTP server for Prometheus metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::collector::SharedCollector;
use crate::render::{CONTENT_TYPE, render_samples};
use crate::sink::SampleBuffer;
use crate::stats::ExporterStats;

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Readiness endpoint.
pub const READY_PATH: &str = "/ready";

/// Paths served besides the metrics endpoint.
pub const RESERVED_PATHS: [&str; 2] = [HEALTH_PATH, READY_PATH];

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
    stats: Arc<ExporterStats>,
}

/// Create the HTTP router.
fn create_router(collector: SharedCollector, stats: Arc<ExporterStats>, metrics_path: &str) -> Router {
    let state = AppState { collector, stats };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(READY_PATH, get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /metrics endpoint.
///
/// Every request runs one scrape. If the client disconnects, the handler
/// future is dropped and the scrape's in-flight zone fetches are aborted.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let buffer = Arc::new(SampleBuffer::new());

    match state.collector.scrape(buffer.clone()).await {
        Ok(report) => {
            state.stats.record_success(&report);

            let mut body = render_samples(&buffer.take());
            body.push_str(&state.stats.encode());

            debug!(
                zones = report.zones,
                samples = report.samples,
                bytes = body.len(),
                "Served metrics"
            );

            (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            state.stats.record_failure(started.elapsed());
            error!(error = %e, "Scrape failed");

            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("scrape failed: {}\n", e),
            )
                .into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.stats.last_scrape_failed() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready - last scrape failed\n",
        )
            .into_response()
    } else {
        (StatusCode::OK, "ready\n").into_response()
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    collector: SharedCollector,
    stats: Arc<ExporterStats>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        collector: SharedCollector,
        stats: Arc<ExporterStats>,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            collector,
            stats,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        if RESERVED_PATHS.contains(&self.metrics_path.as_str()) {
            anyhow::bail!("Metrics path {} is reserved", self.metrics_path);
        }

        let router = create_router(self.collector, self.stats, &self.metrics_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
