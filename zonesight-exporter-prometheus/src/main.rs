//! Prometheus exporter for Cloudflare zone analytics.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use zonesight_cloudflare::CloudflareClient;
use zonesight_common::{SharedSource, init_tracing};
use zonesight_exporter_prometheus::{
    ExporterConfig, ExporterStats, HttpServer, ZoneCollector, mock,
};

/// Prometheus exporter for Cloudflare zone analytics.
#[derive(Parser, Debug)]
#[command(name = "zonesight-exporter-prometheus")]
#[command(about = "Export Cloudflare zone analytics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long)]
    log_level: Option<String>,

    /// Cloudflare API token (overrides config).
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Serve built-in demo zones instead of calling the Cloudflare API.
    #[arg(long)]
    demo: bool,
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // Apply CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(token) = args.api_token {
        config.cloudflare.api_token = Some(token);
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!("Starting ZoneSight Prometheus Exporter");

    let source: SharedSource = if args.demo {
        warn!("Demo mode: serving built-in zones, the Cloudflare API is not called");
        Arc::new(mock::demo_source())
    } else {
        if !config.cloudflare.has_credentials() {
            anyhow::bail!(
                "No Cloudflare credentials: set cloudflare.api_token (or CLOUDFLARE_API_TOKEN), \
                 or cloudflare.api_email with cloudflare.api_key"
            );
        }
        info!(api_url = %config.cloudflare.api_url, "Using Cloudflare API");
        Arc::new(CloudflareClient::new(config.cloudflare.clone())?)
    };

    // Parse listen address
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let collector = Arc::new(ZoneCollector::new(
        source,
        config.scrape.clone(),
        &config.filters,
    ));
    let stats = Arc::new(ExporterStats::new());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        collector,
        stats.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );

    // Start HTTP server
    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut http_task => {
            // The server only returns on its own if it failed to start or crashed.
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for in-flight scrapes to drain
    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("HTTP server did not stop within 5s"),
        Ok(Ok(Ok(()))) => {}
    }

    info!(
        scrapes = stats.scrapes(),
        scrape_failures = stats.scrape_failures(),
        zone_fetch_failures = stats.zone_fetch_failures(),
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
