//! Integration tests for zonesight-common library.

use std::io::Write;

use serde::Deserialize;
use zonesight_common::{LogFormat, LoggingConfig, ZoneTotals, load_config, parse_config};

#[derive(Debug, Deserialize)]
struct AppConfig {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    totals: ZoneTotals,
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            // JSON5 allows comments and trailing commas
            logging: {{ level: "warn", format: "json", }},
        }}"#
    )
    .unwrap();

    let config: AppConfig = load_config(file.path()).expect("load failed");

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_totals_parse_from_json5() {
    let config: AppConfig = parse_config(
        r#"{
            totals: {
                requests: {
                    all: 100, cached: 60, uncached: 40,
                    ssl: { encrypted: 90, unencrypted: 10 },
                    content_type: { "text/html": 100 },
                    country: { US: 100 },
                    http_status: { "200": 100 },
                },
            },
        }"#,
    )
    .unwrap();

    let requests = &config.totals.requests;
    assert_eq!(requests.all, 100);
    assert_eq!(requests.cached + requests.uncached, requests.all);
    assert_eq!(requests.ssl.encrypted, 90);
    assert_eq!(requests.content_type.get("text/html"), Some(&100));
    assert_eq!(requests.breakdown_len(), 3);
    assert_eq!(config.totals.bandwidth.all, 0);
    assert_eq!(config.logging.level, "info");
}
