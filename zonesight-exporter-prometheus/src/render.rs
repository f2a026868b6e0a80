//! Prometheus text exposition of scrape samples.

use std::collections::HashMap;
use std::fmt::Write;

use crate::descriptors;
use crate::sink::Sample;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render samples in Prometheus exposition format.
///
/// Series appear in catalog order, each with `# HELP` and `# TYPE` lines.
/// Within a series, samples are sorted by label values. Series with no
/// samples are omitted.
pub fn render_samples(samples: &[Sample]) -> String {
    let mut output = String::with_capacity(samples.len() * 80);

    let mut by_name: HashMap<&str, Vec<&Sample>> = HashMap::new();
    for sample in samples {
        by_name
            .entry(sample.descriptor.name)
            .or_default()
            .push(sample);
    }

    for descriptor in descriptors::describe() {
        let Some(series) = by_name.get_mut(descriptor.name) else {
            continue;
        };
        series.sort_by(|a, b| a.label_values.cmp(&b.label_values));

        writeln!(output, "# HELP {} {}", descriptor.name, escape_help(descriptor.help)).ok();
        writeln!(output, "# TYPE {} {}", descriptor.name, series[0].kind.as_str()).ok();

        for sample in series.iter() {
            writeln!(
                output,
                "{}{} {}",
                descriptor.name,
                format_labels(sample),
                format_value(sample.value)
            )
            .ok();
        }
    }

    output
}

/// Format a sample's labels as `{k="v",...}`.
fn format_labels(sample: &Sample) -> String {
    let parts: Vec<String> = sample
        .labels()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    if parts.is_empty() {
        return String::new();
    }
    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in HELP text.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
