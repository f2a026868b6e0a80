//! Samples and the sinks they are written to during a scrape.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::descriptors::{Descriptor, MetricKind};

/// One emitted data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The series this sample belongs to.
    pub descriptor: &'static Descriptor,
    /// Metric type declared for the sample.
    pub kind: MetricKind,
    /// The sample value.
    pub value: f64,
    /// Label values, positionally matching `descriptor.labels`.
    pub label_values: Vec<String>,
}

impl Sample {
    /// Create a counter sample.
    pub fn counter(descriptor: &'static Descriptor, value: u64, label_values: Vec<String>) -> Self {
        debug_assert_eq!(descriptor.labels.len(), label_values.len());
        Self {
            descriptor,
            kind: MetricKind::Counter,
            value: value as f64,
            label_values,
        }
    }

    /// Label name/value pairs in schema order.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.descriptor
            .labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Get the value of a label by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().find(|(k, _)| *k == name).map(|(_, v)| v)
    }
}

/// Destination for samples produced by concurrent per-zone units.
///
/// Implementations must tolerate interleaved calls from several tasks.
/// No ordering across zones is guaranteed.
pub trait MetricSink: Send + Sync {
    /// Accept one sample.
    fn emit(&self, sample: Sample);

    /// Accept a batch of samples.
    fn emit_all(&self, samples: Vec<Sample>) {
        for sample in samples {
            self.emit(sample);
        }
    }
}

/// Mutex-guarded sample collector.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Mutex<Vec<Sample>>,
}

impl SampleBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Take all buffered samples, leaving the buffer empty.
    pub fn take(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }
}

impl MetricSink for SampleBuffer {
    fn emit(&self, sample: Sample) {
        self.samples.lock().push(sample);
    }

    // One lock per zone rather than per sample.
    fn emit_all(&self, samples: Vec<Sample>) {
        self.samples.lock().extend(samples);
    }
}

impl MetricSink for mpsc::UnboundedSender<Sample> {
    fn emit(&self, sample: Sample) {
        // A closed receiver means the consumer gave up on this scrape.
        let _ = self.send(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{BANDWIDTH, REQUESTS};
    use std::sync::Arc;

    #[test]
    fn test_counter_sample() {
        let sample = Sample::counter(
            REQUESTS.country,
            42,
            vec!["example.com".to_string(), "US".to_string()],
        );

        assert_eq!(sample.kind, MetricKind::Counter);
        assert_eq!(sample.value, 42.0);
        assert_eq!(sample.label("zone"), Some("example.com"));
        assert_eq!(sample.label("country"), Some("US"));
        assert_eq!(sample.label("status"), None);
    }

    #[test]
    fn test_buffer_take_empties() {
        let buffer = SampleBuffer::new();
        buffer.emit(Sample::counter(
            BANDWIDTH.total,
            1,
            vec!["a".to_string()],
        ));
        buffer.emit_all(vec![
            Sample::counter(BANDWIDTH.cached, 2, vec!["a".to_string()]),
            Sample::counter(BANDWIDTH.uncached, 3, vec!["a".to_string()]),
        ]);

        assert_eq!(buffer.len(), 3);
        let taken = buffer.take();
        assert_eq!(taken.len(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_concurrent_appends() {
        let buffer = Arc::new(SampleBuffer::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        buffer.emit(Sample::counter(
                            REQUESTS.total,
                            i,
                            vec![format!("zone{}", t)],
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(buffer.len(), 800);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(Sample::counter(REQUESTS.total, 5, vec!["z".to_string()]));
        drop(tx);

        let sample = rx.recv().await.unwrap();
        assert_eq!(sample.value, 5.0);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<Sample>();
        drop(rx);
        // Must not panic.
        tx.emit(Sample::counter(REQUESTS.total, 5, vec!["z".to_string()]));
    }
}
