// Throughput probe result (bandwidth + latency under load)

use super::MetricFields;

/// Result of one throughput probe. Bandwidth figures are Mbps (raw
/// bytes/sec x 8 / 1_000_000). Loaded-latency bounds are optional: the
/// external tool omits them for some server/plan combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputResult {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub jitter_ms: f64,
    pub idle_latency_low_ms: Option<f64>,
    pub idle_latency_high_ms: Option<f64>,
    pub download_latency_ms: Option<f64>,
    pub download_latency_low_ms: Option<f64>,
    pub download_latency_high_ms: Option<f64>,
    pub upload_latency_ms: Option<f64>,
    pub upload_latency_low_ms: Option<f64>,
    pub upload_latency_high_ms: Option<f64>,
    /// Epoch millis, UTC.
    pub timestamp: u64,
}

impl ThroughputResult {
    /// Field map for persistence. Optional fields are skipped when absent,
    /// never written as zero.
    pub fn fields(&self) -> MetricFields {
        let mut fields = MetricFields::from([
            ("download".to_string(), self.download_mbps),
            ("upload".to_string(), self.upload_mbps),
            ("ping".to_string(), self.ping_ms),
            ("jitter".to_string(), self.jitter_ms),
        ]);
        let optional = [
            ("idle_latency_low", self.idle_latency_low_ms),
            ("idle_latency_high", self.idle_latency_high_ms),
            ("download_latency", self.download_latency_ms),
            ("download_latency_low", self.download_latency_low_ms),
            ("download_latency_high", self.download_latency_high_ms),
            ("upload_latency", self.upload_latency_ms),
            ("upload_latency_low", self.upload_latency_low_ms),
            ("upload_latency_high", self.upload_latency_high_ms),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                fields.insert(name.to_string(), v);
            }
        }
        fields
    }
}
