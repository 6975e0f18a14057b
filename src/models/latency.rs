// Latency probe results and aggregates

use super::MetricFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

/// Result of one latency probe against one target.
///
/// When the probe yields zero usable samples (or 100% loss) the timing
/// fields are +infinity so any downstream min/avg/max is dominated by the
/// failure instead of silently ignoring it.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyResult {
    pub target: String,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
    pub packet_loss_pct: f64,
    pub status: LinkStatus,
    /// Epoch millis, UTC.
    pub timestamp: u64,
}

impl LatencyResult {
    /// Sentinel result for a probe that produced no usable samples.
    pub fn disconnected(target: &str, timestamp: u64) -> Self {
        Self {
            target: target.to_string(),
            min_ms: f64::INFINITY,
            avg_ms: f64::INFINITY,
            max_ms: f64::INFINITY,
            mdev_ms: f64::INFINITY,
            packet_loss_pct: 100.0,
            status: LinkStatus::Disconnected,
            timestamp,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == LinkStatus::Connected
    }

    pub fn fields(&self) -> MetricFields {
        MetricFields::from([
            ("min".to_string(), self.min_ms),
            ("avg".to_string(), self.avg_ms),
            ("max".to_string(), self.max_ms),
            ("mdev".to_string(), self.mdev_ms),
            ("packet_loss".to_string(), self.packet_loss_pct),
        ])
    }
}

/// Latency figures averaged over a window of results. Carries no status:
/// "no eligible data" is represented by the absence of the aggregate, never
/// by zeros or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyAggregate {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
    pub packet_loss_pct: f64,
}

impl LatencyAggregate {
    pub fn fields(&self) -> MetricFields {
        MetricFields::from([
            ("min".to_string(), self.min_ms),
            ("avg".to_string(), self.avg_ms),
            ("max".to_string(), self.max_ms),
            ("mdev".to_string(), self.mdev_ms),
            ("packet_loss".to_string(), self.packet_loss_pct),
        ])
    }
}
