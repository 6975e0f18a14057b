// Domain models (probe results, aggregates, reports)

mod latency;
mod report;
mod throughput;

use std::collections::BTreeMap;

pub use latency::{LatencyAggregate, LatencyResult, LinkStatus};
pub use report::{LATEST_REPORT_TAG, Report};
pub use throughput::ThroughputResult;

/// Field map written to / read from the metrics store. Keys are field names,
/// values are the measured numbers. Absent key = no data for that field.
pub type MetricFields = BTreeMap<String, f64>;

/// One stored point of a metric series.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Epoch millis, UTC.
    pub timestamp: u64,
    pub fields: MetricFields,
}
