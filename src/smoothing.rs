// Smoothing and aggregation: rolling windows for live writes, pure
// field-map averaging for the reporting query path.
// DB access stays in metrics_repo; everything here is dependency-free.

use std::collections::{BTreeMap, VecDeque};

use crate::models::{LatencyAggregate, LatencyResult, MetricFields, MetricPoint};

/// Bounded most-recent-N buffer of field maps with an O(1)-amortized
/// moving average. Pushing into a full window evicts the oldest entry.
#[derive(Debug)]
pub struct RollingWindow {
    capacity: usize,
    entries: VecDeque<MetricFields>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, fields: MetricFields) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(fields);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arithmetic mean per field over the window. None when the window is
    /// empty; a field missing from some entries is averaged over the
    /// entries that carry it.
    pub fn average(&self) -> Option<MetricFields> {
        mean_over(self.entries.iter())
    }
}

/// Combined ("overall") latency for one tick: averages across all
/// connected, non-reference targets. A reference target (e.g. the local
/// gateway) never counts toward external connectivity. None when no
/// eligible target is connected.
pub fn combine_latency(
    results: &[LatencyResult],
    reference_targets: &[String],
) -> Option<LatencyAggregate> {
    let eligible: Vec<&LatencyResult> = results
        .iter()
        .filter(|r| r.is_connected())
        .filter(|r| !reference_targets.iter().any(|t| t == &r.target))
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let n = eligible.len() as f64;
    Some(LatencyAggregate {
        min_ms: eligible.iter().map(|r| r.min_ms).sum::<f64>() / n,
        avg_ms: eligible.iter().map(|r| r.avg_ms).sum::<f64>() / n,
        max_ms: eligible.iter().map(|r| r.max_ms).sum::<f64>() / n,
        mdev_ms: eligible.iter().map(|r| r.mdev_ms).sum::<f64>() / n,
        packet_loss_pct: eligible.iter().map(|r| r.packet_loss_pct).sum::<f64>() / n,
    })
}

/// Mean per field over a set of persisted points. None when the set is
/// empty (or no point carries any field) - an empty query window is "no
/// data", never zeros.
pub fn mean_fields(points: &[MetricPoint]) -> Option<MetricFields> {
    mean_over(points.iter().map(|p| &p.fields))
}

/// Mean per field per time bucket. Bucket key is the bucket start
/// (timestamp floored to bucket_ms); buckets come back in time order.
pub fn bucket_means(points: &[MetricPoint], bucket_ms: u64) -> Vec<(u64, MetricFields)> {
    if bucket_ms == 0 {
        return Vec::new();
    }
    let mut by_bucket: BTreeMap<u64, Vec<&MetricFields>> = BTreeMap::new();
    for p in points {
        let bucket = (p.timestamp / bucket_ms) * bucket_ms;
        by_bucket.entry(bucket).or_default().push(&p.fields);
    }
    by_bucket
        .into_iter()
        .filter_map(|(bucket, maps)| {
            mean_over(maps.into_iter()).map(|fields| (bucket, fields))
        })
        .collect()
}

fn mean_over<'a, I>(maps: I) -> Option<MetricFields>
where
    I: Iterator<Item = &'a MetricFields>,
{
    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for fields in maps {
        for (name, value) in fields {
            let entry = sums.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    if sums.is_empty() {
        return None;
    }
    Some(
        sums.into_iter()
            .map(|(name, (sum, count))| (name, sum / count as f64))
            .collect(),
    )
}
