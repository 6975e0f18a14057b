// Smoothing tests: rolling-window eviction, combined-latency exclusion
// policy, query-path averaging

use netmon::models::{LatencyResult, LinkStatus, MetricFields, MetricPoint};
use netmon::smoothing::{RollingWindow, bucket_means, combine_latency, mean_fields};

fn fields_of(value: f64) -> MetricFields {
    MetricFields::from([("avg".to_string(), value)])
}

fn connected(target: &str, avg_ms: f64) -> LatencyResult {
    LatencyResult {
        target: target.to_string(),
        min_ms: avg_ms - 1.0,
        avg_ms,
        max_ms: avg_ms + 1.0,
        mdev_ms: 0.5,
        packet_loss_pct: 0.0,
        status: LinkStatus::Connected,
        timestamp: 0,
    }
}

#[test]
fn rolling_window_mean_before_and_after_eviction() {
    let mut window = RollingWindow::new(5);
    for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
        window.push(fields_of(v));
    }
    assert_eq!(window.len(), 5);
    let avg = window.average().unwrap();
    assert_eq!(avg["avg"], 3.0); // mean(1..=5)

    window.push(fields_of(6.0));
    assert_eq!(window.len(), 5); // capacity invariant: oldest evicted
    let avg = window.average().unwrap();
    assert_eq!(avg["avg"], 4.0); // mean(2..=6)
}

#[test]
fn rolling_window_empty_is_no_data() {
    let window = RollingWindow::new(5);
    assert!(window.is_empty());
    assert!(window.average().is_none());
}

#[test]
fn rolling_window_averages_sparse_fields_over_carriers() {
    let mut window = RollingWindow::new(3);
    window.push(MetricFields::from([
        ("download".to_string(), 100.0),
        ("download_latency".to_string(), 20.0),
    ]));
    window.push(MetricFields::from([("download".to_string(), 50.0)]));
    let avg = window.average().unwrap();
    assert_eq!(avg["download"], 75.0);
    // Averaged over the one entry that carried it, not diluted by absence.
    assert_eq!(avg["download_latency"], 20.0);
}

#[test]
fn combined_latency_excludes_reference_target() {
    let results = vec![
        connected("8.8.8.8", 10.0),
        connected("1.1.1.1", 20.0),
        connected("192.168.1.1", 0.4),
    ];
    let reference = vec!["192.168.1.1".to_string()];
    let combined = combine_latency(&results, &reference).unwrap();
    assert_eq!(combined.avg_ms, 15.0);
    assert_eq!(combined.min_ms, 14.0);
    assert_eq!(combined.max_ms, 16.0);
}

#[test]
fn combined_latency_excludes_disconnected_target() {
    let results = vec![
        connected("8.8.8.8", 10.0),
        LatencyResult::disconnected("1.1.1.1", 0),
    ];
    let combined = combine_latency(&results, &[]).unwrap();
    // The sentinel infinity must not leak into the combined aggregate.
    assert_eq!(combined.avg_ms, 10.0);
    assert!(combined.avg_ms.is_finite());
}

#[test]
fn combined_latency_no_eligible_target_is_none() {
    let all_down = vec![
        LatencyResult::disconnected("8.8.8.8", 0),
        LatencyResult::disconnected("1.1.1.1", 0),
    ];
    assert!(combine_latency(&all_down, &[]).is_none());

    // Only the reference target is up: still no data.
    let only_reference = vec![connected("192.168.1.1", 0.4)];
    let reference = vec!["192.168.1.1".to_string()];
    assert!(combine_latency(&only_reference, &reference).is_none());

    assert!(combine_latency(&[], &[]).is_none());
}

#[test]
fn mean_fields_empty_window_is_none() {
    assert!(mean_fields(&[]).is_none());
}

#[test]
fn mean_fields_averages_query_points() {
    let points = vec![
        MetricPoint {
            timestamp: 1_000,
            fields: fields_of(10.0),
        },
        MetricPoint {
            timestamp: 2_000,
            fields: fields_of(30.0),
        },
    ];
    let avg = mean_fields(&points).unwrap();
    assert_eq!(avg["avg"], 20.0);
}

#[test]
fn bucket_means_floor_timestamps_and_stay_ordered() {
    let points = vec![
        MetricPoint {
            timestamp: 1_000,
            fields: fields_of(10.0),
        },
        MetricPoint {
            timestamp: 59_000,
            fields: fields_of(20.0),
        },
        MetricPoint {
            timestamp: 61_000,
            fields: fields_of(40.0),
        },
    ];
    let buckets = bucket_means(&points, 60_000);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].0, 0);
    assert_eq!(buckets[0].1["avg"], 15.0);
    assert_eq!(buckets[1].0, 60_000);
    assert_eq!(buckets[1].1["avg"], 40.0);
}
