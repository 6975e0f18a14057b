// Ping output parsing. Line-oriented: per-packet "time=" fields, a
// "packets transmitted" statistics line, and a min/avg/max/mdev quadruple.

use crate::models::{LatencyResult, LinkStatus};

/// Parse one ping run. Never fails: zero usable samples degrade to the
/// disconnected sentinel, a missing statistics line degrades to a
/// best-effort loss figure and mdev = 0.0.
pub fn parse_ping_output(
    output: &str,
    target: &str,
    requested_packets: u32,
    timestamp: u64,
) -> LatencyResult {
    let mut rtts: Vec<f64> = Vec::new();
    let mut transmitted: u32 = 0;
    let mut received: u32 = 0;
    let mut mdev: Option<f64> = None;

    for line in output.lines() {
        if let Some(rest) = line.split_once("time=").map(|(_, r)| r) {
            let token = rest.split_whitespace().next().unwrap_or("");
            if let Ok(ms) = token.trim_end_matches("ms").parse::<f64>() {
                rtts.push(ms);
            }
        } else if line.contains("packets transmitted") {
            let mut parts = line.split(", ");
            transmitted = first_number(parts.next()).unwrap_or(0);
            received = first_number(parts.next()).unwrap_or(0);
        }
        if line.contains("min/avg/max") {
            mdev = line
                .split(" = ")
                .nth(1)
                .and_then(|stats| stats.split('/').nth(3))
                .and_then(|s| s.trim_end_matches("ms").trim().parse::<f64>().ok());
        }
    }

    if rtts.is_empty() {
        return LatencyResult::disconnected(target, timestamp);
    }

    // Loss from the statistics line; when that line is missing or
    // malformed, fall back to parsed samples vs. requested count.
    let packet_loss_pct = if transmitted > 0 {
        100.0 - (received as f64 / transmitted as f64 * 100.0)
    } else if requested_packets > 0 {
        100.0 - (rtts.len() as f64 / requested_packets as f64 * 100.0)
    } else {
        0.0
    };

    if packet_loss_pct >= 100.0 {
        return LatencyResult::disconnected(target, timestamp);
    }

    let min_ms = rtts.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = rtts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg_ms = rtts.iter().sum::<f64>() / rtts.len() as f64;

    LatencyResult {
        target: target.to_string(),
        min_ms,
        avg_ms,
        max_ms,
        mdev_ms: mdev.unwrap_or(0.0),
        packet_loss_pct,
        status: LinkStatus::Connected,
        timestamp,
    }
}

fn first_number(part: Option<&str>) -> Option<u32> {
    part?.split_whitespace().next()?.parse().ok()
}
