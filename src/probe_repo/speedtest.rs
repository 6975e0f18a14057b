// Speedtest JSON document parsing. Bandwidth arrives as bytes/sec and is
// converted to Mbps (x8 / 1_000_000); loaded-latency figures are optional.

use serde::Deserialize;

use crate::models::ThroughputResult;

#[derive(Debug, Deserialize)]
struct SpeedtestDocument {
    ping: Option<PingSection>,
    download: Option<TransferSection>,
    upload: Option<TransferSection>,
}

#[derive(Debug, Deserialize)]
struct PingSection {
    latency: Option<f64>,
    jitter: Option<f64>,
    low: Option<f64>,
    high: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TransferSection {
    bandwidth: Option<f64>,
    latency: Option<LoadedLatency>,
}

#[derive(Debug, Deserialize)]
struct LoadedLatency {
    iqm: Option<f64>,
    low: Option<f64>,
    high: Option<f64>,
}

const BYTES_PER_SEC_TO_MBPS: f64 = 8.0 / 1_000_000.0;

/// Parse one speedtest run. None when the document is malformed or lacks
/// the core bandwidth/latency figures - the caller treats that as "skip
/// this cycle".
pub fn parse_speedtest_json(raw: &str, timestamp: u64) -> Option<ThroughputResult> {
    let doc: SpeedtestDocument = match serde_json::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(error = %e, operation = "parse_speedtest", "speedtest output is not valid JSON");
            return None;
        }
    };

    let ping = doc.ping?;
    let download = doc.download?;
    let upload = doc.upload?;

    let download_mbps = download.bandwidth? * BYTES_PER_SEC_TO_MBPS;
    let upload_mbps = upload.bandwidth? * BYTES_PER_SEC_TO_MBPS;
    let ping_ms = ping.latency?;
    let jitter_ms = ping.jitter?;

    let (download_latency_ms, download_latency_low_ms, download_latency_high_ms) =
        loaded(download.latency);
    let (upload_latency_ms, upload_latency_low_ms, upload_latency_high_ms) =
        loaded(upload.latency);

    Some(ThroughputResult {
        download_mbps,
        upload_mbps,
        ping_ms,
        jitter_ms,
        idle_latency_low_ms: ping.low,
        idle_latency_high_ms: ping.high,
        download_latency_ms,
        download_latency_low_ms,
        download_latency_high_ms,
        upload_latency_ms,
        upload_latency_low_ms,
        upload_latency_high_ms,
        timestamp,
    })
}

fn loaded(section: Option<LoadedLatency>) -> (Option<f64>, Option<f64>, Option<f64>) {
    match section {
        Some(l) => (l.iqm, l.low, l.high),
        None => (None, None, None),
    }
}
