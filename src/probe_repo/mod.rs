// External measurement commands (ping, speedtest) behind one repo.
// Probes never error out to the caller: a failed latency probe is a
// disconnected sentinel, a failed throughput probe is None.

mod ping;
mod speedtest;

pub use ping::parse_ping_output;
pub use speedtest::parse_speedtest_json;

use crate::config::MonitoringConfig;
use crate::models::{LatencyResult, ThroughputResult};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::Duration;
use tracing::instrument;

/// Slack added to the worst-case ping duration (count x per-packet wait)
/// before the whole call is cut off.
const PING_DEADLINE_SLACK_SECS: u64 = 5;

pub struct ProbeRepo {
    ping_command: String,
    ping_count: u32,
    ping_timeout_secs: u64,
    speedtest_command: String,
    speedtest_timeout_secs: u64,
}

impl ProbeRepo {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            ping_command: config.ping_command.clone(),
            ping_count: config.ping_count,
            ping_timeout_secs: config.ping_timeout_secs,
            speedtest_command: config.speedtest_command.clone(),
            speedtest_timeout_secs: config.speedtest_timeout_secs,
        }
    }

    /// One latency probe against one target. Spawn failures, timeouts and
    /// unparseable output all classify as disconnected.
    #[instrument(skip(self), fields(repo = "probe", operation = "ping"))]
    pub async fn ping(&self, target: &str) -> LatencyResult {
        let timestamp = now_epoch_ms();
        let deadline = Duration::from_secs(
            self.ping_count as u64 * self.ping_timeout_secs + PING_DEADLINE_SLACK_SECS,
        );

        let mut cmd = Command::new(&self.ping_command);
        cmd.arg("-c")
            .arg(self.ping_count.to_string())
            .arg("-W")
            .arg(self.ping_timeout_secs.to_string())
            .arg(target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, target, "ping command failed to run");
                return LatencyResult::disconnected(target, timestamp);
            }
            Err(_) => {
                tracing::warn!(target, deadline_secs = deadline.as_secs(), "ping timed out");
                return LatencyResult::disconnected(target, timestamp);
            }
        };

        // ping exits non-zero when packets are lost; stdout may still carry
        // usable samples, so parse regardless of the exit status.
        if !output.status.success() {
            tracing::debug!(
                target,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "ping exited non-zero"
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ping_output(&stdout, target, self.ping_count, timestamp)
    }

    /// One throughput probe. Any execution or parse failure yields None -
    /// the cycle is skipped, never recorded as zeros.
    #[instrument(skip(self), fields(repo = "probe", operation = "speedtest"))]
    pub async fn speedtest(&self) -> Option<ThroughputResult> {
        let timestamp = now_epoch_ms();
        let deadline = Duration::from_secs(self.speedtest_timeout_secs);

        let mut cmd = Command::new(&self.speedtest_command);
        cmd.arg("-f")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "speedtest command failed to run");
                return None;
            }
            Err(_) => {
                tracing::warn!(deadline_secs = deadline.as_secs(), "speedtest timed out");
                return None;
            }
        };

        if !output.status.success() {
            tracing::warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "speedtest exited non-zero"
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_speedtest_json(&stdout, timestamp)
    }
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
