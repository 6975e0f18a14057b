// Shared test helpers: fake probe commands and config assembly

use netmon::config::AppConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write an executable shell script into `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_str().unwrap().to_string()
}

/// Fake ping: 10/10 packets, stable round-trips, a full statistics block.
/// The gateway address answers an order of magnitude faster than the
/// external targets, so reference-exclusion is observable in aggregates.
pub fn ping_ok_script(dir: &Path) -> String {
    write_script(
        dir,
        "ping_ok.sh",
        r#"#!/bin/sh
target="$5"
if [ "$target" = "192.168.1.1" ]; then
cat <<'EOF'
PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=0.3 ms
64 bytes from 192.168.1.1: icmp_seq=2 ttl=64 time=0.5 ms
64 bytes from 192.168.1.1: icmp_seq=3 ttl=64 time=0.4 ms

--- 192.168.1.1 ping statistics ---
10 packets transmitted, 10 received, 0% packet loss, time 9010ms
rtt min/avg/max/mdev = 0.300/0.400/0.500/0.080 ms
EOF
else
cat <<'EOF'
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.0 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=14.0 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=13.0 ms

--- 8.8.8.8 ping statistics ---
10 packets transmitted, 10 received, 0% packet loss, time 9013ms
rtt min/avg/max/mdev = 12.000/13.000/14.000/0.600 ms
EOF
fi
"#,
    )
}

/// Fake ping against an unreachable host: no samples, non-zero exit.
pub fn ping_fail_script(dir: &Path) -> String {
    write_script(
        dir,
        "ping_fail.sh",
        r#"#!/bin/sh
echo "ping: connect: Network is unreachable" >&2
exit 2
"#,
    )
}

/// Fake speedtest: the modern CLI JSON document, bandwidth in bytes/sec.
pub fn speedtest_ok_script(dir: &Path) -> String {
    write_script(
        dir,
        "speedtest_ok.sh",
        r#"#!/bin/sh
cat <<'EOF'
{
  "type": "result",
  "ping": {"jitter": 0.5, "latency": 6.0, "low": 5.5, "high": 7.0},
  "download": {"bandwidth": 12500000, "bytes": 100000000, "elapsed": 8000,
               "latency": {"iqm": 20.0, "low": 10.0, "high": 45.0, "jitter": 2.0}},
  "upload": {"bandwidth": 2500000, "bytes": 20000000, "elapsed": 8000,
             "latency": {"iqm": 30.0, "low": 12.0, "high": 80.0, "jitter": 3.0}}
}
EOF
"#,
    )
}

/// Fake speedtest that fails outright.
pub fn speedtest_fail_script(dir: &Path) -> String {
    write_script(
        dir,
        "speedtest_fail.sh",
        r#"#!/bin/sh
echo "error: no servers available" >&2
exit 1
"#,
    )
}

/// Config with fast ticks, fake commands, and a narration endpoint of the
/// caller's choosing. Targets: 8.8.8.8 plus 192.168.1.1 as reference.
pub fn test_config(
    db_path: &str,
    ping_command: &str,
    speedtest_command: &str,
    narration_url: &str,
) -> AppConfig {
    let toml = format!(
        r#"
[monitoring]
targets = ["8.8.8.8", "192.168.1.1"]
reference_targets = ["192.168.1.1"]
tick_interval_ms = 50
ping_count = 10
ping_timeout_secs = 1
ping_command = "{ping_command}"
speedtest_command = "{speedtest_command}"
speedtest_timeout_secs = 5
smoothing_window = 5
host_tag = "test_host"
stats_log_interval_secs = 3600

[cadence]
throughput_interval_secs = 3600
report_interval_secs = 3600
purge_interval_secs = 86400

[database]
path = "{db_path}"
retention_days = 30

[narration]
backend = "ollama"
base_url = "{narration_url}"
model = "test-model"
timeout_secs = 1

[reporting]
window_hours = 1
recent_points_cap = 50
max_sentences = 2
"#
    );
    AppConfig::load_from_str(&toml).expect("test config")
}
