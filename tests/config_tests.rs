// Config loading and validation tests

use netmon::config::{AppConfig, NarrationBackend};

const VALID_CONFIG: &str = r#"
[monitoring]
targets = ["8.8.8.8", "1.1.1.1"]
reference_targets = ["192.168.1.1"]
tick_interval_ms = 1000
stats_log_interval_secs = 60

[cadence]
throughput_interval_secs = 3600
report_interval_secs = 900
purge_interval_secs = 86400

[database]
path = "data/netmon.db"

[narration]
backend = "ollama"
base_url = "http://127.0.0.1:11434"
model = "llama3.2:3b"

[reporting]
window_hours = 1
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.monitoring.targets, vec!["8.8.8.8", "1.1.1.1"]);
    assert_eq!(config.monitoring.reference_targets, vec!["192.168.1.1"]);
    assert_eq!(config.monitoring.tick_interval_ms, 1000);
    assert_eq!(config.cadence.report_interval_secs, 900);
    assert_eq!(config.database.path, "data/netmon.db");
    assert_eq!(config.narration.backend, NarrationBackend::Ollama);
}

#[test]
fn test_config_defaults_apply() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.monitoring.ping_count, 10);
    assert_eq!(config.monitoring.ping_timeout_secs, 2);
    assert_eq!(config.monitoring.ping_command, "ping");
    assert_eq!(config.monitoring.speedtest_command, "speedtest");
    assert_eq!(config.monitoring.smoothing_window, 5);
    assert_eq!(config.database.retention_days, 30);
    assert!(config.database.vacuum_schedule.is_none());
    assert_eq!(config.narration.timeout_secs, 120);
    assert_eq!(config.reporting.recent_points_cap, 100);
    assert_eq!(config.reporting.max_sentences, 3);
}

#[test]
fn test_config_openai_backend_parses() {
    let cfg = VALID_CONFIG
        .replace("backend = \"ollama\"", "backend = \"openai\"")
        .replace(
            "base_url = \"http://127.0.0.1:11434\"",
            "base_url = \"http://127.0.0.1:8000\"\napi_key = \"sk-test\"",
        );
    let config = AppConfig::load_from_str(&cfg).expect("load_from_str");
    assert_eq!(config.narration.backend, NarrationBackend::OpenAi);
    assert_eq!(config.narration.api_key.as_deref(), Some("sk-test"));
}

#[test]
fn test_config_validation_rejects_empty_targets() {
    let bad = VALID_CONFIG.replace("targets = [\"8.8.8.8\", \"1.1.1.1\"]", "targets = []");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.targets"));
}

#[test]
fn test_config_validation_rejects_tick_interval_zero() {
    let bad = VALID_CONFIG.replace("tick_interval_ms = 1000", "tick_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("tick_interval_ms"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/netmon.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_retention_zero() {
    let bad = VALID_CONFIG.replace(
        "path = \"data/netmon.db\"",
        "path = \"data/netmon.db\"\nretention_days = 0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention_days"));
}

#[test]
fn test_config_validation_rejects_report_interval_zero() {
    let bad = VALID_CONFIG.replace("report_interval_secs = 900", "report_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("report_interval_secs"));
}

#[test]
fn test_config_validation_rejects_window_hours_out_of_range() {
    let bad = VALID_CONFIG.replace("window_hours = 1", "window_hours = 48");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("window_hours"));
}

#[test]
fn test_config_validation_rejects_empty_model() {
    let bad = VALID_CONFIG.replace("model = \"llama3.2:3b\"", "model = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("narration.model"));
}

#[test]
fn test_config_validation_rejects_unknown_backend() {
    let bad = VALID_CONFIG.replace("backend = \"ollama\"", "backend = \"carrier-pigeon\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}
