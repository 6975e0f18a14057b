use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
    pub cadence: CadenceConfig,
    pub database: DatabaseConfig,
    pub narration: NarrationConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// All probed targets, reference targets included.
    pub targets: Vec<String>,
    /// Targets excluded from the combined latency aggregate (e.g. the
    /// local gateway); still probed and persisted per-target.
    #[serde(default)]
    pub reference_targets: Vec<String>,
    pub tick_interval_ms: u64,
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,
    /// Per-packet wait, seconds (ping -W).
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    #[serde(default = "default_ping_command")]
    pub ping_command: String,
    #[serde(default = "default_speedtest_command")]
    pub speedtest_command: String,
    /// Whole-call deadline for one throughput run, seconds.
    #[serde(default = "default_speedtest_timeout_secs")]
    pub speedtest_timeout_secs: u64,
    /// Rolling-window capacity for the live moving averages.
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    /// Host tag on every written point. Defaults to the system hostname.
    #[serde(default)]
    pub host_tag: Option<String>,
    /// How often to log app stats (points written, reports, purges) at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CadenceConfig {
    pub throughput_interval_secs: u64,
    pub report_interval_secs: u64,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Local time.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationBackend {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NarrationConfig {
    pub backend: NarrationBackend,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_narration_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Trailing window for the long aggregates fed to the narrator, hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    /// Cap on raw recent points included in the prompt.
    #[serde(default = "default_recent_points_cap")]
    pub recent_points_cap: u32,
    /// Narrated text is truncated to this many sentences.
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
}

fn default_ping_count() -> u32 {
    10
}

fn default_ping_timeout_secs() -> u64 {
    2
}

fn default_ping_command() -> String {
    "ping".into()
}

fn default_speedtest_command() -> String {
    "speedtest".into()
}

fn default_speedtest_timeout_secs() -> u64 {
    120
}

fn default_smoothing_window() -> usize {
    5
}

fn default_narration_timeout_secs() -> u64 {
    120
}

fn default_window_hours() -> u32 {
    1
}

fn default_recent_points_cap() -> u32 {
    100
}

fn default_max_sentences() -> usize {
    3
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.monitoring.targets.is_empty(),
            "monitoring.targets must list at least one target"
        );
        anyhow::ensure!(
            self.monitoring.tick_interval_ms > 0,
            "monitoring.tick_interval_ms must be > 0, got {}",
            self.monitoring.tick_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.ping_count > 0,
            "monitoring.ping_count must be > 0, got {}",
            self.monitoring.ping_count
        );
        anyhow::ensure!(
            self.monitoring.ping_timeout_secs > 0,
            "monitoring.ping_timeout_secs must be > 0, got {}",
            self.monitoring.ping_timeout_secs
        );
        anyhow::ensure!(
            self.monitoring.speedtest_timeout_secs > 0,
            "monitoring.speedtest_timeout_secs must be > 0, got {}",
            self.monitoring.speedtest_timeout_secs
        );
        anyhow::ensure!(
            self.monitoring.smoothing_window > 0,
            "monitoring.smoothing_window must be > 0, got {}",
            self.monitoring.smoothing_window
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.cadence.throughput_interval_secs > 0,
            "cadence.throughput_interval_secs must be > 0, got {}",
            self.cadence.throughput_interval_secs
        );
        anyhow::ensure!(
            self.cadence.report_interval_secs > 0,
            "cadence.report_interval_secs must be > 0, got {}",
            self.cadence.report_interval_secs
        );
        anyhow::ensure!(
            self.cadence.purge_interval_secs > 0,
            "cadence.purge_interval_secs must be > 0, got {}",
            self.cadence.purge_interval_secs
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            !self.narration.base_url.is_empty(),
            "narration.base_url must be non-empty"
        );
        anyhow::ensure!(
            !self.narration.model.is_empty(),
            "narration.model must be non-empty"
        );
        anyhow::ensure!(
            self.narration.timeout_secs > 0,
            "narration.timeout_secs must be > 0, got {}",
            self.narration.timeout_secs
        );
        anyhow::ensure!(
            (1..=24).contains(&self.reporting.window_hours),
            "reporting.window_hours must be between 1 and 24, got {}",
            self.reporting.window_hours
        );
        anyhow::ensure!(
            (1..=250).contains(&self.reporting.recent_points_cap),
            "reporting.recent_points_cap must be between 1 and 250, got {}",
            self.reporting.recent_points_cap
        );
        anyhow::ensure!(
            self.reporting.max_sentences > 0,
            "reporting.max_sentences must be > 0, got {}",
            self.reporting.max_sentences
        );
        Ok(())
    }
}
