// Shared application context: built once at startup, passed to every task.
// Replaces process-global state with an explicitly constructed object whose
// lifetime ends with shutdown().

use crate::config::AppConfig;
use crate::metrics_repo::MetricsRepo;
use crate::narrator::{self, Narrator};
use crate::probe_repo::ProbeRepo;
use std::sync::Arc;

pub struct AppContext {
    pub config: AppConfig,
    /// Host tag on every written point.
    pub host: String,
    pub metrics_repo: Arc<MetricsRepo>,
    pub probe_repo: Arc<ProbeRepo>,
    pub narrator: Arc<dyn Narrator>,
}

impl AppContext {
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let host = config
            .monitoring
            .host_tag
            .clone()
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "unknown".into());
        let metrics_repo = Arc::new(
            MetricsRepo::connect(&config.database.path, &host, config.database.retention_days)
                .await?,
        );
        metrics_repo.init().await?;
        let probe_repo = Arc::new(ProbeRepo::new(&config.monitoring));
        let narrator = narrator::build(&config.narration)?;
        Ok(Arc::new(Self {
            config,
            host,
            metrics_repo,
            probe_repo,
            narrator,
        }))
    }

    /// Every tracked metric series: the combined latency series, one per
    /// target, and throughput. The retention purge walks this list.
    pub fn tracked_series(&self) -> Vec<String> {
        let mut series = vec![crate::metrics_repo::LATENCY_SERIES.to_string()];
        for target in &self.config.monitoring.targets {
            series.push(crate::metrics_repo::latency_series(target));
        }
        series.push(crate::metrics_repo::THROUGHPUT_SERIES.to_string());
        series
    }

    /// Release the store handle. Runs on every shutdown path.
    pub async fn shutdown(&self) {
        self.metrics_repo.close().await;
    }
}
