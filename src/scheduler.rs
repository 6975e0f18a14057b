// Multi-cadence scheduler: one tick loop drives every periodic task.
// Latency probes run every tick; throughput, report and purge sit on an
// explicit cadence table checked against epoch seconds. Each task has its
// own failure boundary: an error is logged and affects neither the other
// tasks in the tick nor future ticks.
//
// Slow tasks (throughput probe, report generation) run as single-flight
// background tasks so the next tick's latency probe always starts on
// schedule; a cadence firing while the previous run is still in flight is
// skipped.

use crate::context::AppContext;
use crate::metrics_repo::{LATENCY_SERIES, THROUGHPUT_SERIES, latency_series};
use crate::reporter::Reporter;
use crate::smoothing::{self, RollingWindow};
use futures_util::future::join_all;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

/// The fixed set of non-mandatory tasks. Known at build time; this is not
/// a pluggable workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Throughput,
    Report,
    Purge,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Throughput => "throughput",
            TaskKind::Report => "report",
            TaskKind::Purge => "purge",
        }
    }
}

/// One row of the cadence table. A task fires when
/// now - last_run_epoch >= interval_secs.
#[derive(Debug, Clone)]
pub struct Cadence {
    pub task: TaskKind,
    pub interval_secs: u64,
    last_run_epoch: u64,
}

impl Cadence {
    /// A fresh cadence (last_run_epoch = 0) is due on the first tick.
    pub fn new(task: TaskKind, interval_secs: u64) -> Self {
        Self {
            task,
            interval_secs,
            last_run_epoch: 0,
        }
    }

    pub fn due(&self, now_epoch_secs: u64) -> bool {
        now_epoch_secs.saturating_sub(self.last_run_epoch) >= self.interval_secs
    }

    /// last_run_epoch is monotonically non-decreasing, even if the clock
    /// steps backwards between ticks.
    pub fn mark_run(&mut self, now_epoch_secs: u64) {
        self.last_run_epoch = self.last_run_epoch.max(now_epoch_secs);
    }

    pub fn last_run_epoch(&self) -> u64 {
        self.last_run_epoch
    }
}

pub struct SchedulerDeps {
    pub ctx: Arc<AppContext>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

#[derive(Default)]
struct SchedulerStats {
    latency_points_written: AtomicU64,
    throughput_points_written: AtomicU64,
    reports_written: AtomicU64,
    purge_passes: AtomicU64,
    task_failures: AtomicU64,
}

pub fn spawn(deps: SchedulerDeps) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(deps).await;
    })
}

#[instrument(skip(deps), fields(tick_interval_ms = deps.ctx.config.monitoring.tick_interval_ms))]
async fn run(deps: SchedulerDeps) {
    let SchedulerDeps {
        ctx,
        mut shutdown_rx,
    } = deps;

    let mut tick = interval(Duration::from_millis(ctx.config.monitoring.tick_interval_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(Duration::from_secs(
        ctx.config.monitoring.stats_log_interval_secs,
    ));
    stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut vacuum_rx = ctx.config.database.vacuum_schedule.clone().map(|expr| {
        let (tx, rx) = mpsc::channel::<()>(1);
        tokio::spawn(vacuum_scheduler(expr, tx));
        rx
    });

    let mut scheduler = Scheduler::new(ctx);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                scheduler.run_tick().await;
            }
            _ = &mut shutdown_rx => {
                debug!("Scheduler shutting down");
                break;
            }
            _ = stats_log_tick.tick() => {
                scheduler.log_stats();
            }
            _ = recv_vacuum(&mut vacuum_rx) => {
                scheduler.run_vacuum().await;
            }
        }
    }

    scheduler.join_background_tasks().await;
}

/// Pends forever when no vacuum schedule is configured (or after the
/// schedule task exits), so the select! branch never busy-loops.
async fn recv_vacuum(rx: &mut Option<mpsc::Receiver<()>>) {
    match rx {
        Some(rx) => {
            if rx.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

/// Sends on `tx` at each VACUUM time. Uses local time for cron.
async fn vacuum_scheduler(cron_expr: String, tx: mpsc::Sender<()>) {
    let Ok(schedule) = cron::Schedule::from_str(&cron_expr) else {
        warn!(cron = %cron_expr, "invalid vacuum_schedule; VACUUM will not run");
        return;
    };
    loop {
        let now = chrono::Local::now();
        let Some(next) = schedule.after(&now).next() else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        tokio::time::sleep(delay).await;
        if tx.send(()).await.is_err() {
            break;
        }
    }
}

struct Scheduler {
    ctx: Arc<AppContext>,
    cadences: Vec<Cadence>,
    /// Smooths the combined per-tick latency aggregate. Owned by the tick
    /// loop: single mutator.
    combined_window: RollingWindow,
    /// Smooths throughput results. Mutated only by the single-flight
    /// throughput task.
    throughput_window: Arc<Mutex<RollingWindow>>,
    throughput_task: Option<tokio::task::JoinHandle<()>>,
    report_task: Option<tokio::task::JoinHandle<()>>,
    stats: Arc<SchedulerStats>,
}

impl Scheduler {
    fn new(ctx: Arc<AppContext>) -> Self {
        let cadence = &ctx.config.cadence;
        let cadences = vec![
            Cadence::new(TaskKind::Throughput, cadence.throughput_interval_secs),
            Cadence::new(TaskKind::Report, cadence.report_interval_secs),
            Cadence::new(TaskKind::Purge, cadence.purge_interval_secs),
        ];
        let window = ctx.config.monitoring.smoothing_window;
        Self {
            ctx,
            cadences,
            combined_window: RollingWindow::new(window),
            throughput_window: Arc::new(Mutex::new(RollingWindow::new(window))),
            throughput_task: None,
            report_task: None,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    async fn run_tick(&mut self) {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_else(|e| {
                warn!(error = %e, operation = "get_timestamp", "system time error");
                0
            });

        self.probe_latency(now_ms).await;

        let now_secs = now_ms / 1000;
        for i in 0..self.cadences.len() {
            if self.cadences[i].due(now_secs) {
                let task = self.cadences[i].task;
                self.dispatch(task).await;
                self.cadences[i].mark_run(now_secs);
            }
        }
    }

    /// Single dispatch point for the cadence table: what a task does lives
    /// in its own method, when it runs lives in the table.
    async fn dispatch(&mut self, task: TaskKind) {
        debug!(task = task.name(), "cadence due");
        match task {
            TaskKind::Throughput => self.start_throughput(),
            TaskKind::Report => self.start_report(),
            TaskKind::Purge => self.run_purge().await,
        }
    }

    /// Latency probes for every configured target, fanned out within the
    /// tick. Per-target series always get the raw result (sentinels
    /// included); the combined series gets the window-smoothed aggregate
    /// over this tick's connected, non-reference targets.
    async fn probe_latency(&mut self, now_ms: u64) {
        let targets = &self.ctx.config.monitoring.targets;
        let results = join_all(targets.iter().map(|t| self.ctx.probe_repo.ping(t))).await;

        for result in &results {
            let series = latency_series(&result.target);
            match self
                .ctx
                .metrics_repo
                .write_point(&series, &result.fields(), result.timestamp)
                .await
            {
                Ok(()) => {
                    self.stats
                        .latency_points_written
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, series = %series, "latency write dropped");
                    self.stats.task_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let combined = smoothing::combine_latency(
            &results,
            &self.ctx.config.monitoring.reference_targets,
        );
        let Some(combined) = combined else {
            debug!("no eligible connected target this tick; combined latency skipped");
            return;
        };
        self.combined_window.push(combined.fields());
        if let Some(avg) = self.combined_window.average() {
            match self
                .ctx
                .metrics_repo
                .write_point(LATENCY_SERIES, &avg, now_ms)
                .await
            {
                Ok(()) => {
                    self.stats
                        .latency_points_written
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, series = LATENCY_SERIES, "combined latency write dropped");
                    self.stats.task_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn start_throughput(&mut self) {
        if let Some(handle) = &self.throughput_task
            && !handle.is_finished()
        {
            debug!("throughput probe still in flight; skipping this cadence");
            return;
        }
        let ctx = self.ctx.clone();
        let window = self.throughput_window.clone();
        let stats = self.stats.clone();
        self.throughput_task = Some(tokio::spawn(async move {
            // Probe failures are logged inside the repo; absence of a
            // result means "skip this cycle", never a sentinel write.
            let Some(result) = ctx.probe_repo.speedtest().await else {
                return;
            };
            let averaged = match window.lock() {
                Ok(mut w) => {
                    w.push(result.fields());
                    w.average()
                }
                Err(e) => {
                    warn!(error = %e, "throughput window lock poisoned");
                    None
                }
            };
            let Some(fields) = averaged else { return };
            match ctx
                .metrics_repo
                .write_point(THROUGHPUT_SERIES, &fields, result.timestamp)
                .await
            {
                Ok(()) => {
                    stats
                        .throughput_points_written
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, series = THROUGHPUT_SERIES, "throughput write dropped");
                    stats.task_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    fn start_report(&mut self) {
        if let Some(handle) = &self.report_task
            && !handle.is_finished()
        {
            debug!("report cycle still in flight; skipping this cadence");
            return;
        }
        let reporter = Reporter::new(self.ctx.clone());
        let stats = self.stats.clone();
        self.report_task = Some(tokio::spawn(async move {
            match reporter.run_cycle().await {
                Ok(()) => {
                    stats.reports_written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, task = "report", "report cycle failed");
                    stats.task_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    /// Retention purge over every tracked series. Inline: a bounded DELETE
    /// per series, cheap next to a tick.
    async fn run_purge(&mut self) {
        let cutoff = match self.ctx.metrics_repo.retention_cutoff_ms() {
            Ok(cutoff) => cutoff,
            Err(e) => {
                warn!(error = %e, task = "purge", "retention cutoff unavailable");
                self.stats.task_failures.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        for series in self.ctx.tracked_series() {
            match self.ctx.metrics_repo.purge_series(&series, cutoff).await {
                Ok(removed) => {
                    if removed > 0 {
                        debug!(series = %series, removed, "purged expired points");
                    }
                }
                Err(e) => {
                    warn!(error = %e, series = %series, "purge dropped");
                    self.stats.task_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.stats.purge_passes.fetch_add(1, Ordering::Relaxed);
    }

    async fn run_vacuum(&mut self) {
        if let Err(e) = self.ctx.metrics_repo.vacuum().await {
            warn!(error = %e, "vacuum failed");
        } else {
            info!("vacuum complete");
        }
    }

    fn log_stats(&self) {
        info!(
            latency_points_written = self.stats.latency_points_written.load(Ordering::Relaxed),
            throughput_points_written = self
                .stats
                .throughput_points_written
                .load(Ordering::Relaxed),
            reports_written = self.stats.reports_written.load(Ordering::Relaxed),
            purge_passes = self.stats.purge_passes.load(Ordering::Relaxed),
            task_failures = self.stats.task_failures.load(Ordering::Relaxed),
            "app stats"
        );
    }

    /// Let in-flight background tasks finish before the store closes.
    async fn join_background_tasks(&mut self) {
        if let Some(handle) = self.throughput_task.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.report_task.take() {
            let _ = handle.await;
        }
    }
}
