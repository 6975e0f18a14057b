use anyhow::Result;
use netmon::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let ctx = context::AppContext::initialize(app_config).await?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %ctx.host,
        targets = ?ctx.config.monitoring.targets,
        "starting network monitor"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_handle = scheduler::spawn(scheduler::SchedulerDeps {
        ctx: ctx.clone(),
        shutdown_rx,
    });

    // The scheduler runs until process shutdown; SIGINT/SIGTERM are the
    // only normal exits.
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; ctrl-c only");
                tokio::signal::ctrl_c().await?;
                shutdown(shutdown_tx, scheduler_handle, &ctx).await;
                return Ok(());
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("Received shutdown signal");
    shutdown(shutdown_tx, scheduler_handle, &ctx).await;

    Ok(())
}

/// Stop the scheduler, then release the store handle. Runs on every exit
/// path so the pool is closed deterministically.
async fn shutdown(
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    scheduler_handle: tokio::task::JoinHandle<()>,
    ctx: &context::AppContext,
) {
    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    ctx.shutdown().await;
}
