// Report generation: gather aggregates + recent raw points, ask the
// narration backend, post-process, persist as the single "latest" report.

use crate::context::AppContext;
use crate::metrics_repo::{LATENCY_SERIES, THROUGHPUT_SERIES};
use crate::models::{LATEST_REPORT_TAG, MetricFields, MetricPoint, Report};
use crate::smoothing;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::instrument;

/// Written verbatim when the narration call fails for any reason, so the
/// "latest" report is never stale because of an error path.
pub const FALLBACK_REPORT: &str =
    "Network summary unavailable: the narration service could not be reached.";

pub struct Reporter {
    ctx: Arc<AppContext>,
}

impl Reporter {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// One report cycle. Store read failures degrade to "no data" in the
    /// prompt; narration failures degrade to the fallback text. Only the
    /// final report write surfaces as an error (the caller logs and drops
    /// it, at-most-once like every other store write).
    #[instrument(skip(self), fields(operation = "report_cycle"))]
    pub async fn run_cycle(&self) -> anyhow::Result<()> {
        let now = now_epoch_ms();
        let reporting = &self.ctx.config.reporting;
        let window_ms = reporting.window_hours as u64 * 3_600_000;
        let from = now.saturating_sub(window_ms);

        let latency_window = self.query_or_empty(LATENCY_SERIES, from, now + 1).await;
        let throughput_window = self.query_or_empty(THROUGHPUT_SERIES, from, now + 1).await;
        let latency_avg = smoothing::mean_fields(&latency_window);
        let throughput_avg = smoothing::mean_fields(&throughput_window);

        let recent = match self
            .ctx
            .metrics_repo
            .recent_points(LATENCY_SERIES, reporting.recent_points_cap)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(error = %e, "recent points query failed; reporting without them");
                Vec::new()
            }
        };
        let previous = match self.ctx.metrics_repo.report_by_tag(LATEST_REPORT_TAG).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "previous report lookup failed; reporting without it");
                None
            }
        };

        let prompt = build_prompt(
            &self.ctx.host,
            reporting.window_hours,
            latency_avg.as_ref(),
            throughput_avg.as_ref(),
            &recent,
            previous.as_ref().map(|r| r.content.as_str()),
            reporting.max_sentences,
        );

        let content = match self.ctx.narrator.generate(&prompt).await {
            Ok(text) => postprocess_narration(&text, reporting.max_sentences),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.ctx.narrator.name(),
                    "narration failed; using fallback text"
                );
                FALLBACK_REPORT.to_string()
            }
        };

        self.ctx
            .metrics_repo
            .save_report(&Report::latest(content, now))
            .await?;
        tracing::debug!(operation = "report_cycle", "report written");
        Ok(())
    }

    async fn query_or_empty(&self, series: &str, from: u64, to: u64) -> Vec<MetricPoint> {
        match self.ctx.metrics_repo.query_range(series, from, to).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(error = %e, series, "range query failed; treating window as empty");
                Vec::new()
            }
        }
    }
}

/// Bounded prompt: long-window averages, a capped sample of raw points,
/// and the previous summary for trend continuity.
fn build_prompt(
    host: &str,
    window_hours: u32,
    latency_avg: Option<&MetricFields>,
    throughput_avg: Option<&MetricFields>,
    recent: &[MetricPoint],
    previous: Option<&str>,
    max_sentences: usize,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You summarize network health measurements for host {}.",
        host
    );
    let _ = writeln!(
        prompt,
        "Trailing {}h latency averages: {}",
        window_hours,
        format_fields(latency_avg)
    );
    let _ = writeln!(
        prompt,
        "Trailing {}h throughput averages: {}",
        window_hours,
        format_fields(throughput_avg)
    );
    if recent.is_empty() {
        let _ = writeln!(prompt, "No recent raw samples.");
    } else {
        let _ = writeln!(prompt, "Last {} raw latency samples (avg ms / loss %):", recent.len());
        for point in recent {
            let avg = point.fields.get("avg").copied();
            let loss = point.fields.get("packet_loss").copied();
            let _ = writeln!(
                prompt,
                "  {} / {}",
                avg.map_or("-".to_string(), |v| format!("{:.1}", v)),
                loss.map_or("-".to_string(), |v| format!("{:.0}", v)),
            );
        }
    }
    if let Some(previous) = previous {
        let _ = writeln!(prompt, "Previous summary: {}", previous);
    }
    let _ = write!(
        prompt,
        "Describe current conditions and any trend in at most {} sentences of plain prose.",
        max_sentences
    );
    prompt
}

fn format_fields(fields: Option<&MetricFields>) -> String {
    match fields {
        None => "no data".to_string(),
        Some(fields) => fields
            .iter()
            .map(|(name, value)| format!("{}={:.2}", name, value))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Truncate to a maximum sentence count (naive terminator split) and strip
/// redundant blank lines.
pub fn postprocess_narration(text: &str, max_sentences: usize) -> String {
    let stripped: String = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    stripped
        .split_inclusive(['.', '!', '?'])
        .take(max_sentences)
        .collect::<String>()
        .trim()
        .to_string()
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
