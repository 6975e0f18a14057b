// SQLite metrics store. One generic point table (series name, host tag,
// epoch-ms timestamp, field-map blob) plus a keyed report table.
// Field maps are stored as wincode blobs; averaging happens in Rust
// (smoothing), not in SQL.

mod blob;

use crate::models::{MetricFields, MetricPoint, Report};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;
use wincode::{SchemaRead, SchemaWrite};

/// Wire shape of one stored field. Maps are flattened to a sorted entry
/// list for the blob.
#[derive(Debug, SchemaRead, SchemaWrite)]
struct FieldEntry {
    name: String,
    value: f64,
}

/// Combined ("overall") latency series.
pub const LATENCY_SERIES: &str = "latency";
/// Throughput series (bandwidth + latency under load).
pub const THROUGHPUT_SERIES: &str = "throughput";

/// Per-target latency series name. Stable: dashboards key on it.
pub fn latency_series(target: &str) -> String {
    format!("{}_{}", LATENCY_SERIES, target)
}

pub struct MetricsRepo {
    pool: SqlitePool,
    host: String,
    retention_ms: i64,
}

impl MetricsRepo {
    pub async fn connect(path: &str, host: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self {
            pool,
            host: host.to_string(),
            retention_ms,
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metric_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                series TEXT NOT NULL,
                host TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                field_data BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_points_series_created_at ON metric_points(series, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                tag TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                generated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retention cutoff relative to now: points with created_at strictly
    /// before this are past the horizon.
    pub fn retention_cutoff_ms(&self) -> anyhow::Result<u64> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis() as i64;
        Ok((now - self.retention_ms).max(0) as u64)
    }

    #[instrument(skip(self, fields), fields(repo = "metrics", operation = "write_point"))]
    pub async fn write_point(
        &self,
        series: &str,
        fields: &MetricFields,
        timestamp_ms: u64,
    ) -> anyhow::Result<()> {
        let entries: Vec<FieldEntry> = fields
            .iter()
            .map(|(name, value)| FieldEntry {
                name: name.clone(),
                value: *value,
            })
            .collect();
        let field_data = blob::with_version_prefix(
            blob::BLOB_VERSION,
            wincode::serialize(&entries).map_err(|e| anyhow::anyhow!("wincode: {}", e))?,
        );
        sqlx::query(
            "INSERT INTO metric_points (series, host, created_at, field_data) VALUES ($1, $2, $3, $4)",
        )
        .bind(series)
        .bind(&self.host)
        .bind(timestamp_ms as i64)
        .bind(&field_data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Points of one series in [from_ms, to_ms). Order: ascending by created_at.
    #[instrument(skip(self), fields(repo = "metrics", operation = "query_range"))]
    pub async fn query_range(
        &self,
        series: &str,
        from_ms: u64,
        to_ms: u64,
    ) -> anyhow::Result<Vec<MetricPoint>> {
        let rows = sqlx::query(
            "SELECT created_at, field_data FROM metric_points
             WHERE series = $1 AND created_at >= $2 AND created_at < $3
             ORDER BY created_at ASC",
        )
        .bind(series)
        .bind(from_ms as i64)
        .bind(to_ms as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_point_row(&row)?);
        }
        Ok(out)
    }

    /// Most recent `limit` points of one series, oldest first.
    #[instrument(skip(self), fields(repo = "metrics", operation = "recent_points"))]
    pub async fn recent_points(&self, series: &str, limit: u32) -> anyhow::Result<Vec<MetricPoint>> {
        let rows = sqlx::query(
            "SELECT created_at, field_data FROM metric_points
             WHERE series = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(series)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_point_row(&row)?);
        }
        out.reverse();
        Ok(out)
    }

    /// Delete points of one series with created_at strictly before the cutoff.
    #[instrument(skip(self), fields(repo = "metrics", operation = "purge_series"))]
    pub async fn purge_series(&self, series: &str, older_than_ms: u64) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM metric_points WHERE series = $1 AND created_at < $2")
            .bind(series)
            .bind(older_than_ms as i64)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Upsert by tag: the new report supersedes any previous one with the
    /// same tag.
    #[instrument(skip(self, report), fields(repo = "metrics", operation = "save_report"))]
    pub async fn save_report(&self, report: &Report) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO reports (tag, content, generated_at) VALUES ($1, $2, $3)")
            .bind(&report.tag)
            .bind(&report.content)
            .bind(report.generated_at as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn report_by_tag(&self, tag: &str) -> anyhow::Result<Option<Report>> {
        let row = sqlx::query("SELECT tag, content, generated_at FROM reports WHERE tag = $1")
            .bind(tag)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let tag: String = row.try_get("tag")?;
        let content: String = row.try_get("content")?;
        let generated_at: i64 = row.try_get("generated_at")?;
        Ok(Some(Report {
            content,
            generated_at: generated_at as u64,
            tag,
        }))
    }

    pub async fn report_count(&self, tag: &str) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE tag = $1")
            .bind(tag)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Reclaim space after deletes (run on the vacuum schedule).
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Drain the pool. Called once at shutdown so the store handle is
    /// released on every exit path.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn parse_point_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<MetricPoint> {
        let created_at: i64 = row.try_get("created_at")?;
        let field_data: Vec<u8> = row.try_get("field_data")?;
        Ok(MetricPoint {
            timestamp: created_at as u64,
            fields: deserialize_field_data(&field_data),
        })
    }
}

/// Deserialize field_data; on legacy/corrupt blob return an empty map and log.
fn deserialize_field_data(bytes: &[u8]) -> MetricFields {
    let payload = blob::blob_payload(bytes, blob::BLOB_VERSION);
    wincode::deserialize::<Vec<FieldEntry>>(payload)
        .map(|entries| entries.into_iter().map(|e| (e.name, e.value)).collect())
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "wincode deserialize fields (legacy/corrupt), using empty");
            MetricFields::new()
        })
}
