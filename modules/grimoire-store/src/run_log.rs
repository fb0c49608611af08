use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// One completed (or aborted) ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub error: Option<String>,
    pub stats: serde_json::Value,
}

/// Persists run summaries to the `ingest_runs` table.
pub struct RunRecorder {
    pool: PgPool,
}

impl RunRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, run: &IngestRunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingest_runs (run_id, started_at, finished_at, cancelled, error, stats)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (run_id) DO UPDATE
            SET finished_at = EXCLUDED.finished_at,
                cancelled = EXCLUDED.cancelled,
                error = EXCLUDED.error,
                stats = EXCLUDED.stats
            "#,
        )
        .bind(run.run_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.cancelled)
        .bind(&run.error)
        .bind(&run.stats)
        .execute(&self.pool)
        .await?;

        info!(run_id = %run.run_id, cancelled = run.cancelled, "Ingest run saved to Postgres");
        Ok(())
    }
}
