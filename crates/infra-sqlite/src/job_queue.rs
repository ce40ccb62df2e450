// SQLite-backed background job queue
// Jobs are rows written on the caller's connection, so a job enqueued
// inside a migration transaction disappears when it rolls back.

use crate::error::map_sqlx_error;
use crate::transaction::execute_tracked;
use migrator_core::error::{AppError, Result};
use migrator_core::port::{IdProvider, SideEffectBus, TimeProvider};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::debug;

pub const JOBS_TABLE: &str = "background_jobs";

const QUEUED: &str = "QUEUED";

const INSERT_JOB: &str = "INSERT INTO background_jobs (id, queue, job_type, payload, state, created_at) \
     VALUES (?, ?, ?, ?, ?, ?)";

pub struct SqliteJobQueue {
    queue: String,
    side_effects: SideEffectBus,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobQueue {
    pub fn new(
        side_effects: SideEffectBus,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue: "default".to_string(),
            side_effects,
            id_provider,
            time_provider,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Create the jobs table if it does not exist
    pub async fn ensure_schema(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS background_jobs (
                id TEXT PRIMARY KEY,
                queue TEXT NOT NULL,
                job_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Enqueue a job of `job_type` and report it as a side effect
    ///
    /// The insert is reported as a write statement as well. Returns the new
    /// job id.
    pub async fn enqueue(
        &self,
        conn: &mut SqliteConnection,
        job_type: &str,
        payload: serde_json::Value,
    ) -> Result<String> {
        if job_type.trim().is_empty() {
            return Err(AppError::Validation("job_type must not be empty".to_string()));
        }

        let id = self.id_provider.generate_id();
        let insert = sqlx::query(INSERT_JOB)
            .bind(id.clone())
            .bind(self.queue.clone())
            .bind(job_type.to_string())
            .bind(payload.to_string())
            .bind(QUEUED)
            .bind(self.time_provider.now_millis());
        execute_tracked(&mut *conn, insert, &self.side_effects).await?;

        debug!(job_id = %id, job_type, queue = %self.queue, "Enqueued job");
        self.side_effects.job_enqueued(job_type);
        Ok(id)
    }

    /// Jobs waiting in this queue
    pub async fn queued_count(&self, conn: &mut SqliteConnection) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM background_jobs WHERE queue = ? AND state = ?")
                .bind(&self.queue)
                .bind(QUEUED)
                .fetch_one(&mut *conn)
                .await
                .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }
}
