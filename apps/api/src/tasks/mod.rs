//! Durable store for analysis tasks.
//!
//! State machine: `pending -> processing -> {done, error}`. The terminal
//! states are immutable; every transition is a single conditional UPDATE
//! so two scheduler instances cannot double-process a task.

pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Processing,
    Done,
    Error,
}

#[allow(dead_code)] // parse/is_terminal document the state machine; exercised in tests
impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "done" => Some(TaskStatus::Done),
            "error" => Some(TaskStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

/// One asynchronous résumé/vacancy analysis request.
/// `resume_ref`/`vacancy_ref` are object-store locations, immutable after
/// creation. `result` stays NULL until a terminal state.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalysisTask {
    pub id: i64,
    pub resume_ref: String,
    pub vacancy_ref: String,
    pub status: String,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, resume_ref, vacancy_ref, status, result, created_at, updated_at";

/// Inserts a new task in `pending` state.
pub async fn create(
    pool: &PgPool,
    resume_ref: &str,
    vacancy_ref: &str,
) -> Result<AnalysisTask, sqlx::Error> {
    let query = format!(
        "INSERT INTO tasks (resume_ref, vacancy_ref, status) \
         VALUES ($1, $2, $3) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, AnalysisTask>(&query)
        .bind(resume_ref)
        .bind(vacancy_ref)
        .bind(TaskStatus::Pending.as_str())
        .fetch_one(pool)
        .await
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<AnalysisTask>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
    sqlx::query_as::<_, AnalysisTask>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Atomically claims the oldest pending task, moving it to `processing`.
///
/// Uses `SELECT ... FOR UPDATE SKIP LOCKED` so at most one claimant wins
/// even with concurrent scheduler instances. At most one task leaves
/// `pending` per call.
pub async fn claim_next(pool: &PgPool) -> Result<Option<AnalysisTask>, sqlx::Error> {
    let query = format!(
        "UPDATE tasks \
         SET status = $1, updated_at = NOW() \
         WHERE id = ( \
             SELECT id FROM tasks \
             WHERE status = $2 \
             ORDER BY created_at ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, AnalysisTask>(&query)
        .bind(TaskStatus::Processing.as_str())
        .bind(TaskStatus::Pending.as_str())
        .fetch_optional(pool)
        .await
}

/// Commits a successful result and transitions to `done`.
/// Guarded on `processing` so terminal states stay immutable.
pub async fn complete(pool: &PgPool, id: i64, result: &Value) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tasks SET status = $2, result = $3, updated_at = NOW() \
         WHERE id = $1 AND status = $4",
    )
    .bind(id)
    .bind(TaskStatus::Done.as_str())
    .bind(result)
    .bind(TaskStatus::Processing.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a failure diagnostic and transitions to `error`.
pub async fn fail(pool: &PgPool, id: i64, diagnostic: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tasks SET status = $2, result = $3, updated_at = NOW() \
         WHERE id = $1 AND status = $4",
    )
    .bind(id)
    .bind(TaskStatus::Error.as_str())
    .bind(json!({ "error": diagnostic }))
    .bind(TaskStatus::Processing.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Requeues `processing` tasks older than the threshold back to `pending`.
///
/// Crash recovery: a claim that never committed leaves the task stuck in
/// `processing`; on restart those are treated as recoverable. Returns the
/// number of requeued tasks.
pub async fn requeue_stale(pool: &PgPool, older_than: Duration) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tasks SET status = $1, updated_at = NOW() \
         WHERE status = $2 AND updated_at < NOW() - ($3 * INTERVAL '1 second')",
    )
    .bind(TaskStatus::Pending.as_str())
    .bind(TaskStatus::Processing.as_str())
    .bind(older_than.as_secs() as f64)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Done,
            TaskStatus::Error,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("queued"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
    }
}
