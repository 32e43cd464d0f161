//! Background task scheduler.
//!
//! A single long-lived Tokio task that polls the task table on a fixed
//! interval and processes at most one claimed task per tick: download
//! both documents, extract text, run the two completion calls, commit
//! the result. A failure on one task is recorded on that task and never
//! breaks the loop.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::analysis::pipeline::{analyze_documents, AnalysisReport};
use crate::llm::CompletionBackend;
use crate::storage::ObjectStore;
use crate::tasks::{self, AnalysisTask};

/// `processing` tasks older than this are considered orphaned by a crashed
/// instance and requeued at startup.
const STALE_CLAIM_THRESHOLD: Duration = Duration::from_secs(600);

pub struct Scheduler {
    db: PgPool,
    store: ObjectStore,
    llm: Arc<dyn CompletionBackend>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        db: PgPool,
        store: ObjectStore,
        llm: Arc<dyn CompletionBackend>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            store,
            llm,
            poll_interval,
        }
    }

    /// Runs the polling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        match tasks::requeue_stale(&self.db, STALE_CLAIM_THRESHOLD).await {
            Ok(0) => {}
            Ok(n) => warn!("Requeued {n} stale processing task(s) from a previous run"),
            Err(e) => error!("Failed to requeue stale tasks: {e}"),
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Task scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Task scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Scheduler tick failed: {e}");
                    }
                }
            }
        }
    }

    /// One tick: claim at most one pending task and process it to a
    /// terminal state. Returns Err only for task-table failures; analysis
    /// failures are committed onto the task itself.
    async fn tick(&self) -> Result<(), sqlx::Error> {
        let Some(task) = tasks::claim_next(&self.db).await? else {
            return Ok(());
        };

        info!(task_id = task.id, "Claimed analysis task");

        match self.process(&task).await {
            Ok(report) => {
                let payload = serde_json::to_value(&report)
                    .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
                tasks::complete(&self.db, task.id, &payload).await?;
                info!(task_id = task.id, "Analysis task done");
            }
            Err(e) => {
                warn!(task_id = task.id, "Analysis task failed: {e:#}");
                tasks::fail(&self.db, task.id, &format!("{e:#}")).await?;
            }
        }

        Ok(())
    }

    /// The blocking work of one task: download both documents, extract
    /// text (degrading to empty on malformed input), run the completion
    /// calls sequentially.
    async fn process(&self, task: &AnalysisTask) -> anyhow::Result<AnalysisReport> {
        let resume_pdf = self.store.get(&task.resume_ref).await?;
        let vacancy_pdf = self.store.get(&task.vacancy_ref).await?;

        let report = analyze_documents(self.llm.as_ref(), &resume_pdf, &vacancy_pdf).await?;
        Ok(report)
    }
}
