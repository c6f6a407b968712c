//! Task service — submission, polling, listing and deletion.
//!
//! Sits between the HTTP routes and the store/orchestrator pair. Submission
//! never waits for a job to finish; deletion cancels a pending job's run on a
//! best-effort basis before removing the row.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{OrchestrationError, ServiceError, ValidationError};
use crate::store::Database;
use crate::tasks::model::{Task, TaskPage, TaskQuery, TaskStatus};
use crate::worker::orchestrator::{CancelOutcome, Orchestrator};
use crate::worker::run::RunInput;

/// Task operations shared by all request handlers.
#[derive(Clone)]
pub struct TaskService {
    db: Arc<dyn Database>,
    orchestrator: Orchestrator,
    max_payload_bytes: usize,
    start_timeout: Duration,
}

impl TaskService {
    pub fn new(
        db: Arc<dyn Database>,
        orchestrator: Orchestrator,
        max_payload_bytes: usize,
        start_timeout: Duration,
    ) -> Self {
        Self {
            db,
            orchestrator,
            max_payload_bytes,
            start_timeout,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Reject payloads that are empty or too large.
    pub fn validate_payload(&self, payload: &str) -> Result<(), ValidationError> {
        if payload.trim().is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        if payload.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    /// Create a pending task and start its run.
    ///
    /// A run that fails to start is logged and leaves the task pending; the
    /// caller still gets the task back.
    pub async fn submit(&self, payload: String) -> Result<Task, ServiceError> {
        self.validate_payload(&payload)?;

        let task = self.db.create_task().await?;
        info!(task_id = %task.id, payload_bytes = payload.len(), "Task created");

        let run_id = task.run_id();
        let input = RunInput {
            task_id: task.id,
            payload,
        };
        let started = tokio::time::timeout(
            self.start_timeout,
            self.orchestrator.start(&run_id, input),
        )
        .await
        .unwrap_or_else(|_| {
            Err(OrchestrationError::StartTimeout {
                run_id: run_id.clone(),
                timeout: self.start_timeout,
            })
        });

        match started {
            Ok(handle) => info!(task_id = %task.id, run_id = handle.run_id(), "Run started"),
            Err(e) => error!(
                task_id = %task.id,
                run_id = %run_id,
                error = %e,
                "Failed to start run, task stays pending"
            ),
        }

        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, ServiceError> {
        self.db
            .get_task(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn list(&self, query: &TaskQuery) -> Result<TaskPage, ServiceError> {
        Ok(self.db.list_tasks(query).await?)
    }

    /// Delete a task, cancelling its run first if it is still pending.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let task = self.get(id).await?;

        if task.status == TaskStatus::Pending {
            match self.orchestrator.cancel(&task.run_id()).await {
                Ok(CancelOutcome::Cancelled) => info!(task_id = %id, "Run cancelled"),
                Ok(outcome) => debug!(task_id = %id, ?outcome, "Nothing to cancel"),
                Err(e) => warn!(task_id = %id, error = %e, "Run cancellation failed"),
            }
        }

        if !self.db.delete_task(id).await? {
            // Deleted concurrently between lookup and delete.
            return Err(ServiceError::NotFound(id));
        }
        info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Component health: `(database_ok, orchestrator_ok)`.
    pub async fn health(&self) -> (bool, bool) {
        let database = match self.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };
        (database, self.orchestrator.is_accepting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StatevectorExecutor;
    use crate::store::LibSqlBackend;
    use crate::worker::activity::Activity;
    use crate::worker::retry::RetryPolicy;
    use crate::worker::run::RunStatus;

    const BELL: &str = "OPENQASM 3.0; include \"stdgates.inc\"; qubit[2] q; bit[2] c; \
                        h q[0]; cx q[0], q[1]; c[0] = measure q[0]; c[1] = measure q[1];";

    async fn service() -> TaskService {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let activity = Arc::new(Activity::new(
            db.clone(),
            Arc::new(StatevectorExecutor::new(8)),
            1024,
        ));
        let orchestrator = Orchestrator::new(db.clone(), activity, RetryPolicy::default());
        TaskService::new(db, orchestrator, 64, Duration::from_secs(1))
    }

    async fn settle(svc: &TaskService, id: Uuid) -> RunStatus {
        let handle = svc
            .orchestrator()
            .start(
                &id.to_string(),
                RunInput {
                    task_id: id,
                    payload: String::new(),
                },
            )
            .await
            .unwrap();
        handle.wait().await
    }

    #[tokio::test]
    async fn validation_rejects_before_creating() {
        let svc = service().await;
        assert!(matches!(
            svc.submit("   ".into()).await,
            Err(ServiceError::Validation(ValidationError::EmptyPayload))
        ));
        assert!(matches!(
            svc.submit("x".repeat(65)).await,
            Err(ServiceError::Validation(ValidationError::PayloadTooLarge { size: 65, max: 64 }))
        ));
        let page = svc.list(&TaskQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn submit_runs_to_completion() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let activity = Arc::new(Activity::new(
            db.clone(),
            Arc::new(StatevectorExecutor::new(8)),
            1024,
        ));
        let orchestrator = Orchestrator::new(db.clone(), activity, RetryPolicy::default());
        let svc = TaskService::new(db, orchestrator, 4096, Duration::from_secs(1));

        let task = svc.submit(BELL.into()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        // Attaches to the run started by submit.
        assert_eq!(settle(&svc, task.id).await, RunStatus::Completed);
        let done = svc.get(task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.unwrap().total(), 1024);
    }

    #[tokio::test]
    async fn submit_survives_orchestrator_outage() {
        let svc = service().await;
        svc.orchestrator().shutdown().await;

        let task = svc.submit("qubit q;".into()).await.unwrap();
        let stored = svc.get(task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let svc = service().await;
        let id = Uuid::new_v4();
        assert!(matches!(svc.delete(id).await, Err(ServiceError::NotFound(missing)) if missing == id));
        assert!(matches!(svc.get(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_terminal_task() {
        let svc = service().await;
        let task = svc.submit("qubit q;".into()).await.unwrap();
        // No measurements: permanent failure.
        assert_eq!(settle(&svc, task.id).await, RunStatus::Failed);
        assert_eq!(svc.get(task.id).await.unwrap().status, TaskStatus::Failed);

        svc.delete(task.id).await.unwrap();
        assert!(matches!(svc.get(task.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn health_reports_components() {
        let svc = service().await;
        assert_eq!(svc.health().await, (true, true));
        svc.orchestrator().shutdown().await;
        assert_eq!(svc.health().await, (true, false));
    }
}
