//! Unified `Database` trait — single async interface for all persistence.
//!
//! Tasks are the caller-visible records; runs are the orchestrator's durable
//! bookkeeping. Both live behind one trait so a single backend serves the
//! API, the activity executor, and the orchestrator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::tasks::model::{Task, TaskPage, TaskQuery, TerminalOutcome};
use crate::worker::run::{RunRecord, RunStatus};

/// Backend-agnostic database trait covering tasks and runs.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Cheap connectivity check for health probes.
    async fn ping(&self) -> Result<(), DatabaseError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// Insert a new pending task and return it.
    async fn create_task(&self) -> Result<Task, DatabaseError>;

    /// Get a task by ID.
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError>;

    /// List tasks newest first, with the unpaged total for the same filter.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, DatabaseError>;

    /// Write a terminal status (and result, for completions) in one statement.
    /// A completed task is final. Returns `false` if the task does not exist
    /// or is already completed.
    async fn set_task_terminal(
        &self,
        id: Uuid,
        outcome: &TerminalOutcome,
    ) -> Result<bool, DatabaseError>;

    /// Hard-delete a task and drop the payload from its run records.
    /// Returns `false` if it did not exist.
    async fn delete_task(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Runs ────────────────────────────────────────────────────────

    /// Insert a run record unless one with the same ID exists.
    /// Returns `true` if this call created it.
    async fn insert_run(&self, run: &RunRecord) -> Result<bool, DatabaseError>;

    /// Get a run record by ID.
    async fn get_run(&self, id: &str) -> Result<Option<RunRecord>, DatabaseError>;

    /// Record that `attempts` attempts have finished, with the latest error.
    async fn record_run_attempt(
        &self,
        id: &str,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Mark a run finished and drop its payload.
    async fn finish_run(
        &self,
        id: &str,
        status: RunStatus,
        last_error: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// All runs still marked running, oldest first.
    async fn list_running_runs(&self) -> Result<Vec<RunRecord>, DatabaseError>;
}
