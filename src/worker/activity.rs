//! Activity executor — one attempt at running a task's circuit.
//!
//! An attempt reloads the task, parses and executes its payload, and writes
//! the terminal outcome to the store. The returned [`ActivityError`] kind
//! tells the orchestrator whether another attempt may follow.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ActivityError, ExecutorError};
use crate::executor::CircuitExecutor;
use crate::store::Database;
use crate::tasks::model::{Counts, TaskStatus, TerminalOutcome};
use crate::worker::run::RunInput;

/// When a failing attempt writes `Failed` to the task.
///
/// `FinalOnly` keeps task status monotonic (`Pending → Completed|Failed`).
/// `EveryAttempt` writes `Failed` on every failed attempt, so a poller can see
/// `Pending → Failed → Completed` while retries are still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureWrites {
    #[default]
    FinalOnly,
    EveryAttempt,
}

impl FailureWrites {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinalOnly => "final_only",
            Self::EveryAttempt => "every_attempt",
        }
    }
}

impl fmt::Display for FailureWrites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureWrites {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "final_only" => Ok(Self::FinalOnly),
            "every_attempt" => Ok(Self::EveryAttempt),
            other => Err(format!(
                "unknown failure write policy '{other}' (expected final_only or every_attempt)"
            )),
        }
    }
}

/// Position of an attempt within its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    /// 1-indexed.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl AttemptContext {
    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Executes single attempts against the task store.
pub struct Activity {
    db: Arc<dyn Database>,
    executor: Arc<dyn CircuitExecutor>,
    shots: u32,
    failure_writes: FailureWrites,
}

impl Activity {
    pub fn new(db: Arc<dyn Database>, executor: Arc<dyn CircuitExecutor>, shots: u32) -> Self {
        Self {
            db,
            executor,
            shots,
            failure_writes: FailureWrites::default(),
        }
    }

    pub fn with_failure_writes(mut self, policy: FailureWrites) -> Self {
        self.failure_writes = policy;
        self
    }

    /// Run one attempt for `input`.
    pub async fn execute(
        &self,
        input: &RunInput,
        ctx: AttemptContext,
    ) -> Result<Counts, ActivityError> {
        let task_id = input.task_id;
        let started = Instant::now();
        info!(
            task_id = %task_id,
            attempt = ctx.attempt,
            executor = self.executor.name(),
            "Activity started"
        );

        let task = match self.db.get_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(task_id = %task_id, "Task not found, giving up");
                return Err(ActivityError::NotFound(task_id));
            }
            Err(e) => {
                let err = ActivityError::Retryable(format!("failed to load task: {e}"));
                return Err(self.fail(task_id, ctx, err).await);
            }
        };

        // A previous attempt already wrote the result (e.g. before a restart).
        if task.status == TaskStatus::Completed {
            if let Some(counts) = task.result {
                debug!(task_id = %task_id, "Task already completed");
                return Ok(counts);
            }
        }

        let circuit = match self.executor.parse(&input.payload) {
            Ok(circuit) => circuit,
            Err(e) => return Err(self.fail(task_id, ctx, ActivityError::Terminal(e.to_string())).await),
        };

        debug!(
            task_id = %task_id,
            qubits = circuit.num_qubits(),
            shots = self.shots,
            "Executing circuit"
        );

        let counts = match self.executor.execute(&circuit, self.shots).await {
            Ok(counts) if counts.total() == u64::from(self.shots) => counts,
            Ok(counts) => {
                let err = ActivityError::Terminal(format!(
                    "executor returned {} shots, expected {}",
                    counts.total(),
                    self.shots
                ));
                return Err(self.fail(task_id, ctx, err).await);
            }
            Err(e) => return Err(self.fail(task_id, ctx, classify(e)).await),
        };

        match self
            .db
            .set_task_terminal(task_id, &TerminalOutcome::Completed(counts.clone()))
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(
                task_id = %task_id,
                "Task missing or already completed, result not written"
            ),
            Err(e) => {
                let err = ActivityError::Retryable(format!("failed to store result: {e}"));
                return Err(self.fail(task_id, ctx, err).await);
            }
        }

        info!(
            task_id = %task_id,
            attempt = ctx.attempt,
            outcomes = counts.num_outcomes(),
            execution_time_ms = started.elapsed().as_millis() as u64,
            "Circuit execution completed"
        );
        Ok(counts)
    }

    /// Write `Failed` for a task. A missing task is not an error, and a
    /// completed task keeps its result.
    pub async fn mark_failed(&self, task_id: Uuid) {
        match self.db.set_task_terminal(task_id, &TerminalOutcome::Failed).await {
            Ok(true) => info!(task_id = %task_id, "Task marked as failed"),
            Ok(false) => debug!(
                task_id = %task_id,
                "Task missing or already completed, failure not recorded"
            ),
            Err(e) => error!(
                task_id = %task_id,
                error = %e,
                "Failed to update task status in database"
            ),
        }
    }

    async fn fail(&self, task_id: Uuid, ctx: AttemptContext, err: ActivityError) -> ActivityError {
        let write = match self.failure_writes {
            FailureWrites::EveryAttempt => true,
            FailureWrites::FinalOnly => !err.is_retryable() || ctx.is_last(),
        };
        if write {
            self.mark_failed(task_id).await;
        }
        warn!(
            task_id = %task_id,
            attempt = ctx.attempt,
            retryable = err.is_retryable(),
            error = %err,
            "Activity failed"
        );
        err
    }
}

fn classify(err: ExecutorError) -> ActivityError {
    match err {
        ExecutorError::Compute {
            transient: true, ..
        } => ActivityError::Retryable(err.to_string()),
        other => ActivityError::Terminal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::executor::{Circuit, StatevectorExecutor};
    use crate::store::LibSqlBackend;

    const X_CIRCUIT: &str = "OPENQASM 3.0; qubit q; bit c; x q; c = measure q;";

    /// Fails transiently `failures` times, then delegates to the simulator.
    struct Flaky {
        inner: StatevectorExecutor,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CircuitExecutor for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn parse(&self, source: &str) -> Result<Circuit, ExecutorError> {
            self.inner.parse(source)
        }

        async fn execute(&self, circuit: &Circuit, shots: u32) -> Result<Counts, ExecutorError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(ExecutorError::transient("backend unavailable"));
            }
            self.inner.execute(circuit, shots).await
        }
    }

    /// Returns fewer samples than asked for.
    struct ShortCounts;

    #[async_trait]
    impl CircuitExecutor for ShortCounts {
        fn name(&self) -> &str {
            "short"
        }

        fn parse(&self, source: &str) -> Result<Circuit, ExecutorError> {
            crate::executor::qasm::parse(source)
        }

        async fn execute(&self, _circuit: &Circuit, _shots: u32) -> Result<Counts, ExecutorError> {
            Ok([("0", 1u64)].into_iter().collect())
        }
    }

    async fn setup(
        executor: Arc<dyn CircuitExecutor>,
        policy: FailureWrites,
    ) -> (Arc<dyn Database>, Activity) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let activity = Activity::new(db.clone(), executor, 1024).with_failure_writes(policy);
        (db, activity)
    }

    fn flaky(failures: u32) -> Arc<dyn CircuitExecutor> {
        Arc::new(Flaky {
            inner: StatevectorExecutor::new(4).with_seed(1),
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn ctx(attempt: u32) -> AttemptContext {
        AttemptContext {
            attempt,
            max_attempts: 3,
        }
    }

    #[test]
    fn failure_write_policy_parsing() {
        assert_eq!("final_only".parse::<FailureWrites>().unwrap(), FailureWrites::FinalOnly);
        assert_eq!(
            "Every-Attempt".parse::<FailureWrites>().unwrap(),
            FailureWrites::EveryAttempt
        );
        assert!("sometimes".parse::<FailureWrites>().is_err());
        assert_eq!(FailureWrites::default(), FailureWrites::FinalOnly);
    }

    #[tokio::test]
    async fn success_writes_completed_counts() {
        let (db, activity) = setup(flaky(0), FailureWrites::FinalOnly).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: X_CIRCUIT.into(),
        };

        let counts = activity.execute(&input, ctx(1)).await.unwrap();
        assert_eq!(counts.get("1"), 1024);

        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.result.unwrap(), counts);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let (_db, activity) = setup(flaky(0), FailureWrites::FinalOnly).await;
        let id = Uuid::new_v4();
        let input = RunInput {
            task_id: id,
            payload: X_CIRCUIT.into(),
        };

        let err = activity.execute(&input, ctx(1)).await.unwrap_err();
        assert!(matches!(err, ActivityError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn parse_failure_is_terminal_and_marks_failed() {
        let (db, activity) = setup(flaky(0), FailureWrites::FinalOnly).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: "this is not qasm".into(),
        };

        let err = activity.execute(&input, ctx(1)).await.unwrap_err();
        assert!(matches!(err, ActivityError::Terminal(_)));

        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn final_only_leaves_task_pending_while_retries_remain() {
        let (db, activity) = setup(flaky(5), FailureWrites::FinalOnly).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: X_CIRCUIT.into(),
        };

        let err = activity.execute(&input, ctx(1)).await.unwrap_err();
        assert!(err.is_retryable());
        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);

        // The last attempt records the failure.
        activity.execute(&input, ctx(3)).await.unwrap_err();
        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn every_attempt_writes_failed_before_retry() {
        let (db, activity) = setup(flaky(1), FailureWrites::EveryAttempt).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: X_CIRCUIT.into(),
        };

        activity.execute(&input, ctx(1)).await.unwrap_err();
        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);

        activity.execute(&input, ctx(2)).await.unwrap();
        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn wrong_shot_total_is_terminal() {
        let (db, activity) = setup(Arc::new(ShortCounts), FailureWrites::FinalOnly).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: X_CIRCUIT.into(),
        };

        let err = activity.execute(&input, ctx(1)).await.unwrap_err();
        assert!(matches!(err, ActivityError::Terminal(_)));
        let stored = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn completed_task_is_not_re_executed() {
        let executor = Arc::new(Flaky {
            inner: StatevectorExecutor::new(4),
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let (db, activity) = setup(executor.clone(), FailureWrites::FinalOnly).await;
        let task = db.create_task().await.unwrap();
        let input = RunInput {
            task_id: task.id,
            payload: X_CIRCUIT.into(),
        };

        let first = activity.execute(&input, ctx(1)).await.unwrap();
        let second = activity.execute(&input, ctx(1)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mark_failed_on_missing_task_is_benign() {
        let (_db, activity) = setup(flaky(0), FailureWrites::FinalOnly).await;
        activity.mark_failed(Uuid::new_v4()).await;
    }
}
