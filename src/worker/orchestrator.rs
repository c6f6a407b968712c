//! Durable orchestrator — keyed runs with retries, timeout and cancellation.
//!
//! Each run is a tokio task racing its attempt loop against a cancellation
//! token, the orchestrator's shutdown token and the run deadline. Run
//! bookkeeping is persisted through [`Database`] so that runs interrupted by
//! a restart can be resumed by [`Orchestrator::recover`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::OrchestrationError;
use crate::store::Database;
use crate::tasks::model::TaskStatus;
use crate::worker::activity::{Activity, AttemptContext};
use crate::worker::retry::RetryPolicy;
use crate::worker::run::{RunInput, RunRecord, RunStatus};

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The run was active and will schedule no further attempts.
    Cancelled,
    /// The run had already finished; nothing changed.
    AlreadyFinished,
    /// No run with that id exists.
    NotFound,
}

/// Observer for one run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: String,
    status: watch::Receiver<RunStatus>,
}

impl RunHandle {
    fn finished(run_id: String, status: RunStatus) -> Self {
        let (_tx, rx) = watch::channel(status);
        Self { run_id, status: rx }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Latest known status.
    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    /// Wait until the run finishes. Returns `Running` if the orchestrator
    /// shut down first.
    pub async fn wait(&self) -> RunStatus {
        let mut rx = self.status.clone();
        let finished = rx.wait_for(RunStatus::is_finished).await.map(|s| *s);
        finished.unwrap_or_else(|_| *rx.borrow())
    }
}

struct ActiveRun {
    cancel: CancellationToken,
    status: watch::Receiver<RunStatus>,
    task: JoinHandle<()>,
}

/// How the attempt loop (or the race around it) ended.
enum Finish {
    Completed,
    Failed(String),
    Exhausted(String),
    TimedOut,
    Cancelled,
    Interrupted,
}

/// Runs durable, retrying executions keyed by run id.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    db: Arc<dyn Database>,
    activity: Arc<Activity>,
    policy: RetryPolicy,
    runs: Mutex<HashMap<String, ActiveRun>>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(db: Arc<dyn Database>, activity: Arc<Activity>, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                activity,
                policy,
                runs: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Whether new runs are accepted.
    pub fn is_accepting(&self) -> bool {
        !self.inner.shutdown.is_cancelled()
    }

    /// Number of runs currently driven by this process.
    pub async fn active_runs(&self) -> usize {
        self.inner.runs.lock().await.len()
    }

    /// Start the run `run_id`, or attach to it if it already exists.
    ///
    /// Returns once the run is recorded; never waits for it to finish.
    pub async fn start(
        &self,
        run_id: &str,
        input: RunInput,
    ) -> Result<RunHandle, OrchestrationError> {
        if !self.is_accepting() {
            return Err(OrchestrationError::Unavailable);
        }
        if run_id != input.task_id.to_string() {
            return Err(OrchestrationError::InvalidRunId {
                run_id: run_id.to_string(),
                reason: format!("expected task id {}", input.task_id),
            });
        }

        let mut runs = self.inner.runs.lock().await;
        if let Some(active) = runs.get(run_id) {
            debug!(run_id, "Attaching to active run");
            return Ok(RunHandle {
                run_id: run_id.to_string(),
                status: active.status.clone(),
            });
        }

        let record = RunRecord::new(run_id, input);
        if self.inner.db.insert_run(&record).await? {
            let deadline = Instant::now() + self.inner.policy.start_to_close_timeout;
            info!(run_id, task_id = %record.input.task_id, "Run started");
            return Ok(self.spawn(&mut runs, record, deadline));
        }

        match self.inner.db.get_run(run_id).await? {
            Some(existing) if existing.status == RunStatus::Running => {
                // Recorded by an earlier process and not yet recovered.
                let deadline = self.inner.deadline_for(&existing);
                info!(run_id, attempts = existing.attempts, "Resuming recorded run");
                Ok(self.spawn(&mut runs, existing, deadline))
            }
            Some(existing) => {
                debug!(run_id, status = %existing.status, "Run already finished");
                Ok(RunHandle::finished(existing.id, existing.status))
            }
            None => Err(OrchestrationError::InvalidRunId {
                run_id: run_id.to_string(),
                reason: "run record vanished during start".to_string(),
            }),
        }
    }

    /// Request cancellation of `run_id`.
    ///
    /// Returns once the request is accepted. An attempt already executing is
    /// abandoned; its result is never written.
    pub async fn cancel(&self, run_id: &str) -> Result<CancelOutcome, OrchestrationError> {
        {
            let runs = self.inner.runs.lock().await;
            if let Some(active) = runs.get(run_id) {
                if active.status.borrow().is_finished() {
                    return Ok(CancelOutcome::AlreadyFinished);
                }
                active.cancel.cancel();
                info!(run_id, "Run cancellation requested");
                return Ok(CancelOutcome::Cancelled);
            }
        }

        match self.inner.db.get_run(run_id).await? {
            Some(record) if record.status == RunStatus::Running => {
                self.inner
                    .db
                    .finish_run(run_id, RunStatus::Cancelled, None)
                    .await?;
                info!(run_id, "Cancelled run that was not active");
                Ok(CancelOutcome::Cancelled)
            }
            Some(_) => Ok(CancelOutcome::AlreadyFinished),
            None => Ok(CancelOutcome::NotFound),
        }
    }

    /// Resume every run left `running` by a previous process.
    ///
    /// Runs past their deadline are finished as `timed_out` and their task is
    /// marked failed. Returns the number of runs resumed.
    pub async fn recover(&self) -> Result<usize, OrchestrationError> {
        let records = self.inner.db.list_running_runs().await?;
        let mut runs = self.inner.runs.lock().await;
        let mut resumed = 0;

        for record in records {
            if runs.contains_key(&record.id) {
                continue;
            }
            let deadline = self.inner.deadline_for(&record);
            if deadline <= Instant::now() {
                let status = if self.inner.task_completed(record.input.task_id).await {
                    RunStatus::Completed
                } else {
                    warn!(run_id = %record.id, "Recovered run is past its deadline");
                    self.inner.activity.mark_failed(record.input.task_id).await;
                    RunStatus::TimedOut
                };
                self.inner.db.finish_run(&record.id, status, None).await?;
                continue;
            }
            info!(run_id = %record.id, attempts = record.attempts, "Resuming run");
            self.spawn(&mut runs, record, deadline);
            resumed += 1;
        }

        info!(resumed, "Run recovery complete");
        Ok(resumed)
    }

    /// Stop accepting runs and interrupt the active ones.
    ///
    /// Interrupted runs stay `running` in the store for the next
    /// [`recover`](Self::recover).
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let active: Vec<(String, ActiveRun)> = self.inner.runs.lock().await.drain().collect();
        let count = active.len();

        let (ids, tasks): (Vec<String>, Vec<JoinHandle<()>>) =
            active.into_iter().map(|(id, run)| (id, run.task)).unzip();
        for (run_id, joined) in ids.iter().zip(join_all(tasks).await) {
            if let Err(e) = joined {
                error!(run_id = %run_id, error = %e, "Run task panicked");
            }
        }
        info!(interrupted = count, "Orchestrator stopped");
    }

    fn spawn(
        &self,
        runs: &mut HashMap<String, ActiveRun>,
        record: RunRecord,
        deadline: Instant,
    ) -> RunHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(RunStatus::Running);
        let run_id = record.id.clone();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            inner.drive(record, deadline, token, tx).await;
        });

        runs.insert(
            run_id.clone(),
            ActiveRun {
                cancel,
                status: rx.clone(),
                task,
            },
        );
        RunHandle { run_id, status: rx }
    }
}

impl Inner {
    /// Original deadline of a recorded run.
    fn deadline_for(&self, record: &RunRecord) -> Instant {
        let elapsed = (Utc::now() - record.started_at).to_std().unwrap_or_default();
        let remaining = self.policy.start_to_close_timeout.saturating_sub(elapsed);
        Instant::now() + remaining
    }

    async fn task_completed(&self, task_id: Uuid) -> bool {
        match self.db.get_task(task_id).await {
            Ok(task) => task.is_some_and(|t| t.status == TaskStatus::Completed),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to load task status");
                false
            }
        }
    }

    async fn drive(
        &self,
        record: RunRecord,
        deadline: Instant,
        cancel: CancellationToken,
        status: watch::Sender<RunStatus>,
    ) {
        let run_id = record.id.clone();
        let task_id = record.input.task_id;

        let finish = tokio::select! {
            biased;
            _ = cancel.cancelled() => Finish::Cancelled,
            _ = self.shutdown.cancelled() => Finish::Interrupted,
            _ = tokio::time::sleep_until(deadline) => Finish::TimedOut,
            finish = self.attempt_loop(&record) => finish,
        };

        // The deadline can fire after the result was already written.
        let finish = if matches!(finish, Finish::TimedOut | Finish::Exhausted(_))
            && self.task_completed(task_id).await
        {
            Finish::Completed
        } else {
            finish
        };

        let (run_status, last_error) = match finish {
            Finish::Completed => {
                info!(run_id = %run_id, task_id = %task_id, "Run completed");
                (RunStatus::Completed, None)
            }
            Finish::Failed(reason) => {
                warn!(run_id = %run_id, task_id = %task_id, error = %reason, "Run failed");
                (RunStatus::Failed, Some(reason))
            }
            Finish::Exhausted(reason) => {
                warn!(run_id = %run_id, task_id = %task_id, error = %reason, "Run exhausted its attempts");
                self.activity.mark_failed(task_id).await;
                (RunStatus::Failed, Some(reason))
            }
            Finish::TimedOut => {
                warn!(run_id = %run_id, task_id = %task_id, "Run timed out");
                self.activity.mark_failed(task_id).await;
                (RunStatus::TimedOut, Some("start-to-close timeout elapsed".to_string()))
            }
            Finish::Cancelled => {
                info!(run_id = %run_id, task_id = %task_id, "Run cancelled");
                (RunStatus::Cancelled, None)
            }
            Finish::Interrupted => {
                info!(run_id = %run_id, "Run interrupted by shutdown");
                return;
            }
        };

        if let Err(e) = self
            .db
            .finish_run(&run_id, run_status, last_error.as_deref())
            .await
        {
            error!(run_id = %run_id, error = %e, "Failed to record run outcome");
        }
        let _ = status.send(run_status);
        self.runs.lock().await.remove(&run_id);
    }

    async fn attempt_loop(&self, record: &RunRecord) -> Finish {
        let policy = &self.policy;
        let mut attempt = record.attempts;
        let mut last_error = record.last_error.clone().unwrap_or_default();

        if attempt > 0 {
            if self.task_completed(record.input.task_id).await {
                debug!(run_id = %record.id, "Resumed run already has a result");
                return Finish::Completed;
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
        }

        loop {
            attempt += 1;
            if attempt > policy.max_attempts {
                return Finish::Exhausted(last_error);
            }

            let ctx = AttemptContext {
                attempt,
                max_attempts: policy.max_attempts,
            };
            debug!(run_id = %record.id, attempt, "Attempt started");
            let result = self.activity.execute(&record.input, ctx).await;

            let error = result.as_ref().err().map(ToString::to_string);
            if let Err(e) = self
                .db
                .record_run_attempt(&record.id, attempt, error.as_deref())
                .await
            {
                warn!(run_id = %record.id, error = %e, "Failed to record attempt");
            }

            match result {
                Ok(_) => return Finish::Completed,
                Err(e) if !e.is_retryable() => return Finish::Failed(e.to_string()),
                Err(e) => {
                    last_error = e.to_string();
                    if !policy.has_attempts_after(attempt) {
                        return Finish::Exhausted(last_error);
                    }
                    let delay = policy.delay_after(attempt);
                    debug!(
                        run_id = %record.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
