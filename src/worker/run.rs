//! Durable run records — the orchestrator's own bookkeeping.
//!
//! A run's status is independent of the task it drives: a run can be
//! `cancelled` or `timed_out` while the task row says something else (or is
//! gone). The task store stays the result of record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a durable run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Started and not yet finished (or interrupted by shutdown).
    Running,
    /// An attempt succeeded.
    Completed,
    /// A terminal failure, or retries exhausted.
    Failed,
    /// The overall start-to-close timeout elapsed.
    TimedOut,
    /// A cancel request was accepted.
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "timed_out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// Input handed to a run at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    pub task_id: Uuid,
    /// QASM3 source.
    pub payload: String,
}

/// Persisted record of one run. `id` equals the task id's string form.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub input: RunInput,
    pub status: RunStatus,
    /// Attempts that have run to an outcome. An attempt interrupted by
    /// shutdown is not counted and runs again on recovery.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(id: impl Into<String>, input: RunInput) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: id.into(),
            input,
            status: RunStatus::Running,
            attempts: 0,
            last_error: None,
            started_at: now,
            updated_at: now,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::TimedOut,
            RunStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_running_is_unfinished() {
        assert!(!RunStatus::Running.is_finished());
        assert!(RunStatus::Completed.is_finished());
        assert!(RunStatus::Cancelled.is_finished());
        assert!(RunStatus::TimedOut.is_finished());
    }

    #[test]
    fn new_record_starts_running() {
        let task_id = Uuid::new_v4();
        let record = RunRecord::new(
            task_id.to_string(),
            RunInput {
                task_id,
                payload: "OPENQASM 3;".into(),
            },
        );
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.attempts, 0);
        assert!(record.finished_at.is_none());
    }
}
