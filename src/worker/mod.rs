//! Durable execution — runs, retries and single attempts.
//!
//! Core components:
//! - `run` — Run records and statuses (the orchestrator's own bookkeeping)
//! - `retry` — Retry policy and backoff
//! - `activity` — One attempt: load task, execute circuit, write outcome
//! - `orchestrator` — Keyed runs with retries, timeout, cancellation and recovery

pub mod activity;
pub mod orchestrator;
pub mod retry;
pub mod run;

pub use activity::{Activity, AttemptContext, FailureWrites};
pub use orchestrator::{CancelOutcome, Orchestrator, RunHandle};
pub use retry::RetryPolicy;
pub use run::{RunInput, RunRecord, RunStatus};
