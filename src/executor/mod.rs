//! Circuit executors.
//!
//! An executor turns QASM source into a [`Circuit`] and samples it into
//! measurement [`Counts`]. The service resolves one executor at startup and
//! shares it as `Arc<dyn CircuitExecutor>`.

pub mod qasm;
pub mod simulator;

use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::tasks::model::Counts;

pub use qasm::Circuit;
pub use simulator::StatevectorExecutor;

/// Parse and run quantum circuits.
#[async_trait]
pub trait CircuitExecutor: Send + Sync {
    /// Executor name, for logs.
    fn name(&self) -> &str;

    /// Parse QASM source. Failures are [`ExecutorError::Parse`] and are
    /// never retried.
    fn parse(&self, source: &str) -> Result<Circuit, ExecutorError>;

    /// Run `circuit` for `shots` samples. Counts must sum to `shots`.
    async fn execute(&self, circuit: &Circuit, shots: u32) -> Result<Counts, ExecutorError>;
}
