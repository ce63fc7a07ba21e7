//! Execution engine trait.
//!
//! Defines the interface to the stateful interpreter each session owns.

use crate::error::Result;
use crate::item::OutputRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Result of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub records: Vec<OutputRecord>,
    /// Engine-side counter for this run (1-based since the last restart)
    pub execution_count: u64,
}

impl ExecutionOutcome {
    pub fn has_error(&self) -> bool {
        self.records.iter().any(OutputRecord::is_error)
    }
}

/// A possibly slow, cancelable interpreter.
///
/// The registry never holds its lock across calls into this trait.
///
/// # Implementation Notes
///
/// - `execute` should honour `timeout` itself where it can; the registry also
///   enforces it from the outside and calls `stop` on expiry.
/// - `stop` must only affect an in-flight execution and be a no-op otherwise.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(&self, source: &str, timeout: Duration) -> Result<ExecutionOutcome>;

    /// Interrupts the running execution, if any.
    async fn stop(&self) -> Result<()>;

    /// Discards interpreter state and resets the execution counter.
    async fn restart(&self) -> Result<()>;

    /// Releases the engine; called when its session is released.
    async fn shutdown(&self) -> Result<()>;
}

/// Creates one engine per registered session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, session: &str) -> Arc<dyn ExecutionEngine>;
}
