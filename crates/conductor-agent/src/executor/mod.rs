//! Task execution.
//!
//! The orchestrator hands every dispatched task to an [`Executor`] together
//! with a snapshot of the leased agent and a cancellation token. The token
//! fires on shutdown and, when deadlines are enforced, on deadline expiry.

/// Shell command executor
pub mod command;

use async_trait::async_trait;
use conductor_core::{AgentSnapshot, Result, TaskRequest};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use command::CommandExecutor;

/// What an executor reports for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Whether the work succeeded
    pub success: bool,
    /// Time the work took, as measured by the executor. Informational:
    /// events and profiler samples use the dispatcher's wall clock, which
    /// also covers panics and deadline cancellations.
    pub duration_ms: u64,
    /// Human-readable summary
    pub detail: String,
}

impl ExecutionReport {
    /// Successful report.
    pub fn succeeded(duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            duration_ms,
            detail: detail.into(),
        }
    }

    /// Failed report.
    pub fn failed(duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms,
            detail: detail.into(),
        }
    }
}

/// Performs the unit of work for a task on behalf of an agent.
///
/// Returning `Err`, or panicking, is treated the same as a report with
/// `success = false`.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs the task.
    ///
    /// # Errors
    /// Returns an error if the work could not be carried out at all
    async fn execute(
        &self,
        request: &TaskRequest,
        agent: &AgentSnapshot,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport>;
}
