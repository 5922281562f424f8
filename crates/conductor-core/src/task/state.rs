//! Task lifecycle and terminal outcomes.

use crate::agent::AgentId;
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
///
/// `Queued -> Routing -> Running -> (Completed | Failed)`, or
/// `Queued -> Routing -> RoutingFailed`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting in the queue
    #[default]
    Queued,
    /// Dequeued, looking for an agent
    Routing,
    /// Assigned to an agent and executing
    Running,
    /// Finished successfully
    Completed,
    /// Execution failed
    Failed,
    /// No agent could take the task
    RoutingFailed,
}

impl TaskState {
    /// Whether the task has left the system.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RoutingFailed)
    }
}

/// Terminal result of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Executor reported success
    Completed {
        /// Agent that ran the task
        agent_id: AgentId,
        /// Wall-clock time from dispatch to completion
        duration_ms: u64,
    },
    /// Task failed at routing or execution
    Failed {
        /// Failure category
        kind: ErrorKind,
        /// Human-readable detail
        detail: String,
    },
}

impl TaskOutcome {
    /// Builds a failed outcome.
    pub fn failed(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            detail: detail.into(),
        }
    }

    /// Whether the task completed successfully.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// State the task ends in.
    pub const fn final_state(&self) -> TaskState {
        match self {
            Self::Completed { .. } => TaskState::Completed,
            Self::Failed {
                kind: ErrorKind::NoAgentAvailable,
                ..
            } => TaskState::RoutingFailed,
            Self::Failed { .. } => TaskState::Failed,
        }
    }
}
