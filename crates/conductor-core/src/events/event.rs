//! Orchestrator event type and its helpers.

use crate::agent::AgentId;
use crate::error::ErrorKind;
use crate::metrics::PerformanceMetrics;
use crate::task::{Priority, TaskId, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observable orchestrator event.
///
/// For a given task id the orchestrator emits `TaskQueued` first and exactly
/// one of `TaskCompleted` / `TaskFailed` last, with `TaskStarted` in between
/// when an agent was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OrchestratorEvent {
    /// Pool is ready
    AgentsInitialized {
        /// Number of agents in the pool
        count: usize,
    },
    /// Task accepted into the queue
    TaskQueued {
        /// ID of the task
        task_id: TaskId,
        /// Category of the task
        task_type: TaskType,
        /// Priority metadata
        priority: Priority,
    },
    /// Task assigned to an agent
    TaskStarted {
        /// ID of the task
        task_id: TaskId,
        /// Agent running it
        agent_id: AgentId,
    },
    /// Task finished successfully
    TaskCompleted {
        /// ID of the task
        task_id: TaskId,
        /// Agent that ran it
        agent_id: AgentId,
        /// Wall-clock duration
        duration_ms: u64,
    },
    /// Task failed at routing or execution
    TaskFailed {
        /// ID of the task
        task_id: TaskId,
        /// Agent the task ran on, when it got that far
        agent_id: Option<AgentId>,
        /// Failure category
        kind: ErrorKind,
        /// Human-readable detail
        detail: String,
    },
    /// Profiler folded in a sample
    MetricsUpdated {
        /// Agent whose metrics changed
        agent_id: AgentId,
        /// Metrics after the update
        metrics: PerformanceMetrics,
    },
    /// Periodic snapshot of every agent's metrics
    PerformanceReport {
        /// Metrics keyed by agent
        agents: BTreeMap<AgentId, PerformanceMetrics>,
    },
}

impl OrchestratorEvent {
    /// Task this event refers to, if any.
    pub const fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::TaskQueued { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. } => Some(*task_id),
            Self::AgentsInitialized { .. }
            | Self::MetricsUpdated { .. }
            | Self::PerformanceReport { .. } => None,
        }
    }

    /// Whether this event ends a task's lifecycle.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::TaskCompleted { .. } | Self::TaskFailed { .. })
    }
}
