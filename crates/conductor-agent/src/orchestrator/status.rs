//! Read-only views of orchestrator state.

use chrono::{DateTime, Utc};
use conductor_core::{
    AgentId, AgentSnapshot, DispatchError, Priority, Result, TaskId, TaskOutcome, TaskRequest,
    TaskType,
};
use serde::Serialize;
use tokio::sync::oneshot;

/// Counters describing the orchestrator at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorStatus {
    /// Agents in the pool
    pub total_agents: usize,
    /// Agents that are not offline
    pub active_agents: usize,
    /// Tasks waiting in the queue
    pub queue_length: usize,
    /// Tasks currently running
    pub active_task_count: usize,
    /// Mean of the agents' smoothed response times
    pub average_response_time_ms: f64,
}

/// A task that is running on an agent.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTaskRecord {
    /// The running request
    pub task: TaskRequest,
    /// Agent running it
    pub agent_id: AgentId,
    /// When the agent was assigned
    pub started_at: DateTime<Utc>,
}

/// Advice for a free-text description, without submitting anything.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Classified task type
    pub suggested_task_type: TaskType,
    /// Best agent right now, possibly busy
    pub recommended_agent: Option<AgentSnapshot>,
    /// Estimated duration of the task type
    pub estimated_duration_ms: u64,
    /// Requirement tags found in the description
    pub requirements: Vec<String>,
    /// Classified priority
    pub priority: Priority,
}

/// Awaitable outcome of a submitted task.
pub struct TaskHandle {
    id: TaskId,
    receiver: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub(crate) const fn new(id: TaskId, receiver: oneshot::Receiver<TaskOutcome>) -> Self {
        Self { id, receiver }
    }

    /// Id of the submitted task.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Waits for the terminal outcome.
    ///
    /// # Errors
    /// Returns `ShutDown` if the orchestrator was dropped before the task
    /// finished
    pub async fn outcome(self) -> Result<TaskOutcome> {
        self.receiver.await.map_err(|_| DispatchError::ShutDown)
    }
}
