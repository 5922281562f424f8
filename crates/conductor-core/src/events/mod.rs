//! Event channel for observing the orchestrator.
//! Any number of subscribers each get their own unbounded stream.

use crate::agent::AgentId;
use crate::error::ErrorKind;
use crate::metrics::PerformanceMetrics;
use crate::task::{TaskId, TaskRequest};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Event types
pub mod event;

pub use event::OrchestratorEvent;

/// Fan-out of orchestrator events to subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<UnboundedSender<OrchestratorEvent>>>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        EventStream { receiver }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.len()
    }

    /// Delivers an event to every subscriber, dropping closed ones.
    pub fn emit(&self, event: OrchestratorEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| {
            let delivered = sender.send(event.clone()).is_ok();
            if !delivered {
                debug!("Dropping closed event subscriber");
            }
            delivered
        });
    }

    /// Emits `AgentsInitialized`.
    pub fn agents_initialized(&self, count: usize) {
        self.emit(OrchestratorEvent::AgentsInitialized { count });
    }

    /// Emits `TaskQueued` for a request.
    pub fn task_queued(&self, request: &TaskRequest) {
        self.emit(OrchestratorEvent::TaskQueued {
            task_id: request.id,
            task_type: request.task_type,
            priority: request.priority,
        });
    }

    /// Emits `TaskStarted`.
    pub fn task_started(&self, task_id: TaskId, agent_id: AgentId) {
        self.emit(OrchestratorEvent::TaskStarted { task_id, agent_id });
    }

    /// Emits `TaskCompleted`.
    pub fn task_completed(&self, task_id: TaskId, agent_id: AgentId, duration_ms: u64) {
        self.emit(OrchestratorEvent::TaskCompleted {
            task_id,
            agent_id,
            duration_ms,
        });
    }

    /// Emits `TaskFailed`.
    pub fn task_failed(
        &self,
        task_id: TaskId,
        agent_id: Option<AgentId>,
        kind: ErrorKind,
        detail: String,
    ) {
        self.emit(OrchestratorEvent::TaskFailed {
            task_id,
            agent_id,
            kind,
            detail,
        });
    }

    /// Emits `MetricsUpdated`.
    pub fn metrics_updated(&self, agent_id: AgentId, metrics: PerformanceMetrics) {
        self.emit(OrchestratorEvent::MetricsUpdated { agent_id, metrics });
    }

    /// Emits `PerformanceReport`.
    pub fn performance_report(&self, agents: BTreeMap<AgentId, PerformanceMetrics>) {
        self.emit(OrchestratorEvent::PerformanceReport { agents });
    }
}

/// Receiving end of one subscription.
pub struct EventStream {
    receiver: UnboundedReceiver<OrchestratorEvent>,
}

impl EventStream {
    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<OrchestratorEvent> {
        self.receiver.recv().await
    }

    /// Returns an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<OrchestratorEvent> {
        self.receiver.try_recv().ok()
    }
}
