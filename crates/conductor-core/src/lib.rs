//! Core types for the conductor task orchestrator.
//!
//! This crate provides the data model shared by routing and dispatch:
//! task requests, agents and their performance metrics, the event channel
//! used to observe the orchestrator, configuration, and error handling.

/// Agent pool types.
pub mod agent;
/// Orchestrator configuration.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Observable orchestrator events.
pub mod events;
/// Rolling per-agent performance metrics.
pub mod metrics;
/// Task request types.
pub mod task;

pub use agent::{Agent, AgentId, AgentSnapshot, AgentSpec, AgentStatus};
pub use config::{
    ContextDefaults, DispatchConfig, ExecutorConfig, ProfilerConfig, SchedulerConfig,
    ScoringConfig,
};
pub use error::{DispatchError, ErrorKind, Result};
pub use events::{EventBus, EventStream, OrchestratorEvent};
pub use metrics::PerformanceMetrics;
pub use task::{
    Complexity, Priority, TaskContext, TaskId, TaskOutcome, TaskRequest, TaskState, TaskType,
};
