//! Task dispatch for the conductor orchestrator.
//!
//! The [`Orchestrator`] owns the agent registry, the FIFO task queue and
//! the background dispatch loop. Work itself is delegated to an
//! [`Executor`]; the default [`CommandExecutor`] runs one shell command per
//! task.

/// Task executors
pub mod executor;
/// Orchestrator and its background tasks
pub mod orchestrator;
/// FIFO task queue
pub mod queue;
/// Agent registry and leases
pub mod registry;

pub use executor::{CommandExecutor, ExecutionReport, Executor};
pub use orchestrator::{
    ActiveTaskRecord, Orchestrator, OrchestratorBuilder, OrchestratorStatus, Recommendation,
    TaskHandle,
};
pub use queue::{QueuedTask, TaskQueue};
pub use registry::{AgentLease, AgentRegistry};
