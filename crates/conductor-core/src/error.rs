//! Error types for dispatch and routing.

use crate::agent::{AgentId, AgentStatus};
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::result::Result as StdResult;
use thiserror::Error;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;

/// Result type alias using `DispatchError`.
pub type Result<T> = StdResult<T, DispatchError>;

/// Errors raised by the orchestrator API and its collaborators.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// TOML deserialization error
    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] TomlDeError),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] TomlSerError),

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// No idle agent can handle the task
    #[error("No suitable agent available for task {task_id}")]
    NoAgentAvailable {
        /// ID of the task that could not be routed
        task_id: TaskId,
    },

    /// Executor failed to run the task
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),

    /// Task ran past its deadline
    #[error("Deadline exceeded for task {task_id}")]
    DeadlineExceeded {
        /// ID of the task that ran out of time
        task_id: TaskId,
    },

    /// Agent is not part of the pool
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// Agent id appears twice in the pool definition
    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(AgentId),

    /// Requested status change is not allowed
    #[error("Agent {agent_id} cannot be set to {status}")]
    InvalidStatusTransition {
        /// Agent whose status was changed
        agent_id: AgentId,
        /// Requested status
        status: AgentStatus,
    },

    /// Orchestrator has already been started
    #[error("Orchestrator already started")]
    AlreadyStarted,

    /// Orchestrator is shutting down or stopped
    #[error("Orchestrator is shut down")]
    ShutDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl DispatchError {
    /// Maps this error onto the kind reported in `taskFailed` events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAgentAvailable { .. } => ErrorKind::NoAgentAvailable,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::ShutDown => ErrorKind::ShutDown,
            _ => ErrorKind::ExecutionFailure,
        }
    }
}

/// Kind of task failure carried by `taskFailed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No idle agent with a matching capability
    NoAgentAvailable,
    /// Executor reported failure, returned an error, or panicked
    ExecutionFailure,
    /// Classifier had no confident match; never fails a task
    ClassificationAmbiguous,
    /// Deadline enforcement cut the task short
    DeadlineExceeded,
    /// Orchestrator stopped before the task finished
    ShutDown,
}

impl ErrorKind {
    /// Stable name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAgentAvailable => "NoAgentAvailable",
            Self::ExecutionFailure => "ExecutionFailure",
            Self::ClassificationAmbiguous => "ClassificationAmbiguous",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::ShutDown => "ShutDown",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}
