//! Task request and its identifiers.

use super::kind::TaskType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::mem;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for TaskId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "task-{}", self.0)
    }
}

/// Task priority level.
///
/// Stored on every request and reported to callers; the queue itself is FIFO
/// and never reorders by priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority, can be deferred
    Low,
    /// Normal priority
    #[default]
    Medium,
    /// High priority, should be expedited
    High,
    /// Critical priority
    Critical,
}

impl Priority {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

/// Project context attached to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskContext {
    /// Project the task belongs to
    pub project_id: String,
    /// What the user asked for, in their words
    pub user_intent: String,
    /// Technologies in use
    pub technical_stack: Vec<String>,
    /// Business goals the work serves
    pub business_goals: Vec<String>,
    /// Constraints the work must respect
    pub constraints: Vec<String>,
    /// Tasks that preceded this one
    pub previous_tasks: Vec<String>,
}

/// A unit of work submitted to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Unique identifier for this task
    pub id: TaskId,
    /// Category of work
    pub task_type: TaskType,
    /// Priority metadata
    pub priority: Priority,
    /// Project context
    pub context: TaskContext,
    /// Requirement tags matched against agent capabilities
    pub requirements: BTreeSet<String>,
    /// Advisory deadline, enforced only when configured
    pub deadline: Option<DateTime<Utc>>,
    /// Free-form metadata
    pub metadata: Map<String, Value>,
    /// When the request was built
    pub created_at: DateTime<Utc>,
}

impl TaskRequest {
    /// Metadata key holding an explicit shell command for the task.
    pub const COMMAND_KEY: &'static str = "command";

    /// Creates a medium-priority request of the given type with no requirements.
    pub fn new(task_type: TaskType) -> Self {
        Self {
            id: TaskId::default(),
            task_type,
            priority: Priority::Medium,
            context: TaskContext::default(),
            requirements: BTreeSet::new(),
            deadline: None,
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the priority level.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the description (the context's user intent).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.context.user_intent = description.into();
        self
    }

    /// Adds requirement tags, skipping blank ones.
    #[must_use]
    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.requirements.extend(
            requirements
                .into_iter()
                .map(|tag| tag.as_ref().trim().to_owned())
                .filter(|tag| !tag.is_empty()),
        );
        self
    }

    /// Replaces the project context, keeping the current description when the
    /// new context has none.
    #[must_use]
    pub fn with_context(mut self, mut context: TaskContext) -> Self {
        if context.user_intent.is_empty() {
            context.user_intent = mem::take(&mut self.context.user_intent);
        }
        self.context = context;
        self
    }

    /// Sets the advisory deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Inserts a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Description of the task.
    pub fn description(&self) -> &str {
        &self.context.user_intent
    }

    /// Explicit shell command from metadata, if any.
    pub fn command(&self) -> Option<&str> {
        self.metadata.get(Self::COMMAND_KEY).and_then(Value::as_str)
    }
}
