//! Worker agents and their pool definition.

use crate::error::{DispatchError, Result};
use crate::metrics::PerformanceMetrics;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Identifier of a pool agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for AgentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(&self.0)
    }
}

/// Availability of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Ready for work
    #[default]
    Idle,
    /// Running a task
    Busy,
    /// Marked faulty by an operator
    Error,
    /// Removed from service
    Offline,
}

impl Display for AgentStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Offline => "offline",
        })
    }
}

/// Pool definition of one agent, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique id
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Capability tags
    pub capabilities: Vec<String>,
    /// Priority class (1 is the highest)
    #[serde(default = "AgentSpec::default_priority")]
    pub priority: u8,
    /// Load factor at start-up
    #[serde(default = "AgentSpec::default_load")]
    pub initial_load: f64,
    /// Metrics at start-up; pool defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerformanceMetrics>,
}

impl AgentSpec {
    const fn default_priority() -> u8 {
        1
    }

    const fn default_load() -> f64 {
        0.1
    }

    /// Creates a spec with default priority and load.
    pub fn new<I, S>(id: impl Into<AgentId>, name: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            priority: Self::default_priority(),
            initial_load: Self::default_load(),
            metrics: None,
        }
    }

    /// Sets the start-up load factor.
    #[must_use]
    pub fn with_load(mut self, load: f64) -> Self {
        self.initial_load = load;
        self
    }

    /// Sets the priority class.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the start-up metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: PerformanceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The built-in pool of development specialists.
    pub fn default_pool() -> Vec<Self> {
        vec![
            Self::new(
                "full-stack-dev",
                "Full Stack Development Specialist",
                [
                    "react", "nextjs", "typescript", "nodejs", "database", "api-design",
                    "frontend", "backend",
                ],
            ),
            Self::new(
                "ui-ux-expert",
                "UI/UX Design & Implementation Expert",
                [
                    "tailwindcss",
                    "responsive-design",
                    "accessibility",
                    "user-experience",
                    "component-design",
                    "mobile-optimization",
                ],
            ),
            Self::new(
                "testing-specialist",
                "Testing & Quality Assurance Specialist",
                [
                    "playwright",
                    "jest",
                    "unit-testing",
                    "e2e-testing",
                    "test-automation",
                    "quality-assurance",
                ],
            ),
            Self::new(
                "database-expert",
                "Database & Backend Integration Expert",
                [
                    "prisma",
                    "postgresql",
                    "database-design",
                    "migrations",
                    "api-endpoints",
                    "data-modeling",
                ],
            )
            .with_load(0.15),
            Self::new(
                "deployment-devops",
                "Deployment & DevOps Specialist",
                [
                    "deployment",
                    "ci-cd",
                    "docker",
                    "railway",
                    "vercel",
                    "environment-setup",
                    "monitoring",
                ],
            )
            .with_load(0.2),
            Self::new(
                "performance-optimizer",
                "Performance & Optimization Expert",
                [
                    "performance-optimization",
                    "caching",
                    "bundle-optimization",
                    "seo",
                    "core-web-vitals",
                    "lighthouse",
                ],
            )
            .with_load(0.15),
            Self::new(
                "security-specialist",
                "Security & Best Practices Expert",
                [
                    "security-audit",
                    "authentication",
                    "authorization",
                    "data-protection",
                    "vulnerability-assessment",
                    "compliance",
                ],
            )
            .with_load(0.15),
            Self::new(
                "documentation-expert",
                "Documentation & Knowledge Management",
                [
                    "technical-documentation",
                    "api-documentation",
                    "user-guides",
                    "code-comments",
                    "readme-files",
                ],
            )
            .with_priority(2),
            Self::new(
                "integration-specialist",
                "Third-Party Integration Specialist",
                [
                    "api-integration",
                    "webhooks",
                    "payment-gateways",
                    "email-services",
                    "sms-services",
                    "social-auth",
                ],
            )
            .with_load(0.2),
            Self::new(
                "mobile-expert",
                "Mobile & Responsive Design Expert",
                [
                    "mobile-optimization",
                    "pwa",
                    "responsive-design",
                    "touch-interfaces",
                    "mobile-performance",
                    "app-like-experience",
                ],
            )
            .with_load(0.15),
        ]
    }
}

/// Live state of a pool agent.
///
/// Capabilities are fixed at construction. The load factor is clamped to
/// `[0, 1]` by every mutation, and an agent holds at most one task.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    name: String,
    capabilities: Vec<String>,
    priority: u8,
    status: AgentStatus,
    load_factor: f64,
    current_task: Option<TaskId>,
}

impl Agent {
    /// Builds an idle agent from its pool definition.
    pub fn from_spec(spec: &AgentSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            capabilities: spec.capabilities.clone(),
            priority: spec.priority,
            status: AgentStatus::Idle,
            load_factor: clamp_unit(spec.initial_load),
            current_task: None,
        }
    }

    /// Agent id.
    pub const fn id(&self) -> &AgentId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability tags.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Current status.
    pub const fn status(&self) -> AgentStatus {
        self.status
    }

    /// Current load factor in `[0, 1]`.
    pub const fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Task currently assigned, if any.
    pub const fn current_task(&self) -> Option<TaskId> {
        self.current_task
    }

    /// Compare-and-swap idle -> busy. Returns `false` and changes nothing
    /// unless the agent is idle and holds no task.
    pub fn try_begin_task(&mut self, task_id: TaskId, load_step: f64) -> bool {
        if self.status != AgentStatus::Idle || self.current_task.is_some() {
            return false;
        }
        self.status = AgentStatus::Busy;
        self.current_task = Some(task_id);
        self.load_factor = clamp_unit(self.load_factor + load_step);
        true
    }

    /// Releases the current task. A busy agent returns to idle; an agent an
    /// operator moved to error or offline keeps that status.
    pub fn finish_task(&mut self, load_step: f64) {
        if self.current_task.take().is_none() {
            return;
        }
        if self.status == AgentStatus::Busy {
            self.status = AgentStatus::Idle;
        }
        self.load_factor = clamp_unit(self.load_factor - load_step);
    }

    /// Operator status override.
    ///
    /// # Errors
    /// Returns `InvalidStatusTransition` when asked to set `Busy` directly, or
    /// to set `Idle` while the agent still holds a task.
    pub fn set_status(&mut self, status: AgentStatus) -> Result<()> {
        let holding_task = self.current_task.is_some();
        match status {
            AgentStatus::Busy => Err(self.invalid_transition(status)),
            AgentStatus::Idle if holding_task => Err(self.invalid_transition(status)),
            AgentStatus::Idle | AgentStatus::Error | AgentStatus::Offline => {
                self.status = status;
                Ok(())
            }
        }
    }

    fn invalid_transition(&self, status: AgentStatus) -> DispatchError {
        DispatchError::InvalidStatusTransition {
            agent_id: self.id.clone(),
            status,
        }
    }

    /// Read-only view joined with the agent's metrics.
    pub fn snapshot(&self, metrics: PerformanceMetrics) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            capabilities: self.capabilities.clone(),
            priority: self.priority,
            status: self.status,
            load_factor: self.load_factor,
            current_task: self.current_task,
            metrics,
        }
    }
}

/// Point-in-time copy of an agent and its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent id
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Capability tags
    pub capabilities: Vec<String>,
    /// Priority class
    pub priority: u8,
    /// Status when the snapshot was taken
    pub status: AgentStatus,
    /// Load factor when the snapshot was taken
    pub load_factor: f64,
    /// Task held when the snapshot was taken
    pub current_task: Option<TaskId>,
    /// Performance metrics
    pub metrics: PerformanceMetrics,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        Agent::from_spec(&AgentSpec::new("worker", "Worker", ["debugging"]).with_load(0.95))
    }

    #[test]
    fn test_begin_task_is_compare_and_swap() {
        let mut worker = agent();
        assert!(worker.try_begin_task(TaskId::default(), 0.1));
        assert_eq!(worker.status(), AgentStatus::Busy);
        assert!(!worker.try_begin_task(TaskId::default(), 0.1));
        assert!((worker.load_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_factor_stays_in_bounds() {
        let mut worker = agent();
        for _ in 0..20 {
            assert!(worker.try_begin_task(TaskId::default(), 0.3));
            assert!(worker.load_factor() <= 1.0);
            worker.finish_task(0.3);
            assert!(worker.load_factor() >= 0.0);
        }
        worker.finish_task(0.3);
        assert!(worker.load_factor() >= 0.0);
        assert_eq!(worker.status(), AgentStatus::Idle);
    }

    #[test]
    fn test_initial_load_is_clamped() {
        let spec = AgentSpec::new("hot", "Hot", ["x"]).with_load(3.0);
        assert!((Agent::from_spec(&spec).load_factor() - 1.0).abs() < f64::EPSILON);
        let negative = AgentSpec::new("cold", "Cold", ["x"]).with_load(-1.0);
        assert!(Agent::from_spec(&negative).load_factor().abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_overrides() {
        let mut worker = agent();
        worker.set_status(AgentStatus::Busy).unwrap_err();

        assert!(worker.try_begin_task(TaskId::default(), 0.0));
        worker.set_status(AgentStatus::Idle).unwrap_err();
        worker.set_status(AgentStatus::Offline).expect("offline while busy");
        worker.finish_task(0.0);
        assert_eq!(worker.status(), AgentStatus::Offline);
        assert!(worker.current_task().is_none());

        worker.set_status(AgentStatus::Idle).expect("back to idle");
        assert!(worker.try_begin_task(TaskId::default(), 0.0));
    }

    #[test]
    fn test_default_pool() {
        let pool = AgentSpec::default_pool();
        assert_eq!(pool.len(), 10);
        let deployment = pool
            .iter()
            .find(|spec| spec.id.as_str() == "deployment-devops")
            .expect("deployment agent");
        assert!(deployment.capabilities.iter().any(|tag| tag == "ci-cd"));
        assert!((deployment.initial_load - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spec_deserialize_defaults() {
        let spec: AgentSpec = toml::from_str(
            r#"
id = "reviewer"
name = "Reviewer"
capabilities = ["code-review"]
"#,
        )
        .expect("parse spec");
        assert_eq!(spec.priority, 1);
        assert!((spec.initial_load - 0.1).abs() < f64::EPSILON);
        assert!(spec.metrics.is_none());
    }
}
