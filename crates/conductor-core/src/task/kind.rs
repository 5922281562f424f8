//! Task categories and their static lookup tables.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

/// Category of development work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Build a new feature
    ImplementFeature,
    /// Fix a defect
    FixBug,
    /// Improve runtime performance
    OptimizePerformance,
    /// Add or extend tests
    AddTests,
    /// Restructure existing code
    RefactorCode,
    /// Bump third-party dependencies
    UpdateDependencies,
    /// Create a UI component
    CreateComponent,
    /// Change the database schema
    DatabaseMigration,
    /// Integrate a third-party API
    ApiIntegration,
    /// Ship the application
    DeployApplication,
    /// Review security posture
    SecurityAudit,
    /// Review a change
    CodeReview,
    /// Write documentation
    Documentation,
}

impl TaskType {
    /// Every task type, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::ImplementFeature,
        Self::FixBug,
        Self::OptimizePerformance,
        Self::AddTests,
        Self::RefactorCode,
        Self::UpdateDependencies,
        Self::CreateComponent,
        Self::DatabaseMigration,
        Self::ApiIntegration,
        Self::DeployApplication,
        Self::SecurityAudit,
        Self::CodeReview,
        Self::Documentation,
    ];

    /// Snake-case name used in configuration and serialized events.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImplementFeature => "implement_feature",
            Self::FixBug => "fix_bug",
            Self::OptimizePerformance => "optimize_performance",
            Self::AddTests => "add_tests",
            Self::RefactorCode => "refactor_code",
            Self::UpdateDependencies => "update_dependencies",
            Self::CreateComponent => "create_component",
            Self::DatabaseMigration => "database_migration",
            Self::ApiIntegration => "api_integration",
            Self::DeployApplication => "deploy_application",
            Self::SecurityAudit => "security_audit",
            Self::CodeReview => "code_review",
            Self::Documentation => "documentation",
        }
    }

    /// Requirement tags every task of this type carries.
    pub const fn default_requirements(self) -> &'static [&'static str] {
        match self {
            Self::ImplementFeature => &["react", "typescript", "frontend", "backend"],
            Self::FixBug => &["debugging", "testing", "code-analysis"],
            Self::OptimizePerformance => &["performance-optimization", "caching", "monitoring"],
            Self::AddTests => &["testing", "jest", "playwright", "unit-testing"],
            Self::RefactorCode => &["refactoring", "code-quality", "architecture"],
            Self::UpdateDependencies => &["package-management", "compatibility", "migration"],
            Self::CreateComponent => &["react", "typescript", "component-design", "ui-ux"],
            Self::DatabaseMigration => &["database", "prisma", "migrations", "data-modeling"],
            Self::ApiIntegration => &["api", "integration", "webhooks", "backend"],
            Self::DeployApplication => &["deployment", "devops", "ci-cd", "infrastructure"],
            Self::SecurityAudit => &["security", "vulnerability-assessment", "authentication"],
            Self::CodeReview => &["code-review", "quality-assurance", "best-practices"],
            Self::Documentation => &["documentation", "technical-writing", "api-documentation"],
        }
    }

    /// Rough wall-clock estimate for a task of this type.
    pub const fn estimated_duration(self) -> Duration {
        let minutes = match self {
            Self::ImplementFeature | Self::SecurityAudit => 60,
            Self::OptimizePerformance | Self::ApiIntegration => 45,
            Self::RefactorCode => 40,
            Self::FixBug | Self::CreateComponent | Self::DeployApplication | Self::Documentation => {
                30
            }
            Self::AddTests | Self::DatabaseMigration | Self::CodeReview => 20,
            Self::UpdateDependencies => 15,
        };
        Duration::from_secs(minutes * 60)
    }

    /// Complexity of this task type before requirement adjustments.
    pub const fn base_complexity(self) -> Complexity {
        match self {
            Self::ImplementFeature
            | Self::OptimizePerformance
            | Self::ApiIntegration
            | Self::SecurityAudit => Complexity::High,
            Self::FixBug
            | Self::RefactorCode
            | Self::CreateComponent
            | Self::DatabaseMigration
            | Self::DeployApplication => Complexity::Medium,
            Self::AddTests | Self::UpdateDependencies | Self::CodeReview | Self::Documentation => {
                Complexity::Low
            }
        }
    }
}

impl Display for TaskType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task_type| task_type.as_str() == value)
            .ok_or_else(|| format!("unknown task type: {value}"))
    }
}

/// Coarse effort estimate stored in task metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Small, well-understood change
    Low,
    /// Typical change
    Medium,
    /// Large or risky change
    High,
}

impl Complexity {
    /// Caller-supplied requirement count above which complexity is bumped.
    const REQUIREMENT_THRESHOLD: usize = 5;

    /// Assesses a task: base complexity of the type, one step higher when the
    /// caller asked for more than five extra requirements.
    pub fn assess(task_type: TaskType, extra_requirements: usize) -> Self {
        let base = task_type.base_complexity();
        if extra_requirements > Self::REQUIREMENT_THRESHOLD {
            base.bump()
        } else {
            base
        }
    }

    const fn bump(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}
