//! Free-text task classification.

use async_trait::async_trait;
use conductor_core::{ErrorKind, Priority, TaskType};
use serde::Serialize;
use tracing::warn;

/// Structured reading of a free-text task description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Inferred category
    pub task_type: TaskType,
    /// Inferred priority
    pub priority: Priority,
    /// Requirement tags found in the text
    pub requirements: Vec<String>,
    /// Whether the task type came from a keyword rather than the default
    pub confident: bool,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            task_type: TaskType::ImplementFeature,
            priority: Priority::Medium,
            requirements: Vec::new(),
            confident: false,
        }
    }
}

/// Turns a description into a classification. Never fails; an unconfident
/// result still carries usable defaults.
#[async_trait]
pub trait TaskClassifier: Send + Sync {
    /// Classifies a description.
    async fn classify(&self, text: &str) -> Classification;
}

/// Keyword rules, first matching rule wins.
const TYPE_RULES: &[(&[&str], TaskType)] = &[
    (&["fix", "bug", "error"], TaskType::FixBug),
    (&["optimize", "performance", "slow"], TaskType::OptimizePerformance),
    (&["test"], TaskType::AddTests),
    (&["refactor", "clean up", "improve code"], TaskType::RefactorCode),
    (&["deploy"], TaskType::DeployApplication),
    (&["database", "migration"], TaskType::DatabaseMigration),
    (&["api", "integrate"], TaskType::ApiIntegration),
    (&["security", "audit"], TaskType::SecurityAudit),
    (&["review"], TaskType::CodeReview),
    (&["document"], TaskType::Documentation),
];

const BUILD_KEYWORDS: &[&str] = &["implement", "create", "build"];

/// Requirement tags and the substrings that imply them.
const REQUIREMENT_RULES: &[(&str, &[&str])] = &[
    ("react", &["react"]),
    ("typescript", &["typescript"]),
    ("nextjs", &["nextjs", "next.js"]),
    ("tailwindcss", &["tailwind"]),
    ("database", &["database"]),
    ("api-design", &["api"]),
    ("mobile-optimization", &["mobile", "responsive"]),
    ("testing", &["test"]),
    ("deployment", &["deploy"]),
    ("security", &["security"]),
    ("performance-optimization", &["performance"]),
    ("ui-ux", &["design"]),
];

/// Requirement tags implied by a whole word only.
const WORD_RULES: &[(&str, &str)] = &[("database", "db"), ("ui-ux", "ui")];

const CRITICAL_KEYWORDS: &[&str] = &["urgent", "critical", "asap", "immediately"];
const HIGH_KEYWORDS: &[&str] = &["important", "high priority", "soon"];
const LOW_KEYWORDS: &[&str] = &["low priority", "when possible", "nice to have"];

/// Keyword-based classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Classifies without the async wrapper.
    pub fn classify_text(text: &str) -> Classification {
        let lowered = text.to_lowercase();
        let task_type = Self::detect_task_type(&lowered);
        let classification = Classification {
            task_type: task_type.unwrap_or(TaskType::ImplementFeature),
            priority: Self::detect_priority(&lowered),
            requirements: Self::detect_requirements(&lowered),
            confident: task_type.is_some(),
        };

        if !classification.confident {
            warn!(
                "{}: no task type keyword in {:?}, using {}",
                ErrorKind::ClassificationAmbiguous,
                text,
                classification.task_type
            );
        }
        classification
    }

    fn detect_task_type(text: &str) -> Option<TaskType> {
        if contains_any(text, BUILD_KEYWORDS) {
            return Some(if text.contains("component") {
                TaskType::CreateComponent
            } else {
                TaskType::ImplementFeature
            });
        }
        TYPE_RULES
            .iter()
            .find(|(keywords, _)| contains_any(text, keywords))
            .map(|(_, task_type)| *task_type)
    }

    fn detect_requirements(text: &str) -> Vec<String> {
        let words: Vec<&str> = text
            .split(|character: char| !character.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();

        let mut requirements: Vec<String> = Vec::new();
        for (tag, keywords) in REQUIREMENT_RULES {
            let by_word = WORD_RULES
                .iter()
                .any(|(word_tag, word)| word_tag == tag && words.contains(word));
            if (contains_any(text, keywords) || by_word) && !requirements.iter().any(|seen| seen == tag)
            {
                requirements.push((*tag).to_owned());
            }
        }
        requirements
    }

    fn detect_priority(text: &str) -> Priority {
        if contains_any(text, CRITICAL_KEYWORDS) {
            Priority::Critical
        } else if contains_any(text, HIGH_KEYWORDS) {
            Priority::High
        } else if contains_any(text, LOW_KEYWORDS) {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

#[async_trait]
impl TaskClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Classification {
        Self::classify_text(text)
    }
}
