//! Capability matching between task requirements and agent tags.

use conductor_core::{AgentSnapshot, TaskRequest};

/// Matches requirement tags against capability tags.
///
/// Two tags match when, compared case-insensitively, either one contains the
/// other. Blank tags never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityMatcher;

impl CapabilityMatcher {
    /// Whether one requirement tag matches one capability tag.
    pub fn tags_match(requirement: &str, capability: &str) -> bool {
        let requirement = requirement.trim().to_lowercase();
        let capability = capability.trim().to_lowercase();
        if requirement.is_empty() || capability.is_empty() {
            return false;
        }
        requirement.contains(&capability) || capability.contains(&requirement)
    }

    /// Whether any requirement matches any capability.
    pub fn can_handle(agent: &AgentSnapshot, request: &TaskRequest) -> bool {
        request
            .requirements
            .iter()
            .any(|requirement| Self::covers(&agent.capabilities, requirement))
    }

    /// Share of requirements matched by at least one capability, in `[0, 1]`.
    pub fn match_ratio(agent: &AgentSnapshot, request: &TaskRequest) -> f64 {
        let total = request.requirements.len();
        if total == 0 {
            return 0.0;
        }
        let matched = request
            .requirements
            .iter()
            .filter(|requirement| Self::covers(&agent.capabilities, requirement))
            .count();
        (matched as f64 / total as f64).clamp(0.0, 1.0)
    }

    fn covers(capabilities: &[String], requirement: &str) -> bool {
        capabilities
            .iter()
            .any(|capability| Self::tags_match(requirement, capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{Agent, AgentSpec, PerformanceMetrics, TaskType};

    fn snapshot(capabilities: &[&str]) -> AgentSnapshot {
        Agent::from_spec(&AgentSpec::new("agent", "Agent", capabilities.iter().copied()))
            .snapshot(PerformanceMetrics::default())
    }

    #[test]
    fn test_substring_either_direction() {
        assert!(CapabilityMatcher::tags_match("testing", "unit-testing"));
        assert!(CapabilityMatcher::tags_match("unit-testing", "testing"));
        assert!(CapabilityMatcher::tags_match("React", "react"));
        assert!(!CapabilityMatcher::tags_match("docker", "prisma"));
    }

    #[test]
    fn test_blank_tags_never_match() {
        assert!(!CapabilityMatcher::tags_match("", "react"));
        assert!(!CapabilityMatcher::tags_match("react", "  "));
    }

    #[test]
    fn test_can_handle() {
        let agent = snapshot(&["playwright", "unit-testing"]);
        let request = TaskRequest::new(TaskType::AddTests).with_requirements(["testing"]);
        assert!(CapabilityMatcher::can_handle(&agent, &request));

        let unrelated = TaskRequest::new(TaskType::DeployApplication).with_requirements(["docker"]);
        assert!(!CapabilityMatcher::can_handle(&agent, &unrelated));

        let empty = TaskRequest::new(TaskType::AddTests);
        assert!(!CapabilityMatcher::can_handle(&agent, &empty));
    }

    #[test]
    fn test_match_ratio() {
        let agent = snapshot(&["react", "typescript"]);
        let request = TaskRequest::new(TaskType::ImplementFeature)
            .with_requirements(["react", "typescript", "backend", "frontend"]);
        assert!((CapabilityMatcher::match_ratio(&agent, &request) - 0.5).abs() < f64::EPSILON);
        assert!(
            CapabilityMatcher::match_ratio(&agent, &TaskRequest::new(TaskType::FixBug)).abs()
                < f64::EPSILON
        );
    }
}
