//! Integration tests for pool configuration and agent state
//!
//! These tests load a pool from TOML and drive agents through the
//! assignment lifecycle the orchestrator relies on.

#![cfg(test)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Test code is allowed to use expect/unwrap and doesn't need panic docs"
)]

use conductor_core::{Agent, AgentStatus, DispatchConfig, PerformanceMetrics, TaskId};
use std::fs;
use tempfile::TempDir;

const POOL: &str = r#"
[scheduler]
max_concurrent_tasks = 3
enforce_deadlines = true

[executor]
working_dir = "/tmp"

[executor.commands]
fix_bug = "make test"

[[agents]]
id = "backend"
name = "Backend"
capabilities = ["api-design", "database"]
initial_load = 0.4

[[agents]]
id = "writer"
name = "Writer"
capabilities = ["documentation"]
priority = 2

[agents.metrics]
averageResponseTimeMs = 250.0
successRate = 0.9
throughput = 5.0
resourceUtilization = 0.2
errorRate = 0.1
lastUpdated = "2025-01-01T00:00:00Z"
"#;

#[test]
fn test_custom_pool_from_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, POOL).expect("Failed to write config");

    let config = DispatchConfig::load_from_file(&path).expect("Failed to load config");
    assert_eq!(config.scheduler.max_concurrent_tasks, 3);
    assert!(config.scheduler.enforce_deadlines);
    assert_eq!(config.agents.len(), 2);

    let writer = &config.agents[1];
    assert_eq!(writer.priority, 2);
    let metrics: &PerformanceMetrics = writer.metrics.as_ref().expect("writer metrics");
    assert!((metrics.average_response_time_ms - 250.0).abs() < f64::EPSILON);
}

#[test]
fn test_agent_lifecycle_from_config() {
    let config = DispatchConfig::default();
    let mut agents: Vec<Agent> = config.agents.iter().map(Agent::from_spec).collect();
    let step = config.scheduler.load_step;

    for agent in &mut agents {
        let before = agent.load_factor();
        assert!(agent.try_begin_task(TaskId::default(), step));
        assert_eq!(agent.status(), AgentStatus::Busy);
        assert!(agent.load_factor() <= 1.0);
        agent.finish_task(step);
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!((agent.load_factor() - before).abs() < 1e-9);
    }
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[scheduler]\nload_step = 2.0\n").expect("Failed to write config");
    DispatchConfig::load_from_file(&path).unwrap_err();

    fs::write(&path, "this is = = not toml").expect("Failed to write config");
    DispatchConfig::load_from_file(&path).unwrap_err();
}
