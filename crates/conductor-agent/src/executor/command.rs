//! Executor that runs a shell command per task.

use super::{ExecutionReport, Executor};
use async_trait::async_trait;
use conductor_core::{AgentSnapshot, DispatchError, ExecutorConfig, Result, TaskRequest};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Longest detail kept from command output.
const DETAIL_LIMIT: usize = 400;

/// Runs `<shell> -c <command>` in the configured working directory.
///
/// The command comes from the task's `command` metadata, else from the
/// configured command for its task type. The child is killed when the task
/// is cancelled.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Environment variable carrying the task id
    pub const ENV_TASK_ID: &'static str = "CONDUCTOR_TASK_ID";
    /// Environment variable carrying the task type
    pub const ENV_TASK_TYPE: &'static str = "CONDUCTOR_TASK_TYPE";
    /// Environment variable carrying the agent id
    pub const ENV_AGENT_ID: &'static str = "CONDUCTOR_AGENT_ID";
    /// Environment variable carrying the task description
    pub const ENV_DESCRIPTION: &'static str = "CONDUCTOR_TASK_DESCRIPTION";

    /// Creates an executor from its settings.
    #[must_use]
    pub const fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Command that would run for a request.
    pub fn resolve_command<'req>(&'req self, request: &'req TaskRequest) -> Option<&'req str> {
        request
            .command()
            .or_else(|| self.config.command_for(request.task_type))
            .filter(|command| !command.trim().is_empty())
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(
        &self,
        request: &TaskRequest,
        agent: &AgentSnapshot,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        let command_str = self.resolve_command(request).ok_or_else(|| {
            DispatchError::ExecutionFailed(format!(
                "No command configured for task type {0}; set {0} under [executor.commands] in the config file",
                request.task_type
            ))
        })?;

        debug!(
            "Running command for {} on {}: {} in {:?}",
            request.id, agent.id, command_str, self.config.working_dir
        );

        let start = Instant::now();
        let child = Command::new(&self.config.shell)
            .arg("-c")
            .arg(command_str)
            .current_dir(&self.config.working_dir)
            .env(Self::ENV_TASK_ID, request.id.to_string())
            .env(Self::ENV_TASK_TYPE, request.task_type.as_str())
            .env(Self::ENV_AGENT_ID, agent.id.as_str())
            .env(Self::ENV_DESCRIPTION, request.description())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                DispatchError::ExecutionFailed(format!(
                    "Failed to spawn '{command_str}': {error}"
                ))
            })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            () = cancel.cancelled() => {
                return Err(DispatchError::ExecutionFailed(format!(
                    "Command '{command_str}' cancelled"
                )));
            }
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            Ok(ExecutionReport::succeeded(duration_ms, summarize(&stdout)))
        } else {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_owned(), |code| code.to_string());
            let output_text = if stderr.trim().is_empty() { stdout } else { stderr };
            Ok(ExecutionReport::failed(
                duration_ms,
                format!("exit {code}: {}", summarize(&output_text)),
            ))
        }
    }
}

fn summarize(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.len() <= DETAIL_LIMIT {
        return trimmed.to_owned();
    }
    let mut start = trimmed.len() - DETAIL_LIMIT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{Agent, AgentSpec, PerformanceMetrics, TaskType};
    use std::collections::BTreeMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::sleep;

    fn agent() -> AgentSnapshot {
        Agent::from_spec(&AgentSpec::new("runner", "Runner", ["debugging"]))
            .snapshot(PerformanceMetrics::default())
    }

    fn executor(dir: &TempDir, commands: &[(&str, &str)]) -> CommandExecutor {
        CommandExecutor::new(ExecutorConfig {
            working_dir: dir.path().to_path_buf(),
            shell: "sh".to_owned(),
            commands: commands
                .iter()
                .map(|(task_type, command)| ((*task_type).to_owned(), (*command).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_configured_command_succeeds() {
        let dir = TempDir::new().expect("temp dir");
        let executor = executor(&dir, &[("fix_bug", "echo fixed by $CONDUCTOR_AGENT_ID")]);
        let request = TaskRequest::new(TaskType::FixBug);
        let report = executor
            .execute(&request, &agent(), CancellationToken::new())
            .await
            .expect("report");
        assert!(report.success);
        assert_eq!(report.detail, "fixed by runner");
    }

    #[tokio::test]
    async fn test_metadata_command_overrides_config() {
        let dir = TempDir::new().expect("temp dir");
        let executor = executor(&dir, &[("fix_bug", "true")]);
        let request = TaskRequest::new(TaskType::FixBug)
            .with_metadata("command", "echo broken >&2; exit 3");
        let report = executor
            .execute(&request, &agent(), CancellationToken::new())
            .await
            .expect("report");
        assert!(!report.success);
        assert_eq!(report.detail, "exit 3: broken");
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let executor = executor(&dir, &[]);
        let request = TaskRequest::new(TaskType::Documentation);
        let result = executor
            .execute(&request, &agent(), CancellationToken::new())
            .await;
        assert!(matches!(
            &result,
            Err(DispatchError::ExecutionFailed(message))
                if message.contains("documentation under [executor.commands]")
        ));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("marker.txt"), "here").expect("write marker");
        let executor = executor(&dir, &[("code_review", "cat marker.txt")]);
        let report = executor
            .execute(
                &TaskRequest::new(TaskType::CodeReview),
                &agent(),
                CancellationToken::new(),
            )
            .await
            .expect("report");
        assert_eq!(report.detail, "here");
    }

    #[tokio::test]
    async fn test_cancellation_stops_command() {
        let dir = TempDir::new().expect("temp dir");
        let executor = executor(&dir, &[("deploy_application", "sleep 30")]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = executor
            .execute(&TaskRequest::new(TaskType::DeployApplication), &agent(), cancel)
            .await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_summarize_keeps_tail() {
        let long = "x".repeat(DETAIL_LIMIT * 2);
        let summary = summarize(&long);
        assert!(summary.starts_with("..."));
        assert_eq!(summary.len(), DETAIL_LIMIT + 3);
    }
}
