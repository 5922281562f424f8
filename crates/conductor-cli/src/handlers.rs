use anyhow::{Context as _, Result, bail};
use conductor_agent::Orchestrator;
use conductor_core::{DispatchConfig, OrchestratorEvent, TaskId, TaskType};
use conductor_routing::{KeywordClassifier, PerformanceReporter};
use std::collections::HashSet;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::cli::GlobalArgs;

fn config_path(args: &GlobalArgs) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(DispatchConfig::config_path()?),
    }
}

/// Loads the configuration file, creating it with defaults when missing,
/// then applies command-line overrides.
pub fn load_config(args: &GlobalArgs) -> Result<DispatchConfig> {
    let path = config_path(args)?;
    let mut config = DispatchConfig::load_or_create_at(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(concurrency) = args.concurrency {
        config.scheduler.max_concurrent_tasks = concurrency;
    }
    if let Some(workdir) = &args.workdir {
        config.executor.working_dir.clone_from(workdir);
    }
    if args.enforce_deadlines {
        config.scheduler.enforce_deadlines = true;
    }
    config.validate()?;
    Ok(config)
}

/// Dispatches every description and waits until all of them reach a
/// terminal event. Prints one line per finished task, or every event as a
/// JSON line with `json`, followed by a pool summary.
pub async fn handle_run(
    config: DispatchConfig,
    descriptions: &[String],
    json: bool,
) -> Result<ExitCode> {
    if let Some(missing) = missing_commands(&config, descriptions) {
        warn!("No command configured for {missing}; add them under [executor.commands]");
    }
    let orchestrator = Orchestrator::new(config)?;
    let mut events = orchestrator.subscribe();
    orchestrator.start()?;

    let mut pending: HashSet<TaskId> = HashSet::new();
    for description in descriptions {
        pending.insert(orchestrator.submit_description(description).await?);
    }
    info!("Submitted {} task(s)", pending.len());

    let mut failed = 0_usize;
    let mut stdout = io::stdout();
    while !pending.is_empty() {
        let Some(event) = events.recv().await else {
            warn!("Event stream closed with {} task(s) pending", pending.len());
            break;
        };
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        }

        let Some(task_id) = event.task_id() else {
            continue;
        };
        if !event.is_terminal() || !pending.remove(&task_id) {
            continue;
        }
        if !json
            && let Some(line) = outcome_line(&event)
        {
            writeln!(stdout, "{line}")?;
        }
        if matches!(event, OrchestratorEvent::TaskFailed { .. }) {
            failed += 1;
        }
    }

    let status = orchestrator.get_status();
    let report = PerformanceReporter::format_report(&orchestrator.performance_report())?;
    if !json {
        writeln!(
            stdout,
            "{} task(s), {failed} failed; {} of {} agents active",
            descriptions.len(),
            status.active_agents,
            status.total_agents
        )?;
        write!(stdout, "{report}")?;
    }
    orchestrator.shutdown().await;

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{failed} task(s) failed");
        Ok(ExitCode::FAILURE)
    }
}

/// Task types among `descriptions` that have no configured command.
fn missing_commands(config: &DispatchConfig, descriptions: &[String]) -> Option<String> {
    let mut missing: Vec<&str> = descriptions
        .iter()
        .map(|description| KeywordClassifier::classify_text(description).task_type)
        .filter(|task_type| config.executor.command_for(*task_type).is_none())
        .map(TaskType::as_str)
        .collect();
    missing.sort_unstable();
    missing.dedup();
    (!missing.is_empty()).then(|| missing.join(", "))
}

fn outcome_line(event: &OrchestratorEvent) -> Option<String> {
    match event {
        OrchestratorEvent::TaskCompleted {
            task_id,
            agent_id,
            duration_ms,
        } => Some(format!("{task_id} completed on {agent_id} in {duration_ms}ms")),
        OrchestratorEvent::TaskFailed {
            task_id,
            agent_id,
            kind,
            detail,
        } => Some(match agent_id {
            Some(agent_id) => format!("{task_id} failed on {agent_id} ({kind}): {detail}"),
            None => format!("{task_id} failed ({kind}): {detail}"),
        }),
        _ => None,
    }
}

/// Prints what each description would be classified as and routed to.
pub async fn handle_recommend(config: DispatchConfig, descriptions: &[String]) -> Result<()> {
    let orchestrator = Orchestrator::new(config)?;
    let mut stdout = io::stdout();
    for description in descriptions {
        let recommendation = orchestrator.get_recommendations_for(description).await;
        writeln!(stdout, "{}", serde_json::to_string_pretty(&recommendation)?)?;
    }
    Ok(())
}

/// Prints one line per configured agent.
pub fn handle_agents(config: DispatchConfig) -> Result<()> {
    let orchestrator = Orchestrator::new(config)?;
    let mut stdout = io::stdout().lock();
    for agent in orchestrator.agents() {
        writeln!(
            stdout,
            "{:<24} {:<8} load {:.2}  success {:.1}%  {}",
            agent.id,
            agent.status,
            agent.load_factor,
            agent.metrics.success_rate * 100.0,
            agent.capabilities.join(", ")
        )?;
    }
    Ok(())
}

/// Writes the default configuration.
pub fn handle_init_config(args: &GlobalArgs, force: bool) -> Result<()> {
    let path = config_path(args)?;
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    DispatchConfig::default().save_to_file(&path)?;
    writeln!(io::stdout().lock(), "Wrote {}", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{AgentId, ErrorKind};
    use std::fs;
    use tempfile::TempDir;

    fn args(config: PathBuf) -> GlobalArgs {
        GlobalArgs {
            config: Some(config),
            concurrency: None,
            workdir: None,
            enforce_deadlines: false,
            verbose: false,
        }
    }

    #[test]
    fn test_overrides_apply_to_loaded_config() {
        let dir = TempDir::new().expect("temp dir");
        let mut global = args(dir.path().join("config.toml"));
        global.concurrency = Some(4);
        global.workdir = Some(dir.path().to_path_buf());
        global.enforce_deadlines = true;

        let config = load_config(&global).expect("config");
        assert_eq!(config.scheduler.max_concurrent_tasks, 4);
        assert_eq!(config.executor.working_dir, dir.path());
        assert!(config.scheduler.enforce_deadlines);
        assert!(dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_outcome_lines() {
        let task_id = TaskId::default();
        let completed = OrchestratorEvent::TaskCompleted {
            task_id,
            agent_id: AgentId::from("tester"),
            duration_ms: 12,
        };
        assert_eq!(
            outcome_line(&completed),
            Some(format!("{task_id} completed on tester in 12ms"))
        );

        let unroutable = OrchestratorEvent::TaskFailed {
            task_id,
            agent_id: None,
            kind: ErrorKind::NoAgentAvailable,
            detail: "nobody".to_owned(),
        };
        let line = outcome_line(&unroutable).expect("failure line");
        assert!(line.ends_with("nobody"));
        assert!(!line.contains(" on "));

        assert_eq!(outcome_line(&OrchestratorEvent::AgentsInitialized { count: 1 }), None);
    }

    #[test]
    fn test_missing_commands_named_per_task_type() {
        let mut config = DispatchConfig::default();
        let descriptions = vec![
            "Fix the login bug".to_owned(),
            "Fix the logout bug".to_owned(),
            "Deploy to staging".to_owned(),
        ];
        assert_eq!(
            missing_commands(&config, &descriptions),
            Some("deploy_application, fix_bug".to_owned())
        );

        config
            .executor
            .commands
            .insert("fix_bug".to_owned(), "true".to_owned());
        config
            .executor
            .commands
            .insert("deploy_application".to_owned(), "true".to_owned());
        assert_eq!(missing_commands(&config, &descriptions), None);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let mut global = args(dir.path().join("config.toml"));
        global.concurrency = Some(0);
        assert!(load_config(&global).is_err());
    }

    #[test]
    fn test_init_config_refuses_to_overwrite() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "# custom\n").expect("write config");

        assert!(handle_init_config(&args(path.clone()), false).is_err());
        assert_eq!(fs::read_to_string(&path).expect("read config"), "# custom\n");

        handle_init_config(&args(path.clone()), true).expect("forced write");
        let loaded = DispatchConfig::load_from_file(&path).expect("load written config");
        assert_eq!(loaded.agents.len(), 10);
    }
}
