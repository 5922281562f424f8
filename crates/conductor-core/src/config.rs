//! Orchestrator configuration, loaded from TOML.

use crate::agent::AgentSpec;
use crate::error::{DispatchError, Result};
use crate::task::{TaskContext, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Complete orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Dispatch loop settings
    pub scheduler: SchedulerConfig,
    /// Predictive scoring weights
    pub scoring: ScoringConfig,
    /// Performance profiler settings
    pub profiler: ProfilerConfig,
    /// Command executor settings
    pub executor: ExecutorConfig,
    /// Context defaults for created tasks
    pub defaults: ContextDefaults,
    /// Agent pool
    #[serde(default = "AgentSpec::default_pool")]
    pub agents: Vec<AgentSpec>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            scoring: ScoringConfig::default(),
            profiler: ProfilerConfig::default(),
            executor: ExecutorConfig::default(),
            defaults: ContextDefaults::default(),
            agents: AgentSpec::default_pool(),
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval of the recurring drain tick in milliseconds
    pub tick_interval_ms: u64,
    /// Maximum number of tasks in flight
    pub max_concurrent_tasks: usize,
    /// Cancel tasks that run past their deadline
    pub enforce_deadlines: bool,
    /// Load factor added on assignment and removed on release
    pub load_step: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            max_concurrent_tasks: 1,
            enforce_deadlines: false,
            load_step: 0.1,
        }
    }
}

impl SchedulerConfig {
    /// Drain tick interval.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Weights of the predictive score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the success rate
    pub success_weight: f64,
    /// Weight of the inverse response time
    pub latency_weight: f64,
    /// Weight of the throughput
    pub throughput_weight: f64,
    /// Weight of the capability match ratio
    pub capability_weight: f64,
    /// Penalty weight of the load factor
    pub load_weight: f64,
    /// Number of ranked candidates kept
    pub top_candidates: usize,
    /// Step size of the per-type prediction update
    pub learning_rate: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            success_weight: 0.3,
            latency_weight: 0.2,
            throughput_weight: 0.1,
            capability_weight: 0.3,
            load_weight: 0.1,
            top_candidates: 3,
            learning_rate: 0.01,
        }
    }
}

/// Performance profiler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Exponential smoothing factor applied to each sample
    pub smoothing_factor: f64,
    /// Interval of the periodic performance report in milliseconds
    pub report_interval_ms: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.1,
            report_interval_ms: 1000,
        }
    }
}

impl ProfilerConfig {
    /// Report interval.
    pub const fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

/// Command executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Directory commands run in
    pub working_dir: PathBuf,
    /// Shell used to run commands (invoked as `<shell> -c <command>`)
    pub shell: String,
    /// Commands keyed by task type name
    pub commands: BTreeMap<String, String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            shell: "sh".to_owned(),
            commands: BTreeMap::new(),
        }
    }
}

impl ExecutorConfig {
    /// Configured command for a task type.
    pub fn command_for(&self, task_type: TaskType) -> Option<&str> {
        self.commands.get(task_type.as_str()).map(String::as_str)
    }
}

/// Context values used when a created task leaves a field empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextDefaults {
    /// Default project id
    pub project_id: String,
    /// Default technical stack
    pub technical_stack: Vec<String>,
    /// Default business goals
    pub business_goals: Vec<String>,
    /// Default constraints
    pub constraints: Vec<String>,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            project_id: "default".to_owned(),
            technical_stack: to_strings(&["nextjs", "typescript", "tailwindcss", "prisma"]),
            business_goals: to_strings(&["improve-user-experience", "increase-performance"]),
            constraints: to_strings(&["maintain-existing-apis", "preserve-data"]),
        }
    }
}

impl ContextDefaults {
    /// Fills the empty fields of `context` from these defaults.
    pub fn fill(&self, context: Option<TaskContext>, description: &str) -> TaskContext {
        let mut context = context.unwrap_or_default();
        if context.project_id.is_empty() {
            context.project_id.clone_from(&self.project_id);
        }
        if context.user_intent.is_empty() {
            description.clone_into(&mut context.user_intent);
        }
        if context.technical_stack.is_empty() {
            context.technical_stack.clone_from(&self.technical_stack);
        }
        if context.business_goals.is_empty() {
            context.business_goals.clone_from(&self.business_goals);
        }
        if context.constraints.is_empty() {
            context.constraints.clone_from(&self.constraints);
        }
        context
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

impl DispatchConfig {
    /// Get the default config directory path (`~/.conductor`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DispatchError::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".conductor"))
    }

    /// Get the default config file path (`~/.conductor/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with default
    /// values when missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, created, or validated
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path()?)
    }

    /// Load config from `path`, creating it with default values when missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, created, or validated
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            let config = Self::default();
            config.save_to_file(path)?;
            Ok(config)
        }
    }

    /// Load and validate config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!(
            "Loaded config from {:?}: {} agents, concurrency {}",
            path,
            config.agents.len(),
            config.scheduler.max_concurrent_tasks
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;

        let header = "# Conductor Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize the agent pool and scheduling\n\n";

        fs::write(path, format!("{header}{contents}"))?;

        Ok(())
    }

    /// Checks weights, rates, and the agent pool.
    ///
    /// # Errors
    /// Returns `Config` for the first invalid setting, or `DuplicateAgent`
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        let weights = [
            ("success_weight", scoring.success_weight),
            ("latency_weight", scoring.latency_weight),
            ("throughput_weight", scoring.throughput_weight),
            ("capability_weight", scoring.capability_weight),
            ("load_weight", scoring.load_weight),
        ];
        if let Some((name, _)) = weights.iter().find(|(_, weight)| !weight.is_finite()) {
            return Err(DispatchError::Config(format!("scoring.{name} must be finite")));
        }
        if scoring.top_candidates == 0 {
            return Err(DispatchError::Config(
                "scoring.top_candidates must be at least 1".to_owned(),
            ));
        }

        let rates = [
            ("scoring.learning_rate", scoring.learning_rate),
            ("profiler.smoothing_factor", self.profiler.smoothing_factor),
            ("scheduler.load_step", self.scheduler.load_step),
        ];
        for (name, rate) in rates {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(DispatchError::Config(format!("{name} must be in (0, 1]")));
            }
        }

        if self.scheduler.max_concurrent_tasks == 0 {
            return Err(DispatchError::Config(
                "scheduler.max_concurrent_tasks must be at least 1".to_owned(),
            ));
        }
        if self.scheduler.tick_interval_ms == 0 || self.profiler.report_interval_ms == 0 {
            return Err(DispatchError::Config(
                "tick and report intervals must be positive".to_owned(),
            ));
        }
        if self.executor.shell.trim().is_empty() {
            return Err(DispatchError::Config("executor.shell is empty".to_owned()));
        }
        for key in self.executor.commands.keys() {
            key.parse::<TaskType>().map_err(DispatchError::Config)?;
        }

        self.validate_agents()
    }

    fn validate_agents(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.agents {
            if spec.id.as_str().trim().is_empty() {
                return Err(DispatchError::Config("agent id is empty".to_owned()));
            }
            if !seen.insert(&spec.id) {
                return Err(DispatchError::DuplicateAgent(spec.id.clone()));
            }
            if !(0.0..=1.0).contains(&spec.initial_load) {
                return Err(DispatchError::Config(format!(
                    "agent {} initial_load must be in [0, 1]",
                    spec.id
                )));
            }
        }
        Ok(())
    }
}
