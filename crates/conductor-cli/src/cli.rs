use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the conductor CLI
#[derive(Debug, Parser)]
#[command(name = "conductor")]
#[command(about = "Routes development tasks to a pool of specialist agents", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Debug, Args)]
pub struct GlobalArgs {
    #[arg(short, long, global = true, help = "Config file (default: ~/.conductor/config.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Maximum tasks running at once (overrides config)")]
    pub concurrency: Option<usize>,

    #[arg(long, global = true, help = "Working directory for task commands (overrides config)")]
    pub workdir: Option<PathBuf>,

    #[arg(long, global = true, help = "Cancel tasks that run past their deadline")]
    pub enforce_deadlines: bool,

    #[arg(short, long, global = true, help = "Log debug output to stderr")]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Classify descriptions, dispatch them and wait for every outcome")]
    Run {
        #[arg(required = true, help = "Task descriptions, one task each")]
        descriptions: Vec<String>,

        #[arg(long, help = "Print every event as a JSON line")]
        json: bool,
    },

    #[command(about = "Show the task type and agent a description would get")]
    Recommend {
        #[arg(required = true, help = "Task descriptions to analyze")]
        descriptions: Vec<String>,
    },

    #[command(about = "List the configured agent pool")]
    Agents,

    #[command(about = "Write the default configuration file")]
    InitConfig {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_descriptions() {
        let cli = Cli::try_parse_from([
            "conductor",
            "run",
            "fix the login bug",
            "add tests",
            "--concurrency",
            "3",
        ])
        .expect("valid arguments");

        assert_eq!(cli.global.concurrency, Some(3));
        match cli.command {
            Commands::Run { descriptions, json } => {
                assert_eq!(descriptions, vec!["fix the login bug", "add tests"]);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_description() {
        assert!(Cli::try_parse_from(["conductor", "run"]).is_err());
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli = Cli::try_parse_from([
            "conductor",
            "--config",
            "/tmp/conductor.toml",
            "--enforce-deadlines",
            "init-config",
            "--force",
        ])
        .expect("valid arguments");

        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/conductor.toml")));
        assert!(cli.global.enforce_deadlines);
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));
    }
}
