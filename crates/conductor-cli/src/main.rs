//! Conductor CLI - dispatch development tasks to a pool of specialist agents
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Commands};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

mod cli;
mod handlers;

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "conductor_agent=debug,conductor_routing=debug,conductor_core=debug"
    } else {
        "conductor_agent=info,conductor_routing=info"
    };
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Run { descriptions, json } => {
            let config = handlers::load_config(&cli.global)?;
            return handlers::handle_run(config, &descriptions, json).await;
        }
        Commands::Recommend { descriptions } => {
            let config = handlers::load_config(&cli.global)?;
            handlers::handle_recommend(config, &descriptions).await?;
        }
        Commands::Agents => {
            handlers::handle_agents(handlers::load_config(&cli.global)?)?;
        }
        Commands::InitConfig { force } => {
            handlers::handle_init_config(&cli.global, force)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
