//! courtside CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use courtside_core::{TracingConfig, init_tracing};
use courtside_providers::AbortHandle;
use tokio::task::JoinHandle;
use tracing::warn;

use courtside_cli::cli::{Cli, Command, ConfigAction};
use courtside_cli::commands;
use courtside_cli::config::ClientConfig;
use courtside_cli::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    let abort = AbortHandle::new();
    let watcher = spawn_abort_watcher(abort.clone(), cli.deadline());

    let result = match cli.command {
        Command::Availability {
            year,
            month,
            refresh,
        } => commands::availability::run(&config, year, month, refresh, abort).await,
        Command::Book { slots, no_alerts } => {
            commands::book::run(&config, &slots, no_alerts, abort).await
        }
        Command::Cancel {
            region,
            rent_no,
            amount,
        } => commands::cancel::run(&config, region, &rent_no, amount, abort).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config),
        },
    };

    watcher.abort();
    result
}

/// Trips `abort` on Ctrl+C or when `deadline` passes.
fn spawn_abort_watcher(abort: AbortHandle, deadline: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("Interrupted; stopping"),
            _ = expired => warn!("Timed out; stopping"),
        }
        abort.abort();
    })
}
