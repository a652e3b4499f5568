// SPDX-License-Identifier: MIT

//! `scrapy-dod`: the scrapy-do control-plane daemon binary.
//!
//! Usage: `scrapy-dod [config-file.toml]`. With no argument, runs with
//! [`sdo_core::Config::default`]. Parsing a richer CLI surface (flags,
//! `--help`, subcommands) is the transport layer's concern per spec.md §1;
//! this binary stops at turning one optional config path into a validated
//! `Config` and driving the orchestrator to completion.

use sdo_core::{Config, SystemClock};
use sdo_daemon::{config as daemon_config, lock::DaemonLock, logging};
use sdo_orchestrator::Orchestrator;
use std::sync::Arc;
use tracing::{error, info};

const CRAWLER_RUNNER: &str = "scrapy";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scrapy-dod: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), sdo_daemon::LifecycleError> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config: Config = daemon_config::load(config_path.as_deref())?;

    // Logging needs the log directory, which needs the project store to
    // exist; create it before anything else touches the filesystem.
    std::fs::create_dir_all(&config.project_store)?;
    let _log_guard = logging::init(&config.log_dir())?;

    info!(
        project_store = %config.project_store.display(),
        job_slots = config.job_slots,
        completed_cap = config.completed_cap,
        "starting scrapy-do daemon"
    );

    let _lock = DaemonLock::acquire(&config.project_store)?;

    let clock = Arc::new(SystemClock);
    let orchestrator = Arc::new(
        Orchestrator::bootstrap(config, clock, CRAWLER_RUNNER)
            .map_err(sdo_daemon::LifecycleError::Config)?,
    );

    let loop_handle = Arc::clone(&orchestrator).run_forever();

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining running jobs");

    loop_handle.abort();
    orchestrator.shutdown().await;

    info!("scrapy-do daemon stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    match sigterm {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler, falling back to Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
