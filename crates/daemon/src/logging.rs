// SPDX-License-Identifier: MIT

//! `tracing` setup: an `RUST_LOG`-driven `fmt` layer to stderr plus a
//! rolling daily log file under `<project-store>/log-dir/daemon.log`.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber. The returned [`WorkerGuard`] must be
/// held for the process's lifetime — dropping it flushes and stops the
/// background writer thread.
pub fn init(log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(non_blocking))
        .init();

    Ok(guard)
}
