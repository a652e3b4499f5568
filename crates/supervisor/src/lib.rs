// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdo-supervisor: §4.F Process Supervisor. Spawns a child with its stdout
//! and stderr redirected to `<log-dir>/<job-id>.{out,err}`, and exposes only
//! a `signal(TERM)` and a completion future — it knows nothing about
//! schedule state.

pub mod error;

pub use error::SupervisorError;

use error::Result;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{info, warn};

/// The outcome of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Raw exit code. `-1` if the process was killed by a signal rather
    /// than exiting normally (no escalation beyond SIGTERM is ever sent,
    /// so in practice this means the child handled SIGTERM by exiting, or
    /// died some other way outside our control).
    pub code: i32,
}

impl ExitOutcome {
    pub fn is_success(self) -> bool {
        self.code == 0
    }
}

/// A handle to a spawned child: cancellation and the completion signal.
/// Cloning shares the same underlying process — safe for multiple call
/// sites (cancel-in-progress and the run-one completion callback) to await
/// concurrently without racing on `.wait()`.
#[derive(Clone)]
pub struct SpawnedProcess {
    pid: Pid,
    outcome_rx: watch::Receiver<Option<ExitOutcome>>,
}

impl SpawnedProcess {
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// Sends SIGTERM. No kill escalation: per spec.md §5, cancellation and
    /// shutdown both wait indefinitely for the child to exit afterwards.
    pub fn signal_term(&self) -> Result<()> {
        signal::kill(self.pid, Signal::SIGTERM)?;
        Ok(())
    }

    /// Resolves once the child has exited. Safe to call from multiple
    /// tasks; every caller observes the same resolved outcome.
    pub async fn wait(&self) -> ExitOutcome {
        let mut rx = self.outcome_rx.clone();
        loop {
            if let Some(outcome) = *rx.borrow() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return ExitOutcome { code: -1 };
            }
        }
    }
}

fn log_paths(log_dir: &Path, job_id: &str) -> (PathBuf, PathBuf) {
    (log_dir.join(format!("{job_id}.out")), log_dir.join(format!("{job_id}.err")))
}

/// Spawns `cmd args...` in `cwd` with `env` applied, redirecting stdout/stderr
/// to `<log_dir>/<job_id>.out` and `.err` (write-truncate). On child exit,
/// both files are closed and any that end up zero-bytes are deleted.
pub async fn spawn(
    cmd: &str,
    args: &[String],
    job_id: &str,
    log_dir: &Path,
    env: &[(String, String)],
    cwd: &Path,
) -> Result<SpawnedProcess> {
    let (out_path, err_path) = log_paths(log_dir, job_id);
    let out_file = std::fs::File::create(&out_path)?;
    let err_file = std::fs::File::create(&err_path)?;

    let mut command = Command::new(cmd);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out_file))
        .stderr(Stdio::from(err_file));
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SupervisorError::environment(format!("executable '{cmd}' not found: {e}"))
        } else {
            SupervisorError::Io(e)
        }
    })?;

    let pid = child
        .id()
        .ok_or_else(|| SupervisorError::environment("child exited before pid was observable"))?;

    info!(job_id, cmd, pid, "spawned crawler process");

    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        let status = child.wait().await;
        for path in [&out_path, &err_path] {
            match std::fs::metadata(path) {
                Ok(meta) if meta.len() == 0 => {
                    let _ = std::fs::remove_file(path);
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not stat job log file"),
            }
        }
        let code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!(job_id, error = %e, "failed to wait on child process");
                -1
            }
        };
        let _ = tx.send(Some(ExitOutcome { code }));
    });

    Ok(SpawnedProcess { pid: Pid::from_raw(pid as i32), outcome_rx: rx })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
