// SPDX-License-Identifier: MIT

//! Spider-list probe: runs the external crawler runtime's `list` subcommand
//! inside an unpacked project directory and parses its stdout as one spider
//! name per line.
//!
//! spec.md §1 treats this probe as a simple I/O caller, not part of the
//! control-plane core; this is the thin real implementation needed for the
//! daemon to actually run, grounded in the same `tokio::process::Command`
//! idiom `sdo-supervisor` uses for the crawler process itself.

use crate::error::{RegistryError, Result};
use std::path::Path;
use tokio::process::Command;

/// Enumerates the spider names a project exposes by invoking
/// `<runner> list` in `project_dir` and reading one name per non-blank
/// stdout line.
pub async fn list_spiders(runner: &str, project_dir: &Path) -> Result<Vec<String>> {
    let output = Command::new(runner)
        .arg("list")
        .current_dir(project_dir)
        .output()
        .await
        .map_err(|e| RegistryError::environment(format!("failed to run '{runner} list': {e}")))?;

    if !output.status.success() {
        return Err(RegistryError::value(format!(
            "'{runner} list' exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let spiders = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(spiders)
}
