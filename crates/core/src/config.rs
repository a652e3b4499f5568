// SPDX-License-Identifier: MIT

//! Daemon configuration: the three options the orchestrator needs.
//!
//! Parsing an actual config *file* is the CLI/daemon binary's concern (see
//! the crate-level docs); this type only validates the resulting values so
//! the orchestrator can be constructed directly from them in tests.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default job-slots, matching the original daemon's packaged `default.conf`.
pub const DEFAULT_JOB_SLOTS: u32 = 5;
/// Default completed-cap, matching the original daemon's packaged `default.conf`.
pub const DEFAULT_COMPLETED_CAP: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for archives, logs, spider-data, and metadata.
    pub project_store: PathBuf,
    /// Maximum number of concurrently running jobs.
    pub job_slots: u32,
    /// Number of newest completed jobs kept; older ones are purged.
    pub completed_cap: u32,
}

impl Config {
    pub fn new(project_store: impl Into<PathBuf>, job_slots: u32, completed_cap: u32) -> Result<Self> {
        let config = Self {
            project_store: project_store.into(),
            job_slots,
            completed_cap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.job_slots < 1 {
            return Err(Error::value("job-slots must be >= 1"));
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.project_store.join("log-dir")
    }

    pub fn spider_data_dir(&self) -> PathBuf {
        self.project_store.join("spider-data")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.project_store.join("metadata.json")
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.project_store.join("schedule.db")
    }

    pub fn project_archive_path(&self, name: &str) -> PathBuf {
        self.project_store.join(format!("{name}.zip"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_store: PathBuf::from("./project-store"),
            job_slots: DEFAULT_JOB_SLOTS,
            completed_cap: DEFAULT_COMPLETED_CAP,
        }
    }
}
