// SPDX-License-Identifier: MIT

//! Errors specific to the process entry point: everything that can go wrong
//! before there is an [`sdo_orchestrator::Orchestrator`] to report through
//! `sdo_core::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead { path: String, source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse { path: String, source: toml::de::Error },

    #[error(transparent)]
    Config(#[from] sdo_core::Error),

    #[error("another scrapy-do daemon already holds the lock at {0}")]
    LockHeld(std::path::PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
