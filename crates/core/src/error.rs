// SPDX-License-Identifier: MIT

//! Crate-wide error type.
//!
//! Mirrors the abstract error kinds named in the daemon's error-handling
//! design: user-facing operations fail fast with one of these, while the
//! orchestrator's periodic loops log and continue instead of propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad archive, unknown project/spider, bad recurrence spec.
    #[error("{0}")]
    ValueError(String),

    /// A job identifier (or other keyed lookup) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation is not legal in the target's current state (e.g. cancel
    /// on a job that already reached a terminal status).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Filesystem or subprocess I/O failure.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A required external executable or resource is missing.
    #[error("environment error: {0}")]
    Environment(String),
}

impl Error {
    pub fn value(msg: impl Into<String>) -> Self {
        Error::ValueError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    pub fn io(msg: impl std::fmt::Display) -> Self {
        Error::IoError(msg.to_string())
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Error::Environment(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
