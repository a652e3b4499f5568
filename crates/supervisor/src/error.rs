// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("environment error: {0}")]
    Environment(String),

    #[error("signal error: {0}")]
    Signal(#[from] nix::errno::Errno),
}

impl SupervisorError {
    pub fn environment(msg: impl Into<String>) -> Self {
        SupervisorError::Environment(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

impl From<SupervisorError> for sdo_core::Error {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::Io(e) => sdo_core::Error::IoError(e.to_string()),
            SupervisorError::Environment(msg) => sdo_core::Error::Environment(msg),
            SupervisorError::Signal(e) => sdo_core::Error::IoError(e.to_string()),
        }
    }
}
