// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("{0}")]
    ValueError(String),
}

impl SchedulerError {
    pub fn value(msg: impl Into<String>) -> Self {
        SchedulerError::ValueError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

impl From<SchedulerError> for sdo_core::Error {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::ValueError(msg) => sdo_core::Error::ValueError(msg),
        }
    }
}
