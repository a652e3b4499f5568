// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    ValueError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("metadata serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("environment error: {0}")]
    Environment(String),
}

impl RegistryError {
    pub fn value(msg: impl Into<String>) -> Self {
        RegistryError::ValueError(msg.into())
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        RegistryError::Environment(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<RegistryError> for sdo_core::Error {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ValueError(msg) => sdo_core::Error::ValueError(msg),
            RegistryError::Io(e) => sdo_core::Error::IoError(e.to_string()),
            RegistryError::Zip(e) => sdo_core::Error::ValueError(e.to_string()),
            RegistryError::Serde(e) => sdo_core::Error::IoError(e.to_string()),
            RegistryError::Environment(msg) => sdo_core::Error::Environment(msg),
        }
    }
}
