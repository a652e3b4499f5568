// SPDX-License-Identifier: MIT

//! Project registry record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A pushed crawler project: its archive on disk and the spider names
/// discovered inside it at push time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub archive: PathBuf,
    pub spiders: Vec<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, archive: PathBuf, spiders: Vec<String>) -> Self {
        Self {
            name: name.into(),
            archive,
            spiders,
        }
    }

    pub fn has_spider(&self, spider: &str) -> bool {
        self.spiders.iter().any(|s| s == spider)
    }
}
