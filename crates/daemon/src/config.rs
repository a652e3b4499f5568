// SPDX-License-Identifier: MIT

//! Loads the `[scrapy-do]` section of a TOML config file into a validated
//! [`sdo_core::Config`]. Parsing the file format itself is this crate's
//! concern (spec.md §1 scopes the CLI's flag/file handling out of the core,
//! but something still has to turn bytes on disk into a `Config`); the
//! three keys mirror spec.md §6 exactly.

use crate::error::LifecycleError;
use serde::Deserialize;
use sdo_core::Config;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(rename = "scrapy-do")]
    scrapy_do: ScrapyDoSection,
}

#[derive(Debug, Deserialize)]
struct ScrapyDoSection {
    #[serde(rename = "project-store")]
    project_store: String,
    #[serde(rename = "job-slots", default = "default_job_slots")]
    job_slots: u32,
    #[serde(rename = "completed-cap", default = "default_completed_cap")]
    completed_cap: u32,
}

fn default_job_slots() -> u32 {
    sdo_core::config::DEFAULT_JOB_SLOTS
}

fn default_completed_cap() -> u32 {
    sdo_core::config::DEFAULT_COMPLETED_CAP
}

/// Reads `path` as a TOML file with a `[scrapy-do]` section and validates
/// the result. When `path` is `None`, returns [`Config::default`] untouched.
pub fn load(path: Option<&Path>) -> Result<Config, LifecycleError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| LifecycleError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: FileConfig = toml::from_str(&raw).map_err(|source| LifecycleError::ConfigParse {
        path: path.display().to_string(),
        source,
    })?;

    let config = Config::new(
        parsed.scrapy_do.project_store,
        parsed.scrapy_do.job_slots,
        parsed.scrapy_do.completed_cap,
    )?;
    Ok(config)
}
