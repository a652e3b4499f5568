// SPDX-License-Identifier: MIT

//! Discovery of `scrapy.cfg` inside an unpacked project archive and the
//! minimal `[deploy]/project` key scan described in spec.md §4.C.

use crate::error::{RegistryError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds the single `scrapy.cfg` under `root`, failing "No project found" if
/// zero or more than one candidate matches `**/scrapy.cfg`.
pub fn find_scrapy_cfg(root: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "scrapy.cfg")
        .map(|e| e.path().to_path_buf())
        .collect();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        _ => Err(RegistryError::value("No project found")),
    }
}

/// Reads the mandatory `[deploy]` section's `project` key out of a
/// `scrapy.cfg`-style ini file: a single mandatory `[deploy]` section with
/// `key = value` / `key: value` lines, matching the original's
/// `configparser`-readable deploy config convention.
pub fn read_deploy_project_name(cfg_path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(cfg_path)?;
    let mut in_deploy = false;
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            in_deploy = section.eq_ignore_ascii_case("deploy");
            continue;
        }
        if !in_deploy {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .or_else(|| line.split_once(':'))
            .unwrap_or((line, ""));
        if key.trim().eq_ignore_ascii_case("project") {
            let name = value.trim();
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
    }
    Err(RegistryError::value("Can't extract project name"))
}

#[cfg(test)]
#[path = "scrapy_cfg_tests.rs"]
mod tests;
