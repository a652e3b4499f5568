// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdo-registry: the in-memory project registry (§4.C), backed by a single
//! serialized side-file rewritten atomically on every push/remove.

pub mod archive;
pub mod error;
pub mod probe;
pub mod scrapy_cfg;

pub use error::RegistryError;

use error::Result;
use parking_lot::RwLock;
use sdo_core::{Config, Project};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataFile {
    projects: Vec<Project>,
}

/// In-memory project-name -> {archive path, spider list} index, mirrored to
/// a JSON side-file under the configured project store.
pub struct Registry {
    store_root: PathBuf,
    metadata_path: PathBuf,
    projects: RwLock<HashMap<String, Project>>,
}

impl Registry {
    /// Creates the project store, log, and spider-data directories if
    /// missing (idempotent), then loads the registry's side-file if present.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.project_store)?;
        std::fs::create_dir_all(config.log_dir())?;
        std::fs::create_dir_all(config.spider_data_dir())?;

        let metadata_path = config.metadata_path();
        let projects = if metadata_path.exists() {
            let raw = std::fs::read_to_string(&metadata_path)?;
            let parsed: MetadataFile = serde_json::from_str(&raw)?;
            parsed.projects.into_iter().map(|p| (p.name.clone(), p)).collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            store_root: config.project_store.clone(),
            metadata_path,
            projects: RwLock::new(projects),
        })
    }

    pub fn get_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.projects.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<Project> {
        self.projects.read().get(name).cloned()
    }

    pub fn get_spiders(&self, name: &str) -> Result<Vec<String>> {
        self.get(name)
            .map(|p| p.spiders)
            .ok_or_else(|| RegistryError::value(format!("unknown project '{name}'")))
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.read().contains_key(name)
    }

    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.store_root.join(format!("{name}.zip"))
    }

    /// Pushes a new archive, per spec.md §4.C. `runner` is the external
    /// crawler executable used to enumerate spiders; `dropped_spider_is_scheduled`
    /// is called once per spider this push would remove from an existing
    /// project, and must return whether that spider still has a live
    /// SCHEDULED job (the orchestrator answers this from the schedule
    /// store, keeping this crate free of a dependency on `sdo-store`).
    pub async fn push(
        &self,
        bytes: &[u8],
        runner: &str,
        dropped_spider_is_scheduled: impl Fn(&str, &str) -> bool,
    ) -> Result<Project> {
        let tmp = tempfile::tempdir()?;
        archive::unzip_into(bytes, tmp.path())?;

        let cfg_path = scrapy_cfg::find_scrapy_cfg(tmp.path())?;
        let name = scrapy_cfg::read_deploy_project_name(&cfg_path)?;

        let project_dir = tmp.path().join(&name);
        if !project_dir.is_dir() {
            return Err(RegistryError::value(format!(
                "extracted directory '{name}' not found in archive"
            )));
        }

        let spiders = probe::list_spiders(runner, &project_dir).await?;

        if let Some(previous) = self.get(&name) {
            for dropped in previous.spiders.iter().filter(|s| !spiders.contains(s)) {
                if dropped_spider_is_scheduled(&name, dropped) {
                    return Err(RegistryError::value(format!(
                        "Spider {dropped} is going to be removed but has scheduled jobs"
                    )));
                }
            }
        }

        let dest_archive = self.archive_path(&name);
        write_archive_file(&dest_archive, bytes)?;

        let project = Project::new(&name, dest_archive, spiders);
        self.projects.write().insert(name.clone(), project.clone());
        self.save()?;

        info!(project = %name, spiders = project.spiders.len(), "project pushed");
        Ok(project)
    }

    /// Removes a project, per spec.md §4.C. `has_scheduled` must report
    /// whether any SCHEDULED job still references `name`.
    pub fn remove(&self, name: &str, has_scheduled: impl FnOnce() -> bool) -> Result<()> {
        if !self.has_project(name) {
            return Err(RegistryError::value(format!("unknown project '{name}'")));
        }
        if has_scheduled() {
            return Err(RegistryError::value(format!(
                "project '{name}' still has scheduled jobs"
            )));
        }

        let archive = self.archive_path(name);
        if archive.exists() {
            std::fs::remove_file(&archive)?;
        }
        self.projects.write().remove(name);
        self.save()?;

        info!(project = %name, "project removed");
        Ok(())
    }

    /// Rewrites the metadata side-file via write-temp + rename, so a crash
    /// mid-write never leaves a torn file behind (spec.md §9).
    fn save(&self) -> Result<()> {
        let snapshot = MetadataFile {
            projects: self.projects.read().values().cloned().collect(),
        };
        let serialized = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.metadata_path, &serialized)
    }
}

fn write_archive_file(dest: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(dest, bytes)
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| RegistryError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
