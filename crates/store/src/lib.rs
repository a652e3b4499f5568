// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdo-store: the embedded relational schedule store.
//!
//! Two tables, `schedule` and `schedule_metadata`, backed by `rusqlite`.
//! Schema version is tracked in `schedule_metadata` and migrated forward
//! on open, with a timestamped backup copied before any migration runs.

pub mod error;
pub mod migration;

pub use error::{MigrationError, StoreError};
pub use migration::CURRENT_SCHEMA_VERSION;

use error::Result;
use migration::MigrationRegistry;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sdo_core::{Actor, Job, JobId, JobStatus};
use std::path::{Path, PathBuf};
use tracing::info;

fn job_from_row(row: &Row) -> rusqlite::Result<Job> {
    let id: String = row.get(0)?;
    let status: i32 = row.get(1)?;
    let actor: i32 = row.get(2)?;
    let schedule: Option<String> = row.get(3)?;
    let project: String = row.get(4)?;
    let spider: String = row.get(5)?;
    let timestamp: String = row.get(6)?;
    let duration: Option<i64> = row.get(7)?;

    Ok(Job {
        id: JobId::from_string(id),
        status: JobStatus::from_i32(status).unwrap_or(JobStatus::Failed),
        actor: if actor == Actor::Scheduler as i32 {
            Actor::Scheduler
        } else {
            Actor::User
        },
        schedule: schedule.unwrap_or_default(),
        project,
        spider,
        timestamp,
        duration,
    })
}

/// The persistent job schedule. Single-writer; safe to share read-only
/// across threads behind an `Arc`, but all mutating calls are expected to
/// come from the orchestrator's single control thread.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if absent) the schedule store at `path`, applying
    /// any pending migrations. A timestamped backup of the file is written
    /// before migrating an existing, older database.
    pub fn open(path: impl AsRef<Path>, now_rfc3339_compact: impl Fn() -> String) -> Result<Self> {
        let path = path.as_ref();
        let existed = path.exists();
        let conn = Connection::open(path)?;
        Self::init(conn, existed, path, now_rfc3339_compact)
    }

    /// Opens an in-memory store, skipping backup/migration concerns.
    /// Used by tests that don't need on-disk persistence.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Store { conn };
        store.create_tables()?;
        store.set_metadata("version", &CURRENT_SCHEMA_VERSION.to_string())?;
        Ok(store)
    }

    fn init(
        conn: Connection,
        existed: bool,
        path: &Path,
        stamp: impl Fn() -> String,
    ) -> Result<Self> {
        let mut store = Store { conn };
        store.create_tables()?;

        if !existed {
            store.set_metadata("version", &CURRENT_SCHEMA_VERSION.to_string())?;
            return Ok(store);
        }

        let version: i64 = store
            .get_metadata("version")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        if version < CURRENT_SCHEMA_VERSION {
            let backup_path = backup_path_for(path, &stamp());
            std::fs::copy(path, &backup_path)?;
            info!(from = version, to = CURRENT_SCHEMA_VERSION, backup = %backup_path.display(), "migrating schedule store");
            let registry = MigrationRegistry::new();
            let reached = registry.migrate(&store.conn, version)?;
            store.set_metadata("version", &reached.to_string())?;
        }

        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schedule (
                identifier TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                actor INTEGER NOT NULL,
                schedule TEXT,
                project TEXT NOT NULL,
                spider TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                duration INTEGER
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schedule_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM schedule_metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schedule_metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Inserts a new job. Fails with [`StoreError::Duplicate`] if the
    /// identifier already exists.
    pub fn add(&self, job: &Job) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO schedule
                (identifier, status, actor, schedule, project, spider, timestamp, duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id.as_str(),
                job.status as i32,
                job.actor as i32,
                job.schedule,
                job.project,
                job.spider,
                job.timestamp,
                job.duration,
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::Duplicate(job.id.as_str().to_string()));
        }
        Ok(())
    }

    /// Upserts a job, for in-place status/duration mutation.
    pub fn commit(&self, job: &Job) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schedule
                (identifier, status, actor, schedule, project, spider, timestamp, duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(identifier) DO UPDATE SET
                status = excluded.status,
                actor = excluded.actor,
                schedule = excluded.schedule,
                project = excluded.project,
                spider = excluded.spider,
                timestamp = excluded.timestamp,
                duration = excluded.duration",
            params![
                job.id.as_str(),
                job.status as i32,
                job.actor as i32,
                job.schedule,
                job.project,
                job.spider,
                job.timestamp,
                job.duration,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &JobId) -> Result<Job> {
        self.conn
            .query_row(
                "SELECT identifier, status, actor, schedule, project, spider, timestamp, duration
                 FROM schedule WHERE identifier = ?1",
                params![id.as_str()],
                job_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.as_str().to_string()))
    }

    pub fn by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, status, actor, schedule, project, spider, timestamp, duration
             FROM schedule WHERE status = ?1 ORDER BY timestamp DESC, identifier DESC",
        )?;
        let rows = stmt
            .query_map(params![status as i32], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// SCHEDULED ∪ PENDING ∪ RUNNING, newest-first.
    pub fn active(&self) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, status, actor, schedule, project, spider, timestamp, duration
             FROM schedule WHERE status IN (1, 2, 3)
             ORDER BY timestamp DESC, identifier DESC",
        )?;
        let rows = stmt
            .query_map([], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// CANCELED ∪ SUCCESSFUL ∪ FAILED, newest-first.
    pub fn completed(&self) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, status, actor, schedule, project, spider, timestamp, duration
             FROM schedule WHERE status IN (4, 5, 6)
             ORDER BY timestamp DESC, identifier DESC",
        )?;
        let rows = stmt
            .query_map([], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// SCHEDULED jobs for `project`; used to guard project removal/re-push.
    pub fn scheduled_for(&self, project: &str) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, status, actor, schedule, project, spider, timestamp, duration
             FROM schedule WHERE status = 1 AND project = ?1
             ORDER BY timestamp DESC, identifier DESC",
        )?;
        let rows = stmt
            .query_map(params![project], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn remove(&self, id: &JobId) -> Result<()> {
        self.conn
            .execute("DELETE FROM schedule WHERE identifier = ?1", params![id.as_str()])?;
        Ok(())
    }
}

fn backup_path_for(path: &Path, stamp: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".bak.{stamp}"));
    PathBuf::from(os)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
