// SPDX-License-Identifier: MIT

//! Schema migrations applied on store open.
//!
//! Mirrors the snapshot-migration pattern used elsewhere in the workspace,
//! adapted to operate on a live `rusqlite::Connection` rather than a JSON
//! snapshot.

use crate::error::MigrationError;
use rusqlite::Connection;

/// Current on-disk schema version. Bump this and register a migration
/// whenever the table layout changes.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

pub trait Migration: Send + Sync {
    fn source_version(&self) -> i64;
    fn target_version(&self) -> i64;
    fn migrate(&self, conn: &Connection) -> Result<(), MigrationError>;
}

/// v1 -> v2 is a no-op: schema didn't change shape, only the recorded
/// version did. Kept as an explicit migration so the registry's chain
/// logic stays exercised.
struct V1ToV2;

impl Migration for V1ToV2 {
    fn source_version(&self) -> i64 {
        1
    }
    fn target_version(&self) -> i64 {
        2
    }
    fn migrate(&self, _conn: &Connection) -> Result<(), MigrationError> {
        Ok(())
    }
}

pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self {
            migrations: vec![Box::new(V1ToV2)],
        }
    }

    /// Applies registered migrations in order until `conn`'s schema reaches
    /// `CURRENT_SCHEMA_VERSION`, starting from `from_version`. Returns the
    /// final version reached.
    pub fn migrate(&self, conn: &Connection, from_version: i64) -> Result<i64, MigrationError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(MigrationError::TooNew(from_version, CURRENT_SCHEMA_VERSION));
        }

        let mut version = from_version;
        while version < CURRENT_SCHEMA_VERSION {
            let next = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, CURRENT_SCHEMA_VERSION))?;
            next.migrate(conn)?;
            version = next.target_version();
        }
        Ok(version)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
