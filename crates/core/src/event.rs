// SPDX-License-Identifier: MIT

//! Event types fanned out by the orchestrator on every state mutation.

use crate::job::{Job, JobId};
use crate::project::Project;
use serde::{Deserialize, Serialize};

/// Events broadcast to subscribers. Serializes as `{"kind": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    /// Emitted periodically; payload-free, subscribers pull current metrics.
    #[serde(rename = "daemon_status_change")]
    DaemonStatusChange,

    #[serde(rename = "project_push")]
    ProjectPush { project: Project },

    #[serde(rename = "project_remove")]
    ProjectRemove { name: String },

    #[serde(rename = "job_update")]
    JobUpdate { job: Job },

    #[serde(rename = "job_remove")]
    JobRemove { id: JobId },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DaemonStatusChange => "daemon_status_change",
            Event::ProjectPush { .. } => "project_push",
            Event::ProjectRemove { .. } => "project_remove",
            Event::JobUpdate { .. } => "job_update",
            Event::JobRemove { .. } => "job_remove",
        }
    }

    /// One-line human-readable summary, for `tracing` output.
    pub fn log_summary(&self) -> String {
        match self {
            Event::DaemonStatusChange => "daemon status sampled".to_string(),
            Event::ProjectPush { project } => {
                format!("project pushed: {} ({} spiders)", project.name, project.spiders.len())
            }
            Event::ProjectRemove { name } => format!("project removed: {name}"),
            Event::JobUpdate { job } => {
                format!("job {} -> {}", job.id, job.status)
            }
            Event::JobRemove { id } => format!("job removed: {id}"),
        }
    }
}
