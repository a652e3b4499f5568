// SPDX-License-Identifier: MIT

//! §4.G Control API: the operation surface an (out-of-scope) transport layer
//! calls. A thin, cloneable handle over a shared [`Orchestrator`].

use crate::Orchestrator;
use sdo_core::{Actor, Job, JobId, JobStatus, Project, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct ControlApi {
    orchestrator: Arc<Orchestrator>,
}

impl ControlApi {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn push_project(&self, bytes: &[u8]) -> Result<Project> {
        self.orchestrator.push_project(bytes).await
    }

    pub fn remove_project(&self, name: &str) -> Result<()> {
        self.orchestrator.remove_project(name)
    }

    pub fn get_projects(&self) -> Vec<String> {
        self.orchestrator.get_projects()
    }

    pub fn get_spiders(&self, project: &str) -> Result<Vec<String>> {
        self.orchestrator.get_spiders(project)
    }

    /// `when = "now"` (the default) schedules a PENDING job directly; any
    /// other string is parsed as a recurrence DSL expression.
    pub fn schedule_job(&self, project: &str, spider: &str, when: &str, actor: Actor) -> Result<JobId> {
        self.orchestrator.schedule_job(project, spider, when, actor)
    }

    pub async fn cancel_job(&self, id: JobId) -> Result<()> {
        self.orchestrator.cancel_job(id).await
    }

    pub fn get_job(&self, id: JobId) -> Result<Job> {
        self.orchestrator.get_job(id)
    }

    pub fn get_jobs(&self, status: JobStatus) -> Result<Vec<Job>> {
        self.orchestrator.get_jobs(status)
    }

    pub fn get_active_jobs(&self) -> Result<Vec<Job>> {
        self.orchestrator.get_active_jobs()
    }

    pub fn get_completed_jobs(&self) -> Result<Vec<Job>> {
        self.orchestrator.get_completed_jobs()
    }

    pub fn get_job_logs(&self, id: JobId) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        self.orchestrator.get_job_logs(id)
    }
}
