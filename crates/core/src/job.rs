// SPDX-License-Identifier: MIT

//! Job identifier and lifecycle state.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a scheduled or running job.
    pub struct JobId("job_");
}

/// Lifecycle status of a [`Job`]. Numeric values match the schedule store's
/// on-disk encoding and the original scrapy-do schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum JobStatus {
    Scheduled = 1,
    Pending = 2,
    Running = 3,
    Canceled = 4,
    Successful = 5,
    Failed = 6,
}

impl JobStatus {
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            1 => JobStatus::Scheduled,
            2 => JobStatus::Pending,
            3 => JobStatus::Running,
            4 => JobStatus::Canceled,
            5 => JobStatus::Successful,
            6 => JobStatus::Failed,
            _ => return None,
        })
    }

    /// Only the four terminal statuses are eligible for retention purge.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Canceled | JobStatus::Successful | JobStatus::Failed
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

crate::simple_display! {
    JobStatus {
        Scheduled => "scheduled",
        Pending => "pending",
        Running => "running",
        Canceled => "canceled",
        Successful => "successful",
        Failed => "failed",
    }
}

/// Who created a given job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Actor {
    Scheduler = 1,
    User = 2,
}

crate::simple_display! {
    Actor {
        Scheduler => "scheduler",
        User => "user",
    }
}

/// Schedule string used for jobs created outside the recurrence DSL.
pub const SCHEDULE_NOW: &str = "now";

/// A single scheduled or executed run of one spider of one project.
///
/// `schedule`, `project`, and `spider` are immutable after creation; `status`
/// and `duration` are the only mutation points, and every mutation bumps
/// `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub actor: Actor,
    pub schedule: String,
    pub project: String,
    pub spider: String,
    /// Creation time, bumped to now() on every status/duration change.
    pub timestamp: String,
    /// Wall time in whole seconds, populated only on terminal transitions.
    pub duration: Option<i64>,
}

impl Job {
    pub fn new(
        status: JobStatus,
        actor: Actor,
        schedule: impl Into<String>,
        project: impl Into<String>,
        spider: impl Into<String>,
        now: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            status,
            actor,
            schedule: schedule.into(),
            project: project.into(),
            spider: spider.into(),
            timestamp: now.into(),
            duration: None,
        }
    }

    /// A job with status SCHEDULED has a non-"now" schedule string and a
    /// live trigger in the recurrence scheduler.
    pub fn has_live_trigger(&self) -> bool {
        self.status == JobStatus::Scheduled && self.schedule != SCHEDULE_NOW
    }

    pub fn set_status(&mut self, status: JobStatus, now: impl Into<String>) {
        self.status = status;
        self.timestamp = now.into();
    }

    pub fn finish(&mut self, status: JobStatus, duration_secs: i64, now: impl Into<String>) {
        debug_assert!(status.is_terminal(), "finish() requires a terminal status");
        self.status = status;
        self.duration = Some(duration_secs);
        self.timestamp = now.into();
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    status: JobStatus,
    actor: Actor,
    schedule: String,
    project: String,
    spider: String,
    timestamp: String,
    duration: Option<i64>,
    id: Option<JobId>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for JobBuilder {
    fn default() -> Self {
        Self {
            status: JobStatus::Pending,
            actor: Actor::User,
            schedule: SCHEDULE_NOW.to_string(),
            project: "quotesbot".to_string(),
            spider: "toscrape-css".to_string(),
            timestamp: "1970-01-01T00:00:00+00:00".to_string(),
            duration: None,
            id: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    crate::setters! {
        set {
            status: JobStatus,
            actor: Actor,
            duration: Option<i64>,
        }
        into {
            schedule: String,
            project: String,
            spider: String,
            timestamp: String,
        }
    }

    pub fn id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn build(self) -> Job {
        Job {
            id: self.id.unwrap_or_else(JobId::new),
            status: self.status,
            actor: self.actor,
            schedule: self.schedule,
            project: self.project,
            spider: self.spider,
            timestamp: self.timestamp,
            duration: self.duration,
        }
    }
}

impl Job {
    #[cfg(any(test, feature = "test-support"))]
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
