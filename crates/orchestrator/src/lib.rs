// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdo-orchestrator: §4.D Orchestrator loops, §4.E Event Bus, §4.G Control
//! API. This crate is the boundary: every public fallible operation returns
//! `sdo_core::Result<T>`, converting from each collaborator crate's
//! crate-local error via its `From` impl.

pub mod control_api;
pub mod event_bus;

pub use control_api::ControlApi;
pub use event_bus::EventBus;

use parking_lot::Mutex;
use sdo_core::{Actor, Clock, Config, Error, Event, Job, JobId, JobStatus, Result, SCHEDULE_NOW};
use sdo_registry::Registry;
use sdo_scheduler::{Scheduler, TriggerId};
use sdo_store::Store;
use sdo_supervisor::SpawnedProcess;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// `running_jobs[id]`: a placeholder while the child is still spawning, or
/// the full record once `spawn()` has returned. See spec.md §4.D step 2.
enum RunningSlot {
    Starting,
    Started(RunningJob),
}

struct RunningJob {
    process: SpawnedProcess,
    canceled: Arc<AtomicBool>,
}

/// The control-plane core: the schedule store, the project registry, the
/// recurrence scheduler, the process supervisor, and the two in-memory maps
/// spec.md §4.D names. All mutation is expected to come from a single
/// logical line of execution (the four tick loops); see §5.
pub struct Orchestrator {
    config: Config,
    clock: Arc<dyn Clock>,
    runner: String,
    store: Mutex<Store>,
    registry: Registry,
    scheduler: Scheduler,
    events: EventBus,
    running_jobs: Mutex<HashMap<JobId, RunningSlot>>,
    scheduled_triggers: Mutex<HashMap<JobId, TriggerId>>,
    trigger_targets: Mutex<HashMap<TriggerId, (String, String)>>,
    status_state: Mutex<StatusState>,
}

struct StatusState {
    last_emit: Instant,
    last_rss_mb: u64,
}

impl Orchestrator {
    /// Runs the startup sequence (spec.md §4.D): creates directories, loads
    /// the registry, opens the schedule store applying migrations, replays
    /// every SCHEDULED row into the recurrence scheduler, and demotes every
    /// RUNNING row to PENDING (crash recovery). Does not start the loops.
    pub fn bootstrap(config: Config, clock: Arc<dyn Clock>, runner: impl Into<String>) -> Result<Self> {
        let registry = Registry::bootstrap(&config)?;
        let clock_for_stamp = clock.clone();
        let store = Store::open(config.schedule_path(), move || clock_for_stamp.now_rfc3339())?;

        let scheduler = Scheduler::new(clock.clone());
        let mut scheduled_triggers = HashMap::new();
        let mut trigger_targets = HashMap::new();

        for job in store.by_status(JobStatus::Scheduled)? {
            match sdo_scheduler::parse(&job.schedule) {
                Ok(spec) => {
                    let trigger_id = scheduler.register(spec);
                    scheduled_triggers.insert(job.id, trigger_id);
                    trigger_targets.insert(trigger_id, (job.project.clone(), job.spider.clone()));
                }
                Err(e) => {
                    error!(job_id = %job.id, schedule = %job.schedule, error = %e, "dropping unparseable recurrence on restart");
                }
            }
        }

        for mut job in store.by_status(JobStatus::Running)? {
            job.set_status(JobStatus::Pending, clock.now_rfc3339());
            store.commit(&job)?;
            info!(job_id = %job.id, "demoted RUNNING job to PENDING on restart");
        }

        let last_emit = clock.now();
        Ok(Self {
            config,
            clock,
            runner: runner.into(),
            store: Mutex::new(store),
            registry,
            scheduler,
            events: EventBus::new(),
            running_jobs: Mutex::new(HashMap::new()),
            scheduled_triggers: Mutex::new(scheduled_triggers),
            trigger_targets: Mutex::new(trigger_targets),
            status_state: Mutex::new(StatusState { last_emit, last_rss_mb: 0 }),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn now_rfc3339(&self) -> String {
        self.clock.now_rfc3339()
    }

    // ---- §4.D tick-scheduler ----------------------------------------

    /// Asks the recurrence scheduler for due triggers and re-enters
    /// `schedule_job` for each, as `actor = Scheduler`.
    pub async fn tick_scheduler(&self) {
        let fired = self.scheduler.tick();
        for trigger_id in fired {
            let target = self.trigger_targets.lock().get(&trigger_id).cloned();
            let Some((project, spider)) = target else { continue };
            if let Err(e) = self.schedule_job(&project, &spider, SCHEDULE_NOW, Actor::Scheduler) {
                error!(project, spider, error = %e, "trigger fire failed to schedule a job");
            }
        }
    }

    // ---- §4.D tick-crawlers ------------------------------------------

    /// Drains PENDING jobs one at a time into the run-one sequence while
    /// slots remain available.
    pub async fn tick_crawlers(self: &Arc<Self>) {
        loop {
            if self.running_jobs.lock().len() >= self.config.job_slots as usize {
                break;
            }
            let next = {
                let store = self.store.lock();
                match store.by_status(JobStatus::Pending) {
                    Ok(mut rows) => rows.pop(), // oldest-first after the store's newest-first ordering
                    Err(e) => {
                        error!(error = %e, "failed to read PENDING jobs");
                        break;
                    }
                }
            };
            let Some(mut job) = next else { break };

            job.set_status(JobStatus::Running, self.now_rfc3339());
            if let Err(e) = self.store.lock().commit(&job) {
                error!(job_id = %job.id, error = %e, "failed to commit RUNNING transition");
                break;
            }
            self.events.publish(Event::JobUpdate { job: job.clone() });
            self.running_jobs.lock().insert(job.id, RunningSlot::Starting);

            self.start_job(job).await;
        }
    }

    /// Run-one sequence steps 3-5: unzip the project archive, spawn the
    /// crawler, and either install the full running-jobs record (success)
    /// or finish the job FAILED (spawn failure).
    async fn start_job(self: &Arc<Self>, job: Job) {
        match self.try_spawn(&job).await {
            Ok((process, temp_dir)) => {
                let canceled = Arc::new(AtomicBool::new(false));
                self.running_jobs.lock().insert(
                    job.id,
                    RunningSlot::Started(RunningJob { process: process.clone(), canceled: canceled.clone() }),
                );
                let start = self.clock.now();
                let me = Arc::clone(self);
                tokio::spawn(async move {
                    me.watch_job(job, process, start, canceled, temp_dir).await;
                });
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "crawler spawn failed");
                let mut job = job;
                job.finish(JobStatus::Failed, 0, self.now_rfc3339());
                if let Err(e) = self.store.lock().commit(&job) {
                    error!(job_id = %job.id, error = %e, "failed to commit FAILED after spawn failure");
                }
                self.running_jobs.lock().remove(&job.id);
                self.events.publish(Event::JobUpdate { job });
            }
        }
    }

    async fn try_spawn(&self, job: &Job) -> Result<(SpawnedProcess, tempfile::TempDir)> {
        let project = self
            .registry
            .get(&job.project)
            .ok_or_else(|| Error::value(format!("unknown project '{}'", job.project)))?;
        let bytes = std::fs::read(&project.archive)?;

        let temp_dir = tempfile::tempdir()?;
        sdo_registry::archive::unzip_into(&bytes, temp_dir.path())?;
        let project_dir = temp_dir.path().join(&project.name);

        let env = vec![(
            "SPIDER_DATA_DIR".to_string(),
            self.config.spider_data_dir().display().to_string(),
        )];
        let args = vec!["crawl".to_string(), job.spider.clone()];
        let process = sdo_supervisor::spawn(
            &self.runner,
            &args,
            job.id.as_str(),
            &self.config.log_dir(),
            &env,
            &project_dir,
        )
        .await?;

        Ok((process, temp_dir))
    }

    /// Awaits the completion-future, then finishes the run-one sequence
    /// (step 4): maps the exit code to a terminal status, records duration,
    /// commits, emits `JOB_UPDATE`, and removes the running-jobs entry. The
    /// temp dir is dropped (and thus deleted) regardless of outcome.
    async fn watch_job(
        self: Arc<Self>,
        job: Job,
        process: SpawnedProcess,
        start: Instant,
        canceled: Arc<AtomicBool>,
        temp_dir: tempfile::TempDir,
    ) {
        let outcome = process.wait().await;
        drop(temp_dir);

        let status = if canceled.load(Ordering::SeqCst) {
            JobStatus::Canceled
        } else if outcome.is_success() {
            JobStatus::Successful
        } else {
            JobStatus::Failed
        };
        let duration = self.clock.now().saturating_duration_since(start).as_secs() as i64;

        let finished = {
            let store = self.store.lock();
            store.get(&job.id).and_then(|mut row| {
                row.finish(status, duration, self.now_rfc3339());
                store.commit(&row)?;
                Ok(row)
            })
        };
        self.running_jobs.lock().remove(&job.id);
        match finished {
            Ok(row) => self.events.publish(Event::JobUpdate { job: row }),
            Err(e) => error!(job_id = %job.id, error = %e, "failed to commit job completion"),
        }
    }

    // ---- §4.D tick-purger ----------------------------------------------

    /// Removes completed jobs beyond the retention cap, newest-first kept,
    /// unlinking their log files and emitting `JOB_REMOVE` for each.
    pub async fn tick_purger(&self) {
        let completed = match self.store.lock().completed() {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "failed to read completed jobs");
                return;
            }
        };
        let cap = self.config.completed_cap as usize;
        if completed.len() <= cap {
            return;
        }
        for job in &completed[cap..] {
            if let Err(e) = self.store.lock().remove(&job.id) {
                error!(job_id = %job.id, error = %e, "failed to purge completed job");
                continue;
            }
            for ext in ["out", "err"] {
                let path = self.config.log_dir().join(format!("{}.{}", job.id.as_str(), ext));
                let _ = std::fs::remove_file(path);
            }
            self.events.publish(Event::JobRemove { id: job.id });
        }
    }

    // ---- §4.D tick-events ------------------------------------------------

    /// Samples resident memory; emits `DAEMON_STATUS_CHANGE` if more than
    /// 60 s have elapsed since the last emission or the sample moved by at
    /// least 1 MB.
    pub async fn tick_events(&self) {
        let rss_mb = current_rss_mb();
        let mut state = self.status_state.lock();
        let elapsed = self.clock.now().saturating_duration_since(state.last_emit);
        let delta = rss_mb.abs_diff(state.last_rss_mb);
        if elapsed >= Duration::from_secs(60) || delta >= 1 {
            state.last_emit = self.clock.now();
            state.last_rss_mb = rss_mb;
            drop(state);
            self.events.publish(Event::DaemonStatusChange);
        }
    }

    // ---- Control API surface (§4.G) -------------------------------------

    pub fn get_projects(&self) -> Vec<String> {
        self.registry.get_projects()
    }

    pub fn get_spiders(&self, project: &str) -> Result<Vec<String>> {
        Ok(self.registry.get_spiders(project)?)
    }

    pub async fn push_project(&self, bytes: &[u8]) -> Result<sdo_core::Project> {
        let project = self
            .registry
            .push(bytes, &self.runner, |project, spider| {
                self.store
                    .lock()
                    .scheduled_for(project)
                    .map(|rows| rows.iter().any(|job| job.spider == spider))
                    .unwrap_or(false)
            })
            .await?;
        self.events.publish(Event::ProjectPush { project: project.clone() });
        Ok(project)
    }

    pub fn remove_project(&self, name: &str) -> Result<()> {
        self.registry.remove(name, || {
            self.store.lock().scheduled_for(name).map(|rows| !rows.is_empty()).unwrap_or(true)
        })?;
        self.events.publish(Event::ProjectRemove { name: name.to_string() });
        Ok(())
    }

    /// `when = "now"` creates a PENDING row directly; any other string is
    /// parsed as a recurrence, registered as a trigger, and stored SCHEDULED
    /// with its schedule string preserved.
    pub fn schedule_job(&self, project: &str, spider: &str, when: &str, actor: Actor) -> Result<JobId> {
        if !self.registry.has_project(project) {
            return Err(Error::value(format!("unknown project '{project}'")));
        }
        if !self.registry.get_spiders(project)?.iter().any(|s| s == spider) {
            return Err(Error::value(format!("unknown spider '{spider}' for project '{project}'")));
        }

        let now = self.now_rfc3339();
        if when == SCHEDULE_NOW {
            let job = Job::new(JobStatus::Pending, actor, SCHEDULE_NOW, project, spider, now);
            let id = job.id;
            self.store.lock().add(&job)?;
            self.events.publish(Event::JobUpdate { job });
            return Ok(id);
        }

        let spec = sdo_scheduler::parse(when)?;
        let job = Job::new(JobStatus::Scheduled, actor, when, project, spider, now);
        let id = job.id;
        self.store.lock().add(&job)?;
        let trigger_id = self.scheduler.register(spec);
        self.scheduled_triggers.lock().insert(id, trigger_id);
        self.trigger_targets.lock().insert(trigger_id, (project.to_string(), spider.to_string()));
        self.events.publish(Event::JobUpdate { job });
        Ok(id)
    }

    /// Cancels a job per spec.md §4.D: SCHEDULED drops the trigger,
    /// PENDING is a direct status flip, RUNNING waits out the placeholder
    /// (if any) before signaling and awaiting the child.
    pub async fn cancel_job(self: &Arc<Self>, id: JobId) -> Result<()> {
        let job = self.store.lock().get(&id)?;
        match job.status {
            JobStatus::Scheduled => {
                let mut job = job;
                job.set_status(JobStatus::Canceled, self.now_rfc3339());
                self.store.lock().commit(&job)?;
                if let Some(trigger_id) = self.scheduled_triggers.lock().remove(&id) {
                    self.scheduler.cancel(trigger_id);
                    self.trigger_targets.lock().remove(&trigger_id);
                }
                self.events.publish(Event::JobUpdate { job });
                Ok(())
            }
            JobStatus::Pending => {
                let mut job = job;
                job.set_status(JobStatus::Canceled, self.now_rfc3339());
                self.store.lock().commit(&job)?;
                self.events.publish(Event::JobUpdate { job });
                Ok(())
            }
            JobStatus::Running => self.cancel_running(id).await,
            _ => Err(Error::invalid_state(format!("job {id} is already in a terminal state"))),
        }
    }

    async fn cancel_running(&self, id: JobId) -> Result<()> {
        loop {
            let handle = {
                let jobs = self.running_jobs.lock();
                match jobs.get(&id) {
                    Some(RunningSlot::Started(job)) => Some((job.process.clone(), job.canceled.clone())),
                    Some(RunningSlot::Starting) => None,
                    None => return Err(Error::not_found(id.to_string())),
                }
            };
            match handle {
                Some((process, canceled)) => {
                    canceled.store(true, Ordering::SeqCst);
                    process.signal_term()?;
                    process.wait().await;
                    return Ok(());
                }
                None => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    }

    pub fn get_job(&self, id: JobId) -> Result<Job> {
        Ok(self.store.lock().get(&id)?)
    }

    pub fn get_jobs(&self, status: JobStatus) -> Result<Vec<Job>> {
        Ok(self.store.lock().by_status(status)?)
    }

    pub fn get_active_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.store.lock().active()?)
    }

    pub fn get_completed_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.store.lock().completed()?)
    }

    pub fn get_job_logs(&self, id: JobId) -> Result<(Option<std::path::PathBuf>, Option<std::path::PathBuf>)> {
        let _ = self.store.lock().get(&id)?; // NotFound if the job never existed
        let out = self.config.log_dir().join(format!("{}.out", id.as_str()));
        let err = self.config.log_dir().join(format!("{}.err", id.as_str()));
        Ok((out.exists().then_some(out), err.exists().then_some(err)))
    }

    // ---- lifecycle --------------------------------------------------

    /// Drives the four tick loops at their configured periods until the
    /// returned handle is aborted. Intended for `sdo-daemon`'s main loop.
    pub fn run_forever(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut scheduler_tick = tokio::time::interval(Duration::from_secs(1));
            let mut crawlers_tick = tokio::time::interval(Duration::from_secs(1));
            let mut purger_tick = tokio::time::interval(Duration::from_secs(10));
            let mut events_tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = scheduler_tick.tick() => self.tick_scheduler().await,
                    _ = crawlers_tick.tick() => self.tick_crawlers().await,
                    _ = purger_tick.tick() => self.tick_purger().await,
                    _ = events_tick.tick() => self.tick_events().await,
                }
            }
        })
    }

    /// Waits until every `running_jobs` placeholder has resolved, sends
    /// SIGTERM to every still-running child, and awaits each completion
    /// future before returning. The process must not exit with a live
    /// child (spec.md §4.D shutdown sequence).
    pub async fn shutdown(&self) {
        loop {
            let still_starting = self.running_jobs.lock().values().any(|slot| matches!(slot, RunningSlot::Starting));
            if !still_starting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let processes: Vec<SpawnedProcess> = self
            .running_jobs
            .lock()
            .values()
            .filter_map(|slot| match slot {
                RunningSlot::Started(job) => Some(job.process.clone()),
                RunningSlot::Starting => None,
            })
            .collect();

        for process in &processes {
            if let Err(e) = process.signal_term() {
                warn!(pid = process.pid(), error = %e, "failed to signal child during shutdown");
            }
        }
        for process in &processes {
            process.wait().await;
        }
    }
}

fn current_rss_mb() -> u64 {
    let mut system = sysinfo::System::new();
    let pid = sysinfo::Pid::from_u32(std::process::id());
    system.refresh_process(pid);
    system.process(pid).map(|p| p.memory() / (1024 * 1024)).unwrap_or(0)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
