// SPDX-License-Identifier: MIT

use super::*;
use sdo_core::FakeClock;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use tempfile::tempdir;
use zip::write::FileOptions;

fn test_config(root: &std::path::Path, job_slots: u32) -> Config {
    Config::new(root, job_slots, 100).unwrap()
}

/// Writes an executable shell script at `dir/name` with `body` as its
/// contents, invoked by the orchestrator as `<script> crawl <spider>` or
/// `<script> list`.
fn write_runner(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn quotesbot_zip(spiders: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let options = FileOptions::default();
        writer.start_file("quotesbot/scrapy.cfg", options).unwrap();
        writer.write_all(b"[deploy]\nproject = quotesbot\n").unwrap();
        writer.start_file("quotesbot/quotesbot/__init__.py", options).unwrap();
        writer.write_all(b"").unwrap();
        writer.finish().unwrap();
    }
    let _ = spiders;
    buf
}

/// A runner whose `list` prints the given spiders and whose `crawl` exits
/// immediately with `exit_code`.
fn fixed_runner(dir: &std::path::Path, spiders: &[&str], exit_code: i32) -> std::path::PathBuf {
    let listing: String = spiders.iter().map(|s| format!("echo {s}\n")).collect();
    write_runner(
        dir,
        "runner",
        &format!(
            "if [ \"$1\" = list ]; then\n{listing}exit 0\nfi\nif [ \"$1\" = crawl ]; then\nexit {exit_code}\nfi\n"
        ),
    )
}

/// A runner whose `crawl` sleeps for a bit before exiting, to give tests a
/// window in which to observe RUNNING status or race a cancel against it.
fn slow_runner(dir: &std::path::Path, spiders: &[&str], sleep_secs: u32) -> std::path::PathBuf {
    let listing: String = spiders.iter().map(|s| format!("echo {s}\n")).collect();
    write_runner(
        dir,
        "runner",
        &format!(
            "if [ \"$1\" = list ]; then\n{listing}exit 0\nfi\nif [ \"$1\" = crawl ]; then\nsleep {sleep_secs}\nexit 0\nfi\n"
        ),
    )
}

async fn bootstrap_with_runner(
    root: &std::path::Path,
    job_slots: u32,
    runner: std::path::PathBuf,
) -> (Arc<Orchestrator>, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    let config = test_config(root, job_slots);
    let orchestrator = Orchestrator::bootstrap(config, clock.clone(), runner.display().to_string())
        .unwrap();
    (Arc::new(orchestrator), clock)
}

async fn push_quotesbot(orchestrator: &Orchestrator, spiders: &[&str]) {
    let bytes = quotesbot_zip(spiders);
    orchestrator.push_project(&bytes).await.unwrap();
}

#[tokio::test]
async fn crash_recovery_demotes_running_to_pending() {
    let root = tempdir().unwrap();
    let clock = Arc::new(FakeClock::new());

    // Seed the store directly with a RUNNING row, simulating a daemon that
    // crashed mid-job (spec.md §3 cross-restart invariant, Testable
    // Property 4).
    {
        let config = test_config(root.path(), 2);
        std::fs::create_dir_all(&config.project_store).unwrap();
        let c = clock.clone();
        let store = sdo_store::Store::open(config.schedule_path(), move || c.now_rfc3339()).unwrap();
        let job = sdo_core::Job::builder()
            .status(sdo_core::JobStatus::Running)
            .project("quotesbot")
            .spider("toscrape-css")
            .build();
        store.add(&job).unwrap();
    }

    let runner = fixed_runner(root.path(), &["toscrape-css"], 0);
    let (orchestrator, _clock) = bootstrap_with_runner(root.path(), 2, runner).await;

    let running = orchestrator.get_jobs(sdo_core::JobStatus::Running).unwrap();
    assert!(running.is_empty(), "RUNNING rows must not survive a restart");

    let pending = orchestrator.get_jobs(sdo_core::JobStatus::Pending).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].project, "quotesbot");
    assert_eq!(pending[0].spider, "toscrape-css");
}

#[tokio::test]
async fn slot_bound_is_never_exceeded() {
    let root = tempdir().unwrap();
    let runner = slow_runner(root.path(), &["toscrape-css"], 2);
    let (orchestrator, clock) = bootstrap_with_runner(root.path(), 2, runner).await;
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    for _ in 0..4 {
        orchestrator
            .schedule_job("quotesbot", "toscrape-css", sdo_core::SCHEDULE_NOW, sdo_core::Actor::User)
            .unwrap();
    }

    orchestrator.tick_crawlers().await;

    let running = orchestrator.get_jobs(sdo_core::JobStatus::Running).unwrap();
    assert_eq!(running.len(), 2, "job-slots=2 must cap concurrently RUNNING jobs");
    let pending = orchestrator.get_jobs(sdo_core::JobStatus::Pending).unwrap();
    assert_eq!(pending.len(), 2);

    // Drain the two running jobs by waiting out the clock; shutdown waits
    // for every started child regardless, so use it to clean up here.
    let _ = clock;
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn cancel_on_pending_never_spawns_a_process() {
    let root = tempdir().unwrap();
    let runner = fixed_runner(root.path(), &["toscrape-css"], 0);
    let (orchestrator, _clock) = bootstrap_with_runner(root.path(), 2, runner).await;
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    let id = orchestrator
        .schedule_job("quotesbot", "toscrape-css", sdo_core::SCHEDULE_NOW, sdo_core::Actor::User)
        .unwrap();
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Pending);

    orchestrator.cancel_job(id).await.unwrap();
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Canceled);

    orchestrator.tick_crawlers().await;

    let job = orchestrator.get_job(id).unwrap();
    assert_eq!(job.status, sdo_core::JobStatus::Canceled, "a canceled PENDING job must never run");
    assert!(orchestrator.get_jobs(sdo_core::JobStatus::Running).unwrap().is_empty());
}

#[tokio::test]
async fn cancel_on_scheduled_removes_the_trigger() {
    let root = tempdir().unwrap();
    let runner = fixed_runner(root.path(), &["toscrape-css"], 0);
    let (orchestrator, clock) = bootstrap_with_runner(root.path(), 2, runner).await;
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    let id = orchestrator
        .schedule_job("quotesbot", "toscrape-css", "every second", sdo_core::Actor::User)
        .unwrap();
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Scheduled);

    orchestrator.cancel_job(id).await.unwrap();
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Canceled);

    // Advance the clock well past several firings and tick the scheduler;
    // a live trigger would otherwise have produced new PENDING rows.
    clock.advance(std::time::Duration::from_secs(10));
    orchestrator.tick_scheduler().await;
    orchestrator.tick_scheduler().await;

    let pending = orchestrator.get_jobs(sdo_core::JobStatus::Pending).unwrap();
    assert!(pending.is_empty(), "canceling a SCHEDULED job must drop its trigger");
}

#[tokio::test]
async fn cancel_on_running_results_in_canceled_not_failed() {
    let root = tempdir().unwrap();
    let runner = slow_runner(root.path(), &["toscrape-css"], 5);
    let (orchestrator, _clock) = bootstrap_with_runner(root.path(), 2, runner).await;
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    let id = orchestrator
        .schedule_job("quotesbot", "toscrape-css", sdo_core::SCHEDULE_NOW, sdo_core::Actor::User)
        .unwrap();
    orchestrator.tick_crawlers().await;
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Running);

    orchestrator.cancel_job(id).await.unwrap();

    let job = orchestrator.get_job(id).unwrap();
    assert_eq!(job.status, sdo_core::JobStatus::Canceled, "SIGTERM exit must not read as FAILED");
    assert!(orchestrator.get_jobs(sdo_core::JobStatus::Running).unwrap().is_empty());
}

#[tokio::test]
async fn cancel_on_terminal_job_is_invalid_state() {
    let root = tempdir().unwrap();
    let runner = fixed_runner(root.path(), &["toscrape-css"], 0);
    let (orchestrator, _clock) = bootstrap_with_runner(root.path(), 2, runner).await;
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    let id = orchestrator
        .schedule_job("quotesbot", "toscrape-css", sdo_core::SCHEDULE_NOW, sdo_core::Actor::User)
        .unwrap();
    orchestrator.tick_crawlers().await;
    orchestrator.shutdown().await;
    assert_eq!(orchestrator.get_job(id).unwrap().status, sdo_core::JobStatus::Successful);

    let err = orchestrator.cancel_job(id).await.unwrap_err();
    assert!(matches!(err, sdo_core::Error::InvalidState(_)));
}

#[tokio::test]
async fn retention_purge_removes_only_the_oldest_tail() {
    let root = tempdir().unwrap();
    let runner = fixed_runner(root.path(), &["toscrape-css"], 0);
    let clock = Arc::new(FakeClock::new());
    let config = test_config(root.path(), 1);
    let completed_cap = 3u32;
    let config = Config::new(config.project_store, config.job_slots, completed_cap).unwrap();
    let orchestrator =
        Arc::new(Orchestrator::bootstrap(config, clock.clone(), runner.display().to_string()).unwrap());
    push_quotesbot(&orchestrator, &["toscrape-css"]).await;

    let mut ids = Vec::new();
    for _ in 0..5 {
        let id = orchestrator
            .schedule_job("quotesbot", "toscrape-css", sdo_core::SCHEDULE_NOW, sdo_core::Actor::User)
            .unwrap();
        clock.advance(std::time::Duration::from_secs(1));
        orchestrator.tick_crawlers().await;
        // Wait for the single-slot run to finish before scheduling the next.
        while orchestrator.get_job(id).unwrap().status == sdo_core::JobStatus::Running {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        ids.push(id);
    }

    assert_eq!(orchestrator.get_completed_jobs().unwrap().len(), 5);

    orchestrator.tick_purger().await;

    let completed = orchestrator.get_completed_jobs().unwrap();
    assert_eq!(completed.len(), 3, "only the 3 newest completed jobs should remain");

    // Store ordering is timestamp DESC, so the 3 newest are the last 3
    // scheduled; the oldest 2 must be gone from both the store and the
    // control API.
    let remaining: std::collections::HashSet<_> = completed.iter().map(|j| j.id).collect();
    for newest in &ids[2..] {
        assert!(remaining.contains(newest), "newest completed jobs must survive the purge");
        assert!(orchestrator.get_job(*newest).is_ok());
    }
    for oldest in &ids[..2] {
        assert!(!remaining.contains(oldest), "oldest completed jobs must be purged");
        assert!(orchestrator.get_job(*oldest).is_err());
    }
}
