// SPDX-License-Identifier: MIT

use super::*;
use crate::dsl::parse;
use sdo_core::FakeClock;

fn clock_at(epoch_ms: u64) -> Arc<FakeClock> {
    let clock = Arc::new(FakeClock::new());
    clock.set_epoch_ms(epoch_ms);
    Arc::new(FakeClock::clone(&clock))
}

#[test]
fn register_computes_first_fire_from_clock() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let scheduler = Scheduler::new(clock);
    let spec = parse("every 5 minutes").unwrap();
    let id = scheduler.register(spec);
    assert!(scheduler.is_registered(id));
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn tick_fires_and_reschedules_interval_trigger() {
    let fake = Arc::new(FakeClock::new());
    let clock: Arc<dyn Clock> = fake.clone();
    let scheduler = Scheduler::new(clock);
    let spec = parse("every 10 seconds").unwrap();
    scheduler.register(spec);

    assert_eq!(scheduler.tick(), Vec::new());

    fake.advance(std::time::Duration::from_secs(10));
    fake.set_epoch_ms(fake.epoch_ms() + 10_000);
    let fired = scheduler.tick();
    assert_eq!(fired.len(), 1);

    // Immediately re-ticking should not fire again until the next interval.
    assert_eq!(scheduler.tick(), Vec::new());
}

#[test]
fn cancel_removes_trigger() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let scheduler = Scheduler::new(clock);
    let spec = parse("every day").unwrap();
    let id = scheduler.register(spec);
    scheduler.cancel(id);
    assert!(!scheduler.is_registered(id));
    assert!(scheduler.is_empty());
}

#[test]
fn ranged_interval_next_fire_is_within_bounds() {
    let spec = parse("every 5 to 10 minutes").unwrap();
    let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    for _ in 0..50 {
        let next = next_fire_after(&spec, from);
        let delta = (next - from).num_minutes();
        assert!((5..=10).contains(&delta), "delta {delta} out of range");
    }
}

#[test]
fn weekday_trigger_lands_on_correct_day_and_time() {
    let spec = parse("every monday at 09:00").unwrap();
    // 2026-01-01 is a Thursday.
    let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let next = next_fire_after(&spec, from);
    assert_eq!(next.weekday(), chrono::Weekday::Mon);
    assert_eq!(next.format("%H:%M").to_string(), "09:00");
    assert!(next > from);
}

#[test]
fn daily_at_time_advances_past_today_when_time_has_passed() {
    let spec = parse("every day at 08:00").unwrap();
    let from = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    let next = next_fire_after(&spec, from);
    assert_eq!(next.date_naive(), from.date_naive() + Duration::days(1));
}

#[test]
fn daily_at_time_fires_later_today_when_time_has_not_passed() {
    let spec = parse("every day at 20:00").unwrap();
    let from = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    let next = next_fire_after(&spec, from);
    assert_eq!(next.date_naive(), from.date_naive());
}
