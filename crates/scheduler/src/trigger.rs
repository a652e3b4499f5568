// SPDX-License-Identifier: MIT

//! Trigger table driven by the orchestrator's 1 Hz scheduler tick.

use crate::dsl::{RecurrenceSpec, Unit};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use rand::Rng;
use sdo_core::Clock;
use std::sync::Arc;

sdo_core::define_id! {
    /// Identifies a live recurrence registration.
    pub struct TriggerId("trg_");
}

struct TriggerEntry {
    id: TriggerId,
    spec: RecurrenceSpec,
    next_fire: DateTime<Utc>,
}

/// Computes the next firing time strictly after `from`, given `spec`.
pub fn next_fire_after(spec: &RecurrenceSpec, from: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(weekday) = spec.weekday {
        let time = spec.at.unwrap_or((0, 0));
        return next_weekday_at(from, weekday.to_chrono(), time);
    }

    if let Some(time) = spec.at {
        if matches!(spec.unit, Unit::Day | Unit::Week) {
            return next_periodic_time(from, time, spec.every, spec.unit);
        }
    }

    let interval_units = match spec.range_to {
        Some(m) if m > spec.every => rand::thread_rng().gen_range(spec.every..=m),
        Some(m) => m,
        None => spec.every,
    };
    from + Duration::milliseconds(spec.unit.milliseconds() * interval_units as i64)
}

fn next_periodic_time(from: DateTime<Utc>, time: (u8, u8), every: u32, unit: Unit) -> DateTime<Utc> {
    let period_days = match unit {
        Unit::Week => every as i64 * 7,
        _ => every as i64,
    };
    let mut candidate = from
        .date_naive()
        .and_hms_opt(time.0 as u32, time.1 as u32, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(from);
    while candidate <= from {
        candidate += Duration::days(period_days);
    }
    candidate
}

fn next_weekday_at(from: DateTime<Utc>, weekday: chrono::Weekday, time: (u8, u8)) -> DateTime<Utc> {
    for offset in 0..8 {
        let date = from.date_naive() + Duration::days(offset);
        if date.weekday() == weekday {
            if let Some(naive) = date.and_hms_opt(time.0 as u32, time.1 as u32, 0) {
                let candidate = Utc.from_utc_datetime(&naive);
                if candidate > from {
                    return candidate;
                }
            }
        }
    }
    from + Duration::days(7)
}

/// Owns the live trigger table. `tick()` is called at 1 Hz by the
/// orchestrator; tests call it directly against a [`sdo_core::FakeClock`].
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    triggers: Mutex<Vec<TriggerEntry>>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            triggers: Mutex::new(Vec::new()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64).unwrap_or_default()
    }

    /// Registers a parsed recurrence, computing its first firing time from
    /// the scheduler's clock.
    pub fn register(&self, spec: RecurrenceSpec) -> TriggerId {
        let next_fire = next_fire_after(&spec, self.now());
        let id = TriggerId::new();
        self.triggers.lock().push(TriggerEntry { id, spec, next_fire });
        id
    }

    pub fn cancel(&self, id: TriggerId) {
        self.triggers.lock().retain(|entry| entry.id != id);
    }

    pub fn is_registered(&self, id: TriggerId) -> bool {
        self.triggers.lock().iter().any(|entry| entry.id == id)
    }

    /// Returns the triggers whose next firing time has passed, rescheduling
    /// each to its next occurrence.
    pub fn tick(&self) -> Vec<TriggerId> {
        let now = self.now();
        let mut fired = Vec::new();
        let mut triggers = self.triggers.lock();
        for entry in triggers.iter_mut() {
            if entry.next_fire <= now {
                fired.push(entry.id);
                entry.next_fire = next_fire_after(&entry.spec, now);
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.triggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
