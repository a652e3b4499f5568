// SPDX-License-Identifier: MIT

//! §4.E Event Bus: a typed pub/sub with synchronous, best-effort delivery.

use parking_lot::Mutex;
use sdo_core::Event;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

/// Fans an [`Event`] out to every registered subscriber, in the producer's
/// own thread. A subscriber that panics is caught and logged; it never
/// prevents the remaining subscribers from being notified (spec.md §4.E:
/// "log and continue").
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.lock().push(Box::new(subscriber));
    }

    pub fn publish(&self, event: Event) {
        info!(kind = event.name(), summary = %event.log_summary(), "event published");
        for subscriber in self.subscribers.lock().iter() {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
            if outcome.is_err() {
                error!(kind = event.name(), "event subscriber panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
