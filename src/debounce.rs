//! Debouncer for rebuild requests
//!
//! Editors often emit several write events for one logical save (temp-file
//! swap, metadata touch). Only the first trigger in a burst is accepted.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default quiet interval in milliseconds
pub const DEBOUNCE_MS: u64 = 100;

/// Gate that accepts a trigger only when the previous accepted one is older
/// than the quiet interval.
#[derive(Debug)]
pub struct Debouncer {
    quiet_interval: Duration,
    /// `None` is the zero time: the first attempt always passes.
    last_accepted: Mutex<Option<Instant>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

impl Debouncer {
    pub fn new(quiet_interval: Duration) -> Self {
        Self {
            quiet_interval,
            last_accepted: Mutex::new(None),
        }
    }

    /// Returns true if the caller should rebuild.
    ///
    /// The check and the timestamp update happen under one lock, so two
    /// concurrent attempts can never both pass inside the same window.
    pub fn attempt(&self, now: Instant) -> bool {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let accepted = match *last {
            None => true,
            Some(prev) => match now.checked_duration_since(prev) {
                Some(elapsed) => elapsed > self.quiet_interval,
                None => false,
            },
        };

        if accepted {
            *last = Some(now);
        }
        accepted
    }
}
