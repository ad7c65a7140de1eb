//! System time adapter.
//!
//! Provides wall-clock queries for daily triggers and event timestamps.
//! The scheduler only ever sees the [`Clock`] port, so tests drive it
//! with a manual clock instead.

use chrono::{DateTime, Utc};

use crate::app::ports::Clock;

/// Wall clock backed by the host's system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
