//! Daily dose scheduler.
//!
//! Holds the schedule-id → job table and fires each job's
//! [`DispenseTrigger`] once a day at its `HH:MM` wall-clock time.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       JobScheduler                           │
//! │                                                              │
//! │  add_job / remove_job / list_jobs      (request threads)     │
//! │            │                                                 │
//! │            ▼                                                 │
//! │  ┌────────────────────────────┐    ┌──────────────────────┐  │
//! │  │ jobs: id → DispenseJob     │◀───│ timing thread        │  │
//! │  │ (Mutex)                    │    │ run_due(clock.now()) │  │
//! │  └────────────────────────────┘    └──────────┬───────────┘  │
//! │                                               │ lock dropped │
//! │                                               ▼              │
//! │                                  DispenseTrigger::fire(..)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Triggers are evaluated in a fixed UTC offset.  A trigger observed
//! more than the misfire grace late (the process was down, the clock
//! jumped) is skipped and rescheduled; missed doses are never backfilled.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Utc};
use log::{info, warn};

use crate::app::ports::{Clock, DispenseTrigger};
use crate::config::SchedulerConfig;
use crate::error::{Error, InputError, Result};
use crate::sequencer::Compartment;

// ═══════════════════════════════════════════════════════════════
//  Trigger time
// ═══════════════════════════════════════════════════════════════

/// Parse a 24-hour `HH:MM` (one or two digits each side).
pub fn parse_daily_time(text: &str) -> core::result::Result<NaiveTime, InputError> {
    let invalid = || InputError::InvalidTimeFormat(text.to_owned());
    let (h, m) = text.split_once(':').ok_or_else(invalid)?;
    let field = |s: &str| -> Option<u32> {
        if (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };
    let (hour, minute) = field(h).zip(field(m)).ok_or_else(invalid)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// First instant strictly after `after` whose wall-clock time in
/// `offset` is `at`.
pub fn next_occurrence(at: NaiveTime, after: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = after.with_timezone(&offset).date_naive();
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    let mut next = (local_date.and_time(at) - shift).and_utc();
    while next <= after {
        next += TimeDelta::days(1);
    }
    next
}

// ═══════════════════════════════════════════════════════════════
//  Job table
// ═══════════════════════════════════════════════════════════════

struct DispenseJob {
    compartment: Compartment,
    pill_name: String,
    at: NaiveTime,
    next_run: DateTime<Utc>,
    trigger: Arc<dyn DispenseTrigger>,
}

/// Snapshot of one job for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub next_run: DateTime<Utc>,
}

/// A trigger taken out of the table, ready to fire without the lock.
struct DueFire {
    id: String,
    compartment: u8,
    pill_name: String,
    trigger: Arc<dyn DispenseTrigger>,
}

struct Shared {
    jobs: Mutex<BTreeMap<String, DispenseJob>>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    grace: TimeDelta,
    poll: Duration,
    running: AtomicBool,
}

impl Shared {
    fn jobs(&self) -> MutexGuard<'_, BTreeMap<String, DispenseJob>> {
        // Table updates are single assignments; a poisoned table is intact.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct JobScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobScheduler {
    pub fn new(clock: Arc<dyn Clock>, cfg: &SchedulerConfig) -> Self {
        let offset =
            FixedOffset::east_opt(cfg.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        Self {
            shared: Arc::new(Shared {
                jobs: Mutex::new(BTreeMap::new()),
                clock,
                offset,
                grace: TimeDelta::seconds(cfg.misfire_grace_secs as i64),
                poll: Duration::from_millis(cfg.poll_interval_ms),
                running: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Install (or replace) the daily job `id`.
    pub fn add_job(
        &self,
        id: &str,
        compartment: i64,
        pill_name: &str,
        time: &str,
        trigger: impl DispenseTrigger + 'static,
    ) -> Result<()> {
        let at = parse_daily_time(time)?;
        let compartment = Compartment::new(compartment)?;
        let next_run = next_occurrence(at, self.shared.clock.now(), self.shared.offset);

        let job = DispenseJob {
            compartment,
            pill_name: pill_name.to_owned(),
            at,
            next_run,
            trigger: Arc::new(trigger),
        };
        let replaced = self.shared.jobs().insert(id.to_owned(), job).is_some();
        info!(
            "Scheduler: {} '{}' ({} from compartment {}) daily at {}, next {}",
            if replaced { "replaced" } else { "added" },
            id,
            pill_name,
            compartment,
            at.format("%H:%M"),
            next_run
        );
        Ok(())
    }

    pub fn remove_job(&self, id: &str) -> Result<()> {
        match self.shared.jobs().remove(id) {
            Some(_) => {
                info!("Scheduler: removed '{}'", id);
                Ok(())
            }
            None => {
                warn!("Scheduler: cannot remove '{}': no such job", id);
                Err(Error::JobNotFound(id.to_owned()))
            }
        }
    }

    /// All jobs, soonest first (ties broken by id).
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self
            .shared
            .jobs()
            .iter()
            .map(|(id, job)| JobInfo {
                id: id.clone(),
                name: format!("Dispense '{}'", job.pill_name),
                next_run: job.next_run,
            })
            .collect();
        jobs.sort_by(|a, b| a.next_run.cmp(&b.next_run).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Offset the `HH:MM` triggers are written in.
    pub fn offset(&self) -> FixedOffset {
        self.shared.offset
    }

    /// Fire every job due at `now` and reschedule it for the next day.
    /// Returns how many triggers fired.
    pub fn run_due(&self, now: DateTime<Utc>) -> usize {
        run_due(&self.shared, now)
    }

    /// Start the timing thread.  Calling it twice is harmless.
    pub fn start(&self) -> io::Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        if worker.is_some() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || {
                while shared.running.load(Ordering::SeqCst) {
                    run_due(&shared, shared.clock.now());
                    thread::park_timeout(shared.poll);
                }
            })?;
        *worker = Some(handle);
        info!("Scheduler: started");
        Ok(())
    }

    /// Stop the timing thread and wait for it.  A trigger already
    /// firing runs to completion first.
    pub fn stop(&self) {
        let handle = self.worker.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            self.shared.running.store(false, Ordering::SeqCst);
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("Scheduler: timing thread panicked");
            }
            info!("Scheduler: stopped");
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_due(shared: &Shared, now: DateTime<Utc>) -> usize {
    let mut due = Vec::new();
    {
        let mut jobs = shared.jobs();
        for (id, job) in jobs.iter_mut().filter(|(_, job)| job.next_run <= now) {
            let late = now - job.next_run;
            if late > shared.grace {
                warn!(
                    "Scheduler: '{}' missed its {} run by {}s, skipping",
                    id,
                    job.next_run,
                    late.num_seconds()
                );
            } else {
                due.push(DueFire {
                    id: id.clone(),
                    compartment: job.compartment.index(),
                    pill_name: job.pill_name.clone(),
                    trigger: Arc::clone(&job.trigger),
                });
            }
            job.next_run = next_occurrence(job.at, now, shared.offset);
        }
    }

    for fire in &due {
        info!("Scheduler: firing '{}'", fire.id);
        fire.trigger.fire(&fire.id, fire.compartment, &fire.pill_name);
    }
    due.len()
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
