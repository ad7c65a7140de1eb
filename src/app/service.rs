//! Application service: the request-facing core.
//!
//! [`AppService`] turns [`AppCommand`]s into scheduler and orchestrator
//! calls.  Validation happens synchronously so every request gets an
//! immediate reply; the dispense itself runs later (scheduled) or on a
//! worker thread (manual).
//!
//! ```text
//!  AppCommand ──▶ ┌────────────────────┐ ──▶ JobScheduler
//!                 │     AppService     │
//! CommandReply ◀──│  validate · route  │ ──▶ DispenseOrchestrator
//!                 └────────────────────┘
//! ```

use std::sync::Arc;

use log::{info, warn};

use super::commands::{AppCommand, CommandReply, ScheduleView};
use super::dispense::DispenseOrchestrator;
use super::events::format_timestamp;
use super::ports::Clock;
use crate::error::{InputError, Result};
use crate::scheduler::JobScheduler;

/// Layout of `next_run_time` in listings.
const NEXT_RUN_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

pub struct AppService {
    scheduler: Arc<JobScheduler>,
    orchestrator: Arc<DispenseOrchestrator>,
    clock: Arc<dyn Clock>,
}

impl AppService {
    pub fn new(
        scheduler: Arc<JobScheduler>,
        orchestrator: Arc<DispenseOrchestrator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            orchestrator,
            clock,
        }
    }

    /// Handle one command.  Never panics, never blocks on hardware.
    pub fn handle_command(&self, cmd: AppCommand) -> CommandReply {
        let result = match cmd {
            AppCommand::AddSchedule {
                id,
                name,
                time,
                compartment,
            } => self.add_schedule(id, name, time, compartment),
            AppCommand::ListSchedules => return self.list_schedules(),
            AppCommand::RemoveSchedule { id } => self.remove_schedule(id),
            AppCommand::ManualDispense { compartment } => self.manual_dispense(compartment),
        };
        match result {
            Ok(message) => CommandReply::success(message),
            Err(e) => {
                warn!("Request rejected: {}", e);
                CommandReply::error(e.to_string())
            }
        }
    }

    /// Parse and handle one JSON-encoded command.
    pub fn handle_json(&self, line: &str) -> CommandReply {
        match serde_json::from_str::<AppCommand>(line) {
            Ok(cmd) => self.handle_command(cmd),
            Err(e) => {
                warn!("Request malformed: {}", e);
                CommandReply::error(format!("malformed request: {e}"))
            }
        }
    }

    fn add_schedule(
        &self,
        id: Option<String>,
        name: Option<String>,
        time: Option<String>,
        compartment: Option<i64>,
    ) -> Result<&'static str> {
        let name = name.ok_or(InputError::MissingField("name"))?;
        let time = time.ok_or(InputError::MissingField("time"))?;
        let compartment = compartment.ok_or(InputError::MissingField("compartment"))?;
        let id = id.unwrap_or_else(|| format_timestamp(self.clock.now()));
        info!("Request: add schedule '{}' ({} at {})", id, name, time);

        let orchestrator = Arc::clone(&self.orchestrator);
        self.scheduler.add_job(
            &id,
            compartment,
            &name,
            &time,
            move |schedule_id: &str, compartment: u8, pill_name: &str| {
                // Failures were already announced as `dispense_failed`.
                let _ = orchestrator.trigger_dispense(schedule_id, i64::from(compartment), pill_name);
            },
        )?;
        Ok("Schedule added")
    }

    fn list_schedules(&self) -> CommandReply {
        let offset = self.scheduler.offset();
        let schedules = self
            .scheduler
            .list_jobs()
            .into_iter()
            .map(|job| ScheduleView {
                id: job.id,
                name: job.name,
                next_run_time: job.next_run.with_timezone(&offset).format(NEXT_RUN_FORMAT).to_string(),
            })
            .collect::<Vec<_>>();
        let mut reply = CommandReply::success(format!("{} schedule(s)", schedules.len()));
        reply.schedules = Some(schedules);
        reply
    }

    fn remove_schedule(&self, id: Option<String>) -> Result<&'static str> {
        let id = id.ok_or(InputError::MissingField("id"))?;
        self.scheduler.remove_job(&id)?;
        Ok("Schedule removed")
    }

    fn manual_dispense(&self, compartment: Option<i64>) -> Result<&'static str> {
        let compartment = compartment.ok_or(InputError::MissingField("compartment"))?;
        info!("Request: manual dispense from compartment {}", compartment);
        self.orchestrator.dispense_manual(compartment)?;
        Ok("Manual dispense initiated")
    }
}
