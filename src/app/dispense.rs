//! Dispense orchestrator.
//!
//! Glue between a trigger (daily schedule or manual request) and the
//! hardware:
//!
//! ```text
//!  trigger ──▶ ActuatorSequencer.dispense ──▶ ConfirmationPort.confirm
//!                  (FIFO actuation lock)              │
//!                                                     ▼
//!              DoseFollowUp ◀── DispenseEvent ──▶ NotificationSink
//! ```

use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

use super::events::{DispenseEvent, Notification, format_timestamp};
use super::ports::{AssumeDispensed, Clock, ConfirmationPort, DoseFollowUp, NoFollowUp, NotificationSink};
use crate::error::{Error, HardwareError, Result};
use crate::sequencer::{ActuatorSequencer, Compartment};

/// Schedule id carried by manual dispenses.
pub const MANUAL_SCHEDULE_ID: &str = "manual";
/// Pill name carried by manual dispenses.
pub const MANUAL_PILL_NAME: &str = "Manual Dispense";

pub struct DispenseOrchestrator {
    sequencer: Arc<ActuatorSequencer>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    confirmation: Box<dyn ConfirmationPort>,
    follow_up: Box<dyn DoseFollowUp>,
}

impl DispenseOrchestrator {
    pub fn new(
        sequencer: Arc<ActuatorSequencer>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sequencer,
            sink,
            clock,
            confirmation: Box::new(AssumeDispensed),
            follow_up: Box::new(NoFollowUp),
        }
    }

    /// Replace the default (assumed) pill confirmation.
    pub fn with_confirmation(mut self, confirmation: impl ConfirmationPort + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    pub fn with_follow_up(mut self, follow_up: impl DoseFollowUp + 'static) -> Self {
        self.follow_up = Box::new(follow_up);
        self
    }

    /// Actuate, confirm, and announce one dose.
    ///
    /// A confirmed dose emits exactly one `dispense_success`.  A rejected
    /// or failed actuation emits `dispense_failed` and returns the error.
    /// A dose the detector did not see returns its (unconfirmed) event
    /// and emits `dispense_failed`.
    pub fn trigger_dispense(
        &self,
        schedule_id: &str,
        compartment: i64,
        pill_name: &str,
    ) -> Result<DispenseEvent> {
        info!(
            "Dispense: '{}' from compartment {} (schedule '{}')",
            pill_name, compartment, schedule_id
        );

        let actuation = match self.sequencer.dispense(compartment) {
            Ok(actuation) => actuation,
            Err(e) => {
                error!("Dispense: schedule '{}' failed: {}", schedule_id, e);
                self.sink.emit(&Notification::DispenseFailed {
                    schedule_id: schedule_id.to_owned(),
                    compartment,
                    reason: e.to_string(),
                    timestamp: format_timestamp(self.clock.now()),
                });
                return Err(e);
            }
        };

        let confirmation = self.confirmation.confirm(actuation.compartment);
        let event = DispenseEvent {
            schedule_id: schedule_id.to_owned(),
            compartment: actuation.compartment.index(),
            pill_name: pill_name.to_owned(),
            timestamp: self.clock.now(),
            confirmed: confirmation.is_confirmed(),
            confirmation,
        };
        info!(
            "Dispense: compartment {} done, confirmation {:?}{}",
            event.compartment,
            confirmation,
            if actuation.simulated { " (stub hardware)" } else { "" }
        );

        if event.confirmed {
            self.sink.emit(&Notification::dispense_success(&event));
        } else {
            warn!("Dispense: no pill detected from compartment {}", event.compartment);
            self.sink.emit(&Notification::DispenseFailed {
                schedule_id: event.schedule_id.clone(),
                compartment: i64::from(event.compartment),
                reason: "pill not detected".to_owned(),
                timestamp: format_timestamp(event.timestamp),
            });
        }

        self.follow_up.after_dispense(&event);
        Ok(event)
    }

    /// Validate `compartment` now, dispense on a worker thread.
    ///
    /// Returns as soon as the worker is running; the outcome arrives only
    /// as a notification.
    pub fn dispense_manual(self: &Arc<Self>, compartment: i64) -> Result<()> {
        let compartment = Compartment::new(compartment)?;
        let this = Arc::clone(self);
        thread::Builder::new()
            .name("manual-dispense".into())
            .spawn(move || {
                // Failures were already announced as `dispense_failed`.
                let _ = this.trigger_dispense(
                    MANUAL_SCHEDULE_ID,
                    i64::from(compartment.index()),
                    MANUAL_PILL_NAME,
                );
            })
            .map_err(|e| {
                error!("Dispense: cannot start manual worker: {}", e);
                Error::Hardware(HardwareError::Unavailable("manual dispense worker"))
            })?;
        info!("Dispense: manual dispense from compartment {} initiated", compartment);
        Ok(())
    }
}
