//! Log-based notification sink adapter.
//!
//! Implements [`NotificationSink`] by writing every notification to the
//! log, one line per event.  Runs alongside the real-time fan-out so the
//! journal keeps a record even when no subscriber is connected.

use log::{info, warn};

use crate::app::events::Notification;
use crate::app::ports::NotificationSink;

/// Adapter that logs every [`Notification`].
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogNotificationSink {
    fn emit(&self, notification: &Notification) {
        match notification {
            Notification::DispenseSuccess {
                schedule_id,
                compartment,
                pill_name,
                timestamp,
            } => {
                info!(
                    "DOSE | {} | schedule={} compartment={} pill='{}'",
                    timestamp, schedule_id, compartment, pill_name
                );
            }
            Notification::DispenseFailed {
                schedule_id,
                compartment,
                reason,
                timestamp,
            } => {
                warn!(
                    "DOSE | {} | FAILED schedule={} compartment={} reason={}",
                    timestamp, schedule_id, compartment, reason
                );
            }
            Notification::Emergency { timestamp } => {
                warn!("EMERGENCY | {}", timestamp);
            }
        }
    }
}
