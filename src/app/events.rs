//! Outbound application events.
//!
//! The orchestrator and the emergency pipeline emit [`Notification`]s
//! through the [`NotificationSink`](super::ports::NotificationSink) port.
//! Adapters on the other side decide what to do with them: fan out to
//! real-time subscribers, write to the log, etc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp in the wire layout (UTC).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Outcome of the post-actuation pill check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// No detector fitted; the dose is taken as dispensed.
    Assumed,
    /// A detector saw the pill leave the gate.
    Verified,
    /// A detector looked and saw nothing.
    NotDetected,
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Assumed | Self::Verified)
    }

    /// Whether a sensor actually backed the result.
    pub fn is_verified(self) -> bool {
        !matches!(self, Self::Assumed)
    }
}

/// One record per actuation.  Consumed by the notification emit, not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseEvent {
    pub schedule_id: String,
    pub compartment: u8,
    pub pill_name: String,
    pub timestamp: DateTime<Utc>,
    pub confirmed: bool,
    pub confirmation: Confirmation,
}

/// Real-time notifications pushed to every connected subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A dose left the carousel.
    DispenseSuccess {
        schedule_id: String,
        compartment: u8,
        pill_name: String,
        timestamp: String,
    },

    /// A dispense request was rejected or the actuators failed.
    DispenseFailed {
        schedule_id: String,
        compartment: i64,
        reason: String,
        timestamp: String,
    },

    /// The emergency button was pressed.
    Emergency { timestamp: String },
}

impl Notification {
    pub fn dispense_success(event: &DispenseEvent) -> Self {
        Self::DispenseSuccess {
            schedule_id: event.schedule_id.clone(),
            compartment: event.compartment,
            pill_name: event.pill_name.clone(),
            timestamp: format_timestamp(event.timestamp),
        }
    }

    /// Wire name of the event, as in the `"event"` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DispenseSuccess { .. } => "dispense_success",
            Self::DispenseFailed { .. } => "dispense_failed",
            Self::Emergency { .. } => "emergency",
        }
    }

    /// JSON text for line-oriented transports.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"event\":\"{}\"}}", self.name()))
    }
}
