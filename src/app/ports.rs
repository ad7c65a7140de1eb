//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator / Pipeline (domain)
//! ```
//!
//! Driven adapters (servos, notification fan-out, clock, config file)
//! implement these traits.  The domain core holds them as trait objects
//! selected once at startup, so it never touches hardware directly and
//! runs unchanged against the mocks in `tests/integration/mock_hw.rs`.

use chrono::{DateTime, Utc};

use crate::app::events::{Confirmation, DispenseEvent, Notification};
use crate::config::SystemConfig;
use crate::error::HardwareError;
use crate::sequencer::Compartment;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the two servo outputs.
///
/// Two variants exist: the real servo pair and the degraded-mode stub.
/// Positions are normalized to [-1.0, 1.0].  Implementations only move;
/// hold durations and ordering belong to the
/// [`ActuatorSequencer`](crate::sequencer::ActuatorSequencer).
pub trait ActuatorPort: Send {
    /// Drive the carousel servo to `position`.
    fn rotate(&mut self, position: f32) -> Result<(), HardwareError>;

    /// Remove drive from the carousel servo (no holding torque).
    fn release_rotation(&mut self) -> Result<(), HardwareError>;

    /// Drive the gate servo to `position`.
    fn move_gate(&mut self, position: f32) -> Result<(), HardwareError>;

    /// Remove drive from the gate servo.
    fn release_gate(&mut self) -> Result<(), HardwareError>;

    /// `true` for the degraded-mode stub.
    fn is_simulated(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: domain → real-time transport)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget fan-out of [`Notification`]s to real-time subscribers.
///
/// Must never block and never fail: with no subscriber connected the
/// notification is simply lost.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, notification: &Notification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for &S {
    fn emit(&self, notification: &Notification) {
        (**self).emit(notification);
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for daily triggers and event timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Dispense confirmation / follow-up hooks
// ───────────────────────────────────────────────────────────────

/// Post-actuation check that a pill actually left the carousel.
///
/// The stock unit has no detector; [`AssumeDispensed`] reports
/// [`Confirmation::Assumed`].  A camera or break-beam adapter replaces it.
pub trait ConfirmationPort: Send + Sync {
    fn confirm(&self, compartment: Compartment) -> Confirmation;
}

/// Default confirmation: no sensor, the dose is assumed dispensed.
pub struct AssumeDispensed;

impl ConfirmationPort for AssumeDispensed {
    fn confirm(&self, _compartment: Compartment) -> Confirmation {
        Confirmation::Assumed
    }
}

/// Hook run after every dispense event.  Reserved for missed-dose
/// guardian alerting, whose trigger condition is not defined yet.
pub trait DoseFollowUp: Send + Sync {
    fn after_dispense(&self, event: &DispenseEvent);
}

/// Default follow-up: nothing.
pub struct NoFollowUp;

impl DoseFollowUp for NoFollowUp {
    fn after_dispense(&self, _event: &DispenseEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the orchestrator)
// ───────────────────────────────────────────────────────────────

/// Callback the [`JobScheduler`](crate::scheduler::JobScheduler) invokes
/// when a job's daily trigger fires.
///
/// The scheduler knows nothing about actuators or notifications; `main`
/// wires this to
/// [`trigger_dispense`](crate::app::dispense::DispenseOrchestrator::trigger_dispense).
pub trait DispenseTrigger: Send + Sync {
    fn fire(&self, schedule_id: &str, compartment: u8, pill_name: &str);
}

impl<F> DispenseTrigger for F
where
    F: Fn(&str, u8, &str) + Send + Sync,
{
    fn fire(&self, schedule_id: &str, compartment: u8, pill_name: &str) {
        self(schedule_id, compartment, pill_name);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads system configuration.
///
/// Implementations MUST validate before returning; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed to parse.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError(std::io::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
