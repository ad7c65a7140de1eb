//! Unified error types for the AMAR controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! request handlers and background loops uniform.  Nothing in here is
//! fatal to the process: hardware and link failures are reported to the
//! caller, and initialisation failures are turned into degraded mode by
//! `main`.

use core::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rejected request data.  Never retried.
    InvalidInput(InputError),
    /// An actuator or input pin could not be driven.
    Hardware(HardwareError),
    /// The GSM modem link failed or did not answer in time.
    Modem(ModemError),
    /// `remove_job` was asked for an id the scheduler does not hold.
    JobNotFound(String),
}

impl Error {
    /// Whether the caller may reasonably re-attempt the operation.
    ///
    /// Only protocol timeouts qualify; the core never retries by itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Modem(ModemError::ProtocolTimeout { .. }))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(e) => write!(f, "invalid input: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Modem(e) => write!(f, "modem: {e}"),
            Self::JobNotFound(id) => write!(f, "no job with id '{id}'"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The trigger time is not a valid 24-hour `HH:MM`.
    InvalidTimeFormat(String),
    /// Compartment index outside 1..=7.
    InvalidCompartment(i64),
    /// A required request field was absent.
    MissingField(&'static str),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeFormat(s) => write!(f, "invalid time '{s}', expected HH:MM"),
            Self::InvalidCompartment(c) => write!(f, "invalid compartment {c}, expected 1-7"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::InvalidInput(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// Peripheral initialisation failed; the tag names the peripheral.
    Unavailable(&'static str),
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO read failed.
    GpioReadFailed,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "{what} unavailable"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Modem errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemError {
    /// The serial port failed to open at startup.  Fails fast, nothing is written.
    LinkUnavailable,
    /// The expected token was not seen before the transaction timeout.
    ProtocolTimeout {
        command: String,
        expected: String,
        timeout: Duration,
    },
    /// The serial read or write itself failed.
    Io(String),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkUnavailable => write!(f, "serial link unavailable"),
            Self::ProtocolTimeout {
                command,
                expected,
                timeout,
            } => write!(
                f,
                "no '{expected}' within {}ms for '{command}'",
                timeout.as_millis()
            ),
            Self::Io(msg) => write!(f, "serial I/O: {msg}"),
        }
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
