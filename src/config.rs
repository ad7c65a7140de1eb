//! System configuration parameters
//!
//! All tunable parameters for the AMAR controller.  Values come from
//! [`SystemConfig::default()`] and may be overridden by a JSON config
//! file (see [`JsonFileConfig`](crate::adapters::config_file::JsonFileConfig)).
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes.  The configuration is read once at startup and is immutable
//! afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;

/// Number of carousel compartments.
pub const COMPARTMENT_COUNT: usize = 7;

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub carousel: CarouselConfig,
    pub hardware: HardwareConfig,
    pub modem: ModemConfig,
    pub emergency: EmergencyConfig,
    pub scheduler: SchedulerConfig,
}

/// Carousel calibration and motion timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Servo position for compartments 1..=7, in [-1.0, 1.0].
    pub positions: [f32; COMPARTMENT_COUNT],
    pub gate_open: f32,
    pub gate_closed: f32,
    /// Hold after rotating before the rotation servo is detached.
    pub settle_ms: u64,
    /// Hold after each gate movement (open, then close).
    pub gate_hold_ms: u64,
    /// Hold after the startup homing move.
    pub home_settle_ms: u64,
}

/// Peripheral wiring for the Linux sysfs adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub pwm_chip: u32,
    pub rotation_channel: u32,
    pub gate_channel: u32,
    pub servo_period_ns: u32,
    pub servo_min_pulse_ns: u32,
    pub servo_max_pulse_ns: u32,
    pub button_gpio: u32,
    /// Button sampling interval for edge detection.
    pub button_poll_ms: u64,
}

/// GSM modem serial link and AT timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Longest single serial read.  An unterminated prompt is noticed
    /// once a read comes back empty after this long.
    pub read_timeout_ms: u64,
    /// Default per-transaction timeout.
    pub command_timeout_ms: u64,
    /// Timeout for the final SMS submission step.
    pub submit_timeout_ms: u64,
    /// Pause between the SMS body and the Ctrl-Z terminator.
    pub body_settle_ms: u64,
}

/// Guardian escalation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    pub guardian_number: String,
    pub message: String,
}

/// Daily trigger evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Offset of the wall clock the `HH:MM` triggers are written in.
    pub utc_offset_minutes: i32,
    /// Timing-loop wake interval.
    pub poll_interval_ms: u64,
    /// A trigger seen later than this is skipped, not backfilled.
    pub misfire_grace_secs: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            positions: [-1.0, -0.66, -0.33, 0.0, 0.33, 0.66, 1.0],
            gate_open: 0.0,
            gate_closed: -0.9,
            settle_ms: 1500,
            gate_hold_ms: 1000,
            home_settle_ms: 1000,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            pwm_chip: pins::SERVO_PWM_CHIP,
            rotation_channel: pins::ROTATION_SERVO_PWM_CHANNEL,
            gate_channel: pins::GATE_SERVO_PWM_CHANNEL,
            servo_period_ns: pins::SERVO_PERIOD_NS,
            servo_min_pulse_ns: pins::SERVO_MIN_PULSE_NS,
            servo_max_pulse_ns: pins::SERVO_MAX_PULSE_NS,
            button_gpio: pins::EMERGENCY_BUTTON_GPIO,
            button_poll_ms: 10,
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: pins::MODEM_SERIAL_PORT.to_owned(),
            baud_rate: pins::MODEM_BAUD_RATE,
            read_timeout_ms: 100,
            command_timeout_ms: 2000,
            submit_timeout_ms: 10_000,
            body_settle_ms: 100,
        }
    }
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            guardian_number: "+1234567890".to_owned(),
            message: "Emergency button on AMAR device has been pressed!".to_owned(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            poll_interval_ms: 500,
            misfire_grace_secs: 60,
        }
    }
}

impl CarouselConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn gate_hold(&self) -> Duration {
        Duration::from_millis(self.gate_hold_ms)
    }

    pub fn home_settle(&self) -> Duration {
        Duration::from_millis(self.home_settle_ms)
    }
}

impl ModemConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn body_settle(&self) -> Duration {
        Duration::from_millis(self.body_settle_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.carousel;
        let in_range = |v: f32| (-1.0..=1.0).contains(&v);
        if !c.positions.iter().all(|p| in_range(*p)) {
            return Err(ConfigError::ValidationFailed(
                "carousel.positions must lie within [-1.0, 1.0]",
            ));
        }
        if !in_range(c.gate_open) || !in_range(c.gate_closed) {
            return Err(ConfigError::ValidationFailed(
                "carousel gate positions must lie within [-1.0, 1.0]",
            ));
        }
        if c.settle_ms == 0 || c.gate_hold_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "carousel hold durations must be non-zero",
            ));
        }

        let h = &self.hardware;
        if h.servo_min_pulse_ns >= h.servo_max_pulse_ns || h.servo_max_pulse_ns > h.servo_period_ns
        {
            return Err(ConfigError::ValidationFailed(
                "servo pulse range must be ordered and fit inside the period",
            ));
        }
        if h.button_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("hardware.button_poll_ms must be non-zero"));
        }

        let m = &self.modem;
        if m.command_timeout_ms == 0 || m.submit_timeout_ms == 0 || m.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("modem timeouts must be non-zero"));
        }

        if !is_dialable(&self.emergency.guardian_number) {
            return Err(ConfigError::ValidationFailed(
                "emergency.guardian_number must be digits with an optional leading '+'",
            ));
        }

        let s = &self.scheduler;
        if s.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::ValidationFailed(
                "scheduler.utc_offset_minutes must be within one day",
            ));
        }
        if s.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("scheduler.poll_interval_ms must be non-zero"));
        }
        Ok(())
    }
}

/// `+` followed by digits, or digits alone.  Anything else could smuggle
/// extra AT syntax into `ATD`/`AT+CMGS`.
pub fn is_dialable(number: &str) -> bool {
    let digits = number.strip_prefix('+').unwrap_or(number);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
