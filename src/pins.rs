//! Pin and peripheral assignments for the AMAR carrier board (Raspberry Pi).
//!
//! Single source of truth for the wiring defaults.
//! [`SystemConfig`](crate::config::SystemConfig) starts from these values;
//! a config file may override them for a differently wired unit.

// ---------------------------------------------------------------------------
// Carousel rotation servo (continuous-position, normalized -1.0 .. 1.0)
// ---------------------------------------------------------------------------

/// sysfs PWM chip exposing both servo channels.
pub const SERVO_PWM_CHIP: u32 = 0;
/// PWM channel for the carousel servo (GPIO 18 / PWM0 on the Pi header).
pub const ROTATION_SERVO_PWM_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// Dispense gate servo
// ---------------------------------------------------------------------------

/// PWM channel for the gate servo (GPIO 19 / PWM1 on the Pi header).
pub const GATE_SERVO_PWM_CHANNEL: u32 = 1;

// ---------------------------------------------------------------------------
// Servo timing (standard hobby servo)
// ---------------------------------------------------------------------------

/// PWM period: 50 Hz.
pub const SERVO_PERIOD_NS: u32 = 20_000_000;
/// Pulse width at value -1.0.
pub const SERVO_MIN_PULSE_NS: u32 = 1_000_000;
/// Pulse width at value +1.0.
pub const SERVO_MAX_PULSE_NS: u32 = 2_000_000;

// ---------------------------------------------------------------------------
// Emergency button (active-low, internal pull-up, switch to GND)
// ---------------------------------------------------------------------------

pub const EMERGENCY_BUTTON_GPIO: u32 = 2;

// ---------------------------------------------------------------------------
// GSM modem UART (SIM800L / SIM900)
// ---------------------------------------------------------------------------

/// GPIO UART on the Pi header.  Use `/dev/ttyUSB0` for USB adapters.
pub const MODEM_SERIAL_PORT: &str = "/dev/ttyS0";
pub const MODEM_BAUD_RATE: u32 = 9600;
