//! Linux sysfs peripheral adapters.
//!
//! - [`SysfsPwm`]: one channel of `/sys/class/pwm/pwmchipN`, exposed as
//!   an `embedded-hal` [`SetDutyCycle`].
//! - [`SysfsInput`]: one line of `/sys/class/gpio`, exposed as an
//!   `embedded-hal` [`InputPin`].
//!
//! Exporting a channel can take a moment before udev fixes the
//! permissions, so `open` waits briefly for the attribute files.
//! Pull-ups are not configurable through sysfs; set them in the
//! firmware config (`gpio=2=ip,pu`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use embedded_hal::{digital, pwm};
use log::info;

const PWM_ROOT: &str = "/sys/class/pwm";
const GPIO_ROOT: &str = "/sys/class/gpio";

/// Attempts × interval spent waiting for an exported node to appear.
const EXPORT_WAIT_ATTEMPTS: u32 = 20;
const EXPORT_WAIT_INTERVAL: Duration = Duration::from_millis(50);

/// I/O failure on a sysfs attribute.
#[derive(Debug)]
pub struct SysfsError(pub io::Error);

impl core::fmt::Display for SysfsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sysfs: {}", self.0)
    }
}

impl std::error::Error for SysfsError {}

impl From<io::Error> for SysfsError {
    fn from(e: io::Error) -> Self {
        Self(e)
    }
}

impl pwm::Error for SysfsError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

impl digital::Error for SysfsError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

fn write_attr(path: &Path, value: impl core::fmt::Display) -> io::Result<()> {
    fs::write(path, value.to_string())
}

/// Export `index` through `export_file` unless `node` already exists,
/// then wait for `ready` to become writable.
fn export(export_file: &Path, index: u32, node: &Path, ready: &Path) -> io::Result<()> {
    if !node.exists() {
        write_attr(export_file, index)?;
    }
    for _ in 0..EXPORT_WAIT_ATTEMPTS {
        if fs::OpenOptions::new().write(true).open(ready).is_ok() {
            return Ok(());
        }
        thread::sleep(EXPORT_WAIT_INTERVAL);
    }
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("{} not writable after export", ready.display()),
    ))
}

// ═══════════════════════════════════════════════════════════════
//  PWM
// ═══════════════════════════════════════════════════════════════

pub struct SysfsPwm {
    duty_cycle: PathBuf,
    period_ns: u32,
}

impl SysfsPwm {
    /// Export, configure `period_ns`, start at zero duty and enable.
    pub fn open(chip: u32, channel: u32, period_ns: u32) -> io::Result<Self> {
        let chip_dir = Path::new(PWM_ROOT).join(format!("pwmchip{chip}"));
        let node = chip_dir.join(format!("pwm{channel}"));
        let period = node.join("period");
        export(&chip_dir.join("export"), channel, &node, &period)?;

        let duty_cycle = node.join("duty_cycle");
        // duty_cycle must never exceed period, so zero it first.
        write_attr(&duty_cycle, 0)?;
        write_attr(&period, period_ns)?;
        write_attr(&node.join("enable"), 1)?;
        info!("sysfs: pwmchip{}/pwm{} enabled ({}ns)", chip, channel, period_ns);
        Ok(Self {
            duty_cycle,
            period_ns,
        })
    }
}

impl pwm::ErrorType for SysfsPwm {
    type Error = SysfsError;
}

impl pwm::SetDutyCycle for SysfsPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), SysfsError> {
        let ns = u64::from(self.period_ns) * u64::from(duty) / u64::from(u16::MAX);
        write_attr(&self.duty_cycle, ns)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  GPIO input
// ═══════════════════════════════════════════════════════════════

pub struct SysfsInput {
    value: PathBuf,
}

impl SysfsInput {
    pub fn open(gpio: u32) -> io::Result<Self> {
        let root = Path::new(GPIO_ROOT);
        let node = root.join(format!("gpio{gpio}"));
        let direction = node.join("direction");
        export(&root.join("export"), gpio, &node, &direction)?;
        write_attr(&direction, "in")?;
        info!("sysfs: gpio{} configured as input", gpio);
        Ok(Self {
            value: node.join("value"),
        })
    }
}

impl digital::ErrorType for SysfsInput {
    type Error = SysfsError;
}

impl digital::InputPin for SysfsInput {
    fn is_high(&mut self) -> Result<bool, SysfsError> {
        let raw = fs::read(&self.value)?;
        Ok(raw.first() == Some(&b'1'))
    }

    fn is_low(&mut self) -> Result<bool, SysfsError> {
        Ok(!self.is_high()?)
    }
}
