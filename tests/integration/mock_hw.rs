//! Mock adapters for integration tests.
//!
//! Records every actuator call, notification, and modem write so tests
//! can assert on the full history without touching real hardware.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use amar::app::events::Notification;
use amar::app::ports::{ActuatorPort, Clock, NotificationSink};
use amar::config::{CarouselConfig, ModemConfig};
use amar::error::HardwareError;
use amar::modem::SerialLink;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    Rotate(f32),
    ReleaseRotation,
    Gate(f32),
    ReleaseGate,
}

#[derive(Debug, Clone, Copy)]
pub struct Stamped {
    pub call: ActuatorCall,
    pub at: Instant,
}

// ── MockActuators ─────────────────────────────────────────────

/// Shared call log; clone it before boxing the actuators.
pub type CallLog = Arc<Mutex<Vec<Stamped>>>;

pub struct MockActuators {
    log: CallLog,
    /// Fail the n-th call (0-based) with a PWM error.
    fail_at: Option<usize>,
}

#[allow(dead_code)]
impl MockActuators {
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                log: Arc::clone(&log),
                fail_at: None,
            },
            log,
        )
    }

    pub fn failing_at(n: usize) -> (Self, CallLog) {
        let (mut hw, log) = Self::new();
        hw.fail_at = Some(n);
        (hw, log)
    }

    fn record(&mut self, call: ActuatorCall) -> Result<(), HardwareError> {
        let mut log = self.log.lock().unwrap();
        let index = log.len();
        log.push(Stamped {
            call,
            at: Instant::now(),
        });
        if self.fail_at == Some(index) {
            return Err(HardwareError::PwmWriteFailed);
        }
        Ok(())
    }
}

impl ActuatorPort for MockActuators {
    fn rotate(&mut self, position: f32) -> Result<(), HardwareError> {
        self.record(ActuatorCall::Rotate(position))
    }

    fn release_rotation(&mut self) -> Result<(), HardwareError> {
        self.record(ActuatorCall::ReleaseRotation)
    }

    fn move_gate(&mut self, position: f32) -> Result<(), HardwareError> {
        self.record(ActuatorCall::Gate(position))
    }

    fn release_gate(&mut self) -> Result<(), HardwareError> {
        self.record(ActuatorCall::ReleaseGate)
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

pub fn calls(log: &CallLog) -> Vec<ActuatorCall> {
    log.lock().unwrap().iter().map(|s| s.call).collect()
}

/// Carousel timing shortened for tests; positions unchanged.
pub fn quick_carousel() -> CarouselConfig {
    CarouselConfig {
        settle_ms: 15,
        gate_hold_ms: 10,
        home_settle_ms: 1,
        ..CarouselConfig::default()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(Notification::name).collect()
    }

    /// Wait until `n` notifications arrived or `timeout` passed.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> Vec<Notification> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.sent.lock().unwrap().len() >= n {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.sent()
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}

// ── ManualClock ───────────────────────────────────────────────

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(h: u32, m: u32, s: u32) -> Self {
        Self {
            now: Mutex::new(utc(h, m, s)),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// 2026-03-14 at the given UTC time of day.
pub fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
}

// ── ScriptedLink ──────────────────────────────────────────────

/// Fake modem: every CRLF-terminated write pops the next canned reply.
pub struct ScriptedLink {
    replies: VecDeque<&'static [u8]>,
    inbox: VecDeque<u8>,
    written: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl ScriptedLink {
    pub fn new(replies: &[&'static [u8]]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                replies: replies.iter().copied().collect(),
                inbox: VecDeque::new(),
                written: Arc::clone(&written),
            },
            written,
        )
    }
}

impl SerialLink for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inbox.is_empty() {
            thread::sleep(Duration::from_millis(2));
            return Ok(0);
        }
        let n = buf.len().min(self.inbox.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbox.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.lock().unwrap().extend_from_slice(data);
        if data.ends_with(b"\r\n") {
            if let Some(reply) = self.replies.pop_front() {
                self.inbox.extend(reply.iter().copied());
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Modem timing shortened for tests.
pub fn quick_modem() -> ModemConfig {
    ModemConfig {
        command_timeout_ms: 100,
        submit_timeout_ms: 100,
        body_settle_ms: 1,
        ..ModemConfig::default()
    }
}

/// Written bytes as text, one command per line.
pub fn wire_text(written: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&written.lock().unwrap()).into_owned()
}
