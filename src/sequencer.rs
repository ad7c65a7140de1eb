//! Actuator sequencer: compartment index in, rotate/open/close motion out.
//!
//! Owns exclusive access to the two servo outputs.  Every dispense runs
//! the full sequence under the actuation lock:
//!
//! ```text
//!  lock ─▶ rotate ─▶ settle ─▶ detach ─▶ gate open ─▶ hold ─▶ gate closed ─▶ hold ─▶ detach ─▶ unlock
//! ```
//!
//! The lock is first-come-first-served and has no timeout: a stuck
//! actuation blocks every later dispense.  Steps use fixed hold
//! durations, not polled completion, and cannot be cancelled once started.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::{COMPARTMENT_COUNT, CarouselConfig};
use crate::error::{HardwareError, InputError, Result};

// ═══════════════════════════════════════════════════════════════
//  Compartment
// ═══════════════════════════════════════════════════════════════

/// A validated carousel compartment index (1..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Compartment(u8);

impl Compartment {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = COMPARTMENT_COUNT as u8;

    pub fn new(index: i64) -> core::result::Result<Self, InputError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(InputError::InvalidCompartment(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    fn slot(self) -> usize {
        usize::from(self.0 - Self::MIN)
    }
}

impl TryFrom<i64> for Compartment {
    type Error = InputError;

    fn try_from(index: i64) -> core::result::Result<Self, InputError> {
        Self::new(index)
    }
}

impl core::fmt::Display for Compartment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  FIFO lock
// ═══════════════════════════════════════════════════════════════

/// Ticket lock: waiters are admitted strictly in arrival order.
///
/// `std::sync::Mutex` makes no fairness promise, so the turn order is
/// kept here and the inner mutex is only ever taken by the ticket holder.
struct FifoLock<T> {
    tickets: Mutex<Tickets>,
    turn: Condvar,
    value: Mutex<T>,
}

struct Tickets {
    next: u64,
    serving: u64,
}

struct FifoGuard<'a, T> {
    value: Option<MutexGuard<'a, T>>,
    lock: &'a FifoLock<T>,
}

impl<T> FifoLock<T> {
    fn new(value: T) -> Self {
        Self {
            tickets: Mutex::new(Tickets { next: 0, serving: 0 }),
            turn: Condvar::new(),
            value: Mutex::new(value),
        }
    }

    fn lock(&self) -> FifoGuard<'_, T> {
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            tickets = self
                .turn
                .wait(tickets)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(tickets);
        FifoGuard {
            value: Some(self.value.lock().unwrap_or_else(PoisonError::into_inner)),
            lock: self,
        }
    }
}

impl<T> core::ops::Deref for FifoGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only taken in Drop.
        self.value.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> core::ops::DerefMut for FifoGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for FifoGuard<'_, T> {
    fn drop(&mut self) {
        self.value.take();
        let mut tickets = self
            .lock
            .tickets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tickets.serving += 1;
        self.lock.turn.notify_all();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Sequencer
// ═══════════════════════════════════════════════════════════════

/// Timing record of one completed actuation.
#[derive(Debug, Clone, Copy)]
pub struct Actuation {
    pub compartment: Compartment,
    /// Lock acquired, first motion about to start.
    pub started_at: Instant,
    /// Last motion finished, lock about to be released.
    pub finished_at: Instant,
    /// Produced by the degraded-mode stub.
    pub simulated: bool,
}

/// Serializes physical dispense sequences over an [`ActuatorPort`].
pub struct ActuatorSequencer {
    actuators: FifoLock<Box<dyn ActuatorPort>>,
    simulated: bool,
    positions: [f32; COMPARTMENT_COUNT],
    gate_open: f32,
    gate_closed: f32,
    settle: Duration,
    gate_hold: Duration,
    home_settle: Duration,
}

impl ActuatorSequencer {
    pub fn new(actuators: Box<dyn ActuatorPort>, config: &CarouselConfig) -> Self {
        let simulated = actuators.is_simulated();
        if simulated {
            warn!("Sequencer: running on stub actuators (no hardware)");
        }
        Self {
            actuators: FifoLock::new(actuators),
            simulated,
            positions: config.positions,
            gate_open: config.gate_open,
            gate_closed: config.gate_closed,
            settle: config.settle(),
            gate_hold: config.gate_hold(),
            home_settle: config.home_settle(),
        }
    }

    /// Whether the sequencer is in degraded (stub) mode.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Calibrated servo position for a compartment.
    pub fn position_of(&self, compartment: Compartment) -> f32 {
        self.positions[compartment.slot()]
    }

    /// Startup homing: gate closed, carousel to its minimum, hold, detach.
    pub fn home(&self) -> Result<()> {
        let mut hw = self.actuators.lock();
        info!("Sequencer: homing carousel");
        hw.move_gate(self.gate_closed)?;
        hw.rotate(-1.0)?;
        thread::sleep(self.home_settle);
        hw.release_rotation()?;
        hw.release_gate()?;
        Ok(())
    }

    /// Run one full dispense sequence for `compartment`.
    ///
    /// An index outside 1..=7 is rejected before the lock is taken, so
    /// no actuator moves.  Callers block until their turn; turns are
    /// granted in arrival order.
    pub fn dispense(&self, compartment: i64) -> Result<Actuation> {
        let compartment = Compartment::new(compartment).inspect_err(|e| {
            error!("Sequencer: {}", e);
        })?;
        let target = self.position_of(compartment);

        let mut hw = self.actuators.lock();
        let started_at = Instant::now();
        info!("Sequencer: dispense cycle for compartment {} started", compartment);

        if let Err(e) = self.run_cycle(&mut **hw, compartment, target) {
            error!("Sequencer: cycle for compartment {} failed: {}", compartment, e);
            Self::fail_safe(&mut **hw, self.gate_closed);
            return Err(e.into());
        }

        let finished_at = Instant::now();
        drop(hw);
        info!("Sequencer: dispense cycle for compartment {} finished", compartment);
        Ok(Actuation {
            compartment,
            started_at,
            finished_at,
            simulated: self.simulated,
        })
    }

    /// Detach both servos.  Called on shutdown; waits for any running cycle.
    pub fn release(&self) {
        let mut hw = self.actuators.lock();
        if let Err(e) = hw.release_rotation().and_then(|()| hw.release_gate()) {
            warn!("Sequencer: release failed: {}", e);
        }
        info!("Sequencer: servos released");
    }

    fn run_cycle(
        &self,
        hw: &mut dyn ActuatorPort,
        compartment: Compartment,
        target: f32,
    ) -> core::result::Result<(), HardwareError> {
        info!("Sequencer: rotating to compartment {} ({:+.2})", compartment, target);
        hw.rotate(target)?;
        thread::sleep(self.settle);
        hw.release_rotation()?;

        info!("Sequencer: opening gate");
        hw.move_gate(self.gate_open)?;
        thread::sleep(self.gate_hold);

        info!("Sequencer: closing gate");
        hw.move_gate(self.gate_closed)?;
        thread::sleep(self.gate_hold);
        hw.release_gate()
    }

    /// Best effort after a failed step: gate shut, no torque.
    fn fail_safe(hw: &mut dyn ActuatorPort, gate_closed: f32) {
        let _ = hw.move_gate(gate_closed);
        let _ = hw.release_gate();
        let _ = hw.release_rotation();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
