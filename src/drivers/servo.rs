//! Hobby-servo driver over any `embedded-hal` PWM channel.
//!
//! Positions are normalized to [-1.0, 1.0] and mapped linearly onto the
//! pulse-width range (1.0–2.0 ms in a 20 ms period by default).
//!
//! ## Detach
//!
//! Writing a zero duty cycle stops the pulse train; the servo stops
//! holding position, which avoids jitter and heat while parked.  This
//! driver is a dumb actuator; hold times are the sequencer's business.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::HardwareError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoState {
    Detached,
    Holding(f32),
}

pub struct Servo<P> {
    pwm: P,
    period_ns: u32,
    min_pulse_ns: u32,
    max_pulse_ns: u32,
    state: ServoState,
}

impl<P: SetDutyCycle> Servo<P> {
    pub fn new(pwm: P, period_ns: u32, min_pulse_ns: u32, max_pulse_ns: u32) -> Self {
        Self {
            pwm,
            period_ns,
            min_pulse_ns,
            max_pulse_ns,
            state: ServoState::Detached,
        }
    }

    /// Drive to `value`; out-of-range values are clamped to the travel limits.
    pub fn set_value(&mut self, value: f32) -> Result<(), HardwareError> {
        let value = value.clamp(-1.0, 1.0);
        let duty = self.duty_for(value);
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|_| HardwareError::PwmWriteFailed)?;
        self.state = ServoState::Holding(value);
        Ok(())
    }

    pub fn detach(&mut self) -> Result<(), HardwareError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| HardwareError::PwmWriteFailed)?;
        self.state = ServoState::Detached;
        Ok(())
    }

    pub fn state(&self) -> ServoState {
        self.state
    }

    fn duty_for(&self, value: f32) -> u16 {
        let span = (self.max_pulse_ns - self.min_pulse_ns) as f32;
        let pulse_ns = self.min_pulse_ns as f32 + (value + 1.0) / 2.0 * span;
        let max_duty = f32::from(self.pwm.max_duty_cycle());
        (pulse_ns / self.period_ns as f32 * max_duty).round() as u16
    }
}
