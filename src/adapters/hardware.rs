//! Hardware adapters: the two variants behind [`ActuatorPort`].
//!
//! [`ServoActuators`] drives the real carousel and gate servos;
//! [`StubActuators`] is the degraded-mode stand-in chosen when the
//! servos fail to initialise, so the rest of the system keeps running on
//! hosts without PWM hardware.  The choice is made once, in
//! [`init_actuators`].

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, error, info, warn};

use crate::adapters::sysfs::SysfsPwm;
use crate::app::ports::ActuatorPort;
use crate::config::HardwareConfig;
use crate::drivers::servo::Servo;
use crate::error::HardwareError;

/// Carousel + gate servo pair.
pub struct ServoActuators<R, G> {
    rotation: Servo<R>,
    gate: Servo<G>,
}

impl<R, G> ServoActuators<R, G>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
{
    pub fn new(rotation: Servo<R>, gate: Servo<G>) -> Self {
        Self { rotation, gate }
    }
}

impl<R, G> ActuatorPort for ServoActuators<R, G>
where
    R: SetDutyCycle + Send,
    G: SetDutyCycle + Send,
{
    fn rotate(&mut self, position: f32) -> Result<(), HardwareError> {
        self.rotation.set_value(position)
    }

    fn release_rotation(&mut self) -> Result<(), HardwareError> {
        self.rotation.detach()
    }

    fn move_gate(&mut self, position: f32) -> Result<(), HardwareError> {
        self.gate.set_value(position)
    }

    fn release_gate(&mut self) -> Result<(), HardwareError> {
        self.gate.detach()
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// No-op actuators for degraded mode.  Every command succeeds.
pub struct StubActuators;

impl ActuatorPort for StubActuators {
    fn rotate(&mut self, position: f32) -> Result<(), HardwareError> {
        debug!("stub: rotate to {:+.2}", position);
        Ok(())
    }

    fn release_rotation(&mut self) -> Result<(), HardwareError> {
        debug!("stub: release rotation");
        Ok(())
    }

    fn move_gate(&mut self, position: f32) -> Result<(), HardwareError> {
        debug!("stub: gate to {:+.2}", position);
        Ok(())
    }

    fn release_gate(&mut self) -> Result<(), HardwareError> {
        debug!("stub: release gate");
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Open both servo channels, or fall back to [`StubActuators`].
pub fn init_actuators(cfg: &HardwareConfig) -> Box<dyn ActuatorPort> {
    let servo = |channel: u32| -> Result<Servo<SysfsPwm>, std::io::Error> {
        let pwm = SysfsPwm::open(cfg.pwm_chip, channel, cfg.servo_period_ns)?;
        Ok(Servo::new(
            pwm,
            cfg.servo_period_ns,
            cfg.servo_min_pulse_ns,
            cfg.servo_max_pulse_ns,
        ))
    };

    match servo(cfg.rotation_channel).and_then(|rotation| Ok((rotation, servo(cfg.gate_channel)?)))
    {
        Ok((rotation, gate)) => {
            info!("Hardware: servos ready on pwmchip{}", cfg.pwm_chip);
            Box::new(ServoActuators::new(rotation, gate))
        }
        Err(e) => {
            error!("Hardware: servo init failed: {}", e);
            warn!("Hardware: dispensing will run on stub actuators");
            Box::new(StubActuators)
        }
    }
}
