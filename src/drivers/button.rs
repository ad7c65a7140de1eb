//! Emergency button edge detector.
//!
//! ## Hardware
//!
//! Active-low momentary switch to GND with a pull-up.  The watcher thread
//! samples the pin at a fixed interval and raises one
//! [`EmergencyEvent`] per released→pressed edge.  Debouncing is done in
//! hardware (RC filter); this driver only detects edges.
//!
//! The watcher never blocks on the consumer: if the emergency queue is
//! full the press is dropped with a warning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::app::ports::Clock;
use crate::error::HardwareError;
use crate::events::{EmergencyEvent, EmergencyQueue};

pub struct ButtonWatcher<I> {
    pin: I,
    was_pressed: bool,
}

impl<I: InputPin> ButtonWatcher<I> {
    pub fn new(pin: I) -> Self {
        Self {
            pin,
            was_pressed: false,
        }
    }

    /// Sample the pin once.  Returns `true` on a press edge.
    pub fn poll(&mut self) -> Result<bool, HardwareError> {
        let pressed = self
            .pin
            .is_low()
            .map_err(|_| HardwareError::GpioReadFailed)?;
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        Ok(edge)
    }
}

impl<I: InputPin + Send + 'static> ButtonWatcher<I> {
    /// Run the sampling loop on its own thread until `stop` is set.
    pub fn spawn(
        mut self,
        interval: Duration,
        queue: &'static EmergencyQueue,
        clock: Arc<dyn Clock>,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("button".into())
            .spawn(move || {
                info!("Button: watcher running ({}ms)", interval.as_millis());
                let mut read_failing = false;
                while !stop.load(Ordering::Relaxed) {
                    match self.poll() {
                        Ok(true) => {
                            warn!("Button: EMERGENCY BUTTON PRESSED");
                            let event = EmergencyEvent {
                                timestamp: clock.now(),
                            };
                            if !queue.raise(event) {
                                warn!("Button: emergency queue full, press dropped");
                            }
                            read_failing = false;
                        }
                        Ok(false) => read_failing = false,
                        Err(e) => {
                            if !read_failing {
                                warn!("Button: {}", e);
                            }
                            read_failing = true;
                        }
                    }
                    thread::sleep(interval);
                }
                info!("Button: watcher stopped");
            })
    }
}
