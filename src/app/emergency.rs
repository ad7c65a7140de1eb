//! Emergency escalation pipeline.
//!
//! The button watcher only enqueues an [`EmergencyEvent`]; this consumer
//! does the slow part on its own thread so modem latency never reaches
//! the button side.
//!
//! ```text
//!  button ──raise──▶ EmergencyQueue ──▶ consumer thread
//!                                         │ 1. emit `emergency`
//!                                         │ 2. send_sms(guardian)
//!                                         └ 3. make_call(guardian)
//! ```
//!
//! The call is placed even if the SMS failed.  Failures are logged only;
//! there is nobody to return them to.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use super::events::{Notification, format_timestamp};
use super::ports::NotificationSink;
use crate::config::EmergencyConfig;
use crate::events::{EmergencyEvent, EmergencyQueue};
use crate::modem::Modem;

/// What happened to each escalation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationReport {
    pub sms_sent: bool,
    pub call_placed: bool,
}

pub struct EmergencyPipeline {
    sink: Arc<dyn NotificationSink>,
    modem: Arc<Modem>,
    guardian_number: String,
    message: String,
}

impl EmergencyPipeline {
    pub fn new(sink: Arc<dyn NotificationSink>, modem: Arc<Modem>, cfg: &EmergencyConfig) -> Self {
        Self {
            sink,
            modem,
            guardian_number: cfg.guardian_number.clone(),
            message: cfg.message.clone(),
        }
    }

    pub fn handle(&self, event: &EmergencyEvent) -> EscalationReport {
        warn!("EMERGENCY: button pressed at {}", format_timestamp(event.timestamp));
        self.sink.emit(&Notification::Emergency {
            timestamp: format_timestamp(event.timestamp),
        });

        let sms_sent = match self.modem.send_sms(&self.guardian_number, &self.message) {
            Ok(()) => true,
            Err(e) => {
                error!("EMERGENCY: SMS to guardian failed: {} [{}]", e, self.modem.diagnostics());
                false
            }
        };
        let call_placed = match self.modem.make_call(&self.guardian_number) {
            Ok(()) => true,
            Err(e) => {
                error!("EMERGENCY: call to guardian failed: {} [{}]", e, self.modem.diagnostics());
                false
            }
        };

        info!("EMERGENCY: escalation done (sms: {}, call: {})", sms_sent, call_placed);
        EscalationReport {
            sms_sent,
            call_placed,
        }
    }

    /// Drain `queue` on a dedicated thread until the queue is closed.
    pub fn spawn_consumer(
        self: Arc<Self>,
        queue: &'static EmergencyQueue,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("emergency".into())
            .spawn(move || {
                while let Some(event) = queue.next_blocking() {
                    self.handle(&event);
                }
                info!("EMERGENCY: consumer stopped");
            })
    }
}
