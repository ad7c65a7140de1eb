//! GSM modem protocol engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Modem                            │
//! │                                                          │
//! │  send_sms / make_call / hang_up / self_check             │
//! │           │  (lock held for the whole operation)         │
//! │           ▼                                              │
//! │  ┌──────────────┐   ┌─────────────┐   ┌───────────────┐  │
//! │  │ ModemEngine  │──▶│ LineDecoder │◀──│  SerialLink   │  │
//! │  │ (transaction)│   │ (CRLF/idle) │   │  (trait)      │  │
//! │  └──────────────┘   └─────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The serial link is exclusive: composite operations take the engine
//! lock once and run every step under it, so an SMS and a call from
//! different threads never interleave on the wire.  When the link failed
//! to open, every operation fails with [`ModemError::LinkUnavailable`]
//! without touching anything.

pub mod codec;
pub mod engine;
pub mod link;

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::ModemConfig;
use crate::error::ModemError;

pub use engine::{AtTransaction, ModemEngine, TransactionState};
pub use link::SerialLink;

/// Ctrl-Z, ends an SMS body.
const SMS_TERMINATOR: u8 = 26;

#[derive(Debug, Clone, Copy)]
struct Timing {
    command: Duration,
    submit: Duration,
    body_settle: Duration,
}

/// Shared handle to the modem.  Cheap to put behind an `Arc`.
pub struct Modem {
    engine: Option<Mutex<ModemEngine>>,
    timing: Timing,
}

impl Modem {
    pub fn new(link: Box<dyn SerialLink>, cfg: &ModemConfig) -> Self {
        Self {
            engine: Some(Mutex::new(ModemEngine::new(link))),
            timing: Timing::from(cfg),
        }
    }

    /// A modem whose link never opened.
    pub fn unavailable(cfg: &ModemConfig) -> Self {
        Self {
            engine: None,
            timing: Timing::from(cfg),
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn session(&self) -> Result<MutexGuard<'_, ModemEngine>, ModemError> {
        let engine = self.engine.as_ref().ok_or(ModemError::LinkUnavailable)?;
        // A panic mid-transaction leaves nothing half-written that a new
        // transaction would not reset.
        Ok(engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// One standalone transaction.
    pub fn send_transaction(
        &self,
        command: &str,
        expected_token: &str,
        timeout: Duration,
    ) -> Result<(), ModemError> {
        let mut engine = self.session()?;
        engine.send_transaction(&AtTransaction::new(command, expected_token, timeout))
    }

    /// Disable echo and check the link answers.  Failures only log.
    pub fn self_check(&self) {
        let mut engine = match self.session() {
            Ok(engine) => engine,
            Err(e) => {
                warn!("Modem: self-check skipped: {}", e);
                return;
            }
        };
        for command in ["ATE0", "AT"] {
            let tx = AtTransaction::new(command, "OK", self.timing.command);
            match engine.send_transaction(&tx) {
                Ok(()) => info!("Modem: {} ok", command),
                Err(e) => warn!("Modem: self-check {} failed: {} [{}]", command, e, engine.diagnostics()),
            }
        }
    }

    /// Text mode, address, body + Ctrl-Z, then wait for submission.
    /// The first failing step aborts the rest.
    pub fn send_sms(&self, number: &str, body: &str) -> Result<(), ModemError> {
        let mut engine = self.session()?;
        let t = self.timing;

        engine.send_transaction(&AtTransaction::new("AT+CMGF=1", "OK", t.command))?;
        engine.send_transaction(&AtTransaction::new(
            format!("AT+CMGS=\"{number}\""),
            ">",
            t.command,
        ))?;
        engine.write_raw(body.as_bytes())?;
        thread::sleep(t.body_settle);
        engine.write_raw(&[SMS_TERMINATOR])?;
        engine.send_transaction(&AtTransaction::new("", "OK", t.submit))?;

        info!("Modem: SMS submitted to {}", number);
        Ok(())
    }

    /// Dial `number` as a voice call.  Success means the modem accepted
    /// the dial command, not that anyone answered.
    pub fn make_call(&self, number: &str) -> Result<(), ModemError> {
        let mut engine = self.session()?;
        engine.send_transaction(&AtTransaction::new(
            format!("ATD{number};"),
            "OK",
            self.timing.command,
        ))?;
        info!("Modem: dialing {}", number);
        Ok(())
    }

    pub fn hang_up(&self) -> Result<(), ModemError> {
        let mut engine = self.session()?;
        engine.send_transaction(&AtTransaction::new("ATH", "OK", self.timing.command))
    }

    /// Response lines of the last transaction, for logs.
    pub fn diagnostics(&self) -> String {
        match self.session() {
            Ok(engine) => engine.diagnostics().to_owned(),
            Err(_) => String::new(),
        }
    }
}

impl From<&ModemConfig> for Timing {
    fn from(cfg: &ModemConfig) -> Self {
        Self {
            command: cfg.command_timeout(),
            submit: cfg.submit_timeout(),
            body_settle: cfg.body_settle(),
        }
    }
}
