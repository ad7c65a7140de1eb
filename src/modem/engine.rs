//! AT transaction engine.
//!
//! One transaction at a time:
//!
//! ```text
//!  Idle ──write cmd+CRLF──▶ Sending ──▶ AwaitingResponse ──┬──▶ Matched
//!                                          ▲      │         │
//!                                          └─read─┘         └──▶ TimedOut
//! ```
//!
//! Every line read while awaiting is appended to a bounded diagnostic
//! buffer.  Only a clean (non-garbled) line containing the expected
//! token completes the transaction.  An unterminated fragment completes
//! it only when the link is idle and the fragment already holds the
//! token (the SMS `>` prompt); otherwise it stays pending.
//!
//! Each read waits at most the time left before the deadline, so a
//! timeout lands within one read of a link that honours
//! [`SerialLink::limit_read_wait`].

use std::io;
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::codec::{LineDecoder, ResponseLine};
use super::link::SerialLink;
use crate::error::ModemError;

/// Capacity of the per-transaction diagnostic buffer.
pub const DIAG_CAPACITY: usize = 512;

const READ_CHUNK: usize = 64;

/// One command/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtTransaction {
    pub command: String,
    pub expected_token: String,
    pub timeout: Duration,
}

impl AtTransaction {
    pub fn new(command: impl Into<String>, expected_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            expected_token: expected_token.into(),
            timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Sending,
    AwaitingResponse,
    Matched,
    TimedOut,
}

pub struct ModemEngine {
    link: Box<dyn SerialLink>,
    decoder: LineDecoder,
    diagnostics: heapless::String<DIAG_CAPACITY>,
    state: TransactionState,
}

impl ModemEngine {
    pub fn new(link: Box<dyn SerialLink>) -> Self {
        Self {
            link,
            decoder: LineDecoder::new(),
            diagnostics: heapless::String::new(),
            state: TransactionState::Idle,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Response text of the most recent transaction, lines joined by `|`.
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }

    /// Run one transaction to completion.
    pub fn send_transaction(&mut self, tx: &AtTransaction) -> Result<(), ModemError> {
        self.diagnostics.clear();
        self.decoder.reset();

        self.state = TransactionState::Sending;
        let mut frame = Vec::with_capacity(tx.command.len() + 2);
        frame.extend_from_slice(tx.command.as_bytes());
        frame.extend_from_slice(b"\r\n");
        if let Err(e) = self.write_raw(&frame) {
            self.state = TransactionState::Idle;
            return Err(e);
        }
        debug!("Modem: > {:?}", tx.command);

        self.state = TransactionState::AwaitingResponse;
        let started = Instant::now();
        let mut buf = [0u8; READ_CHUNK];
        let mut lines = Vec::new();

        loop {
            let remaining = tx.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            let read = self
                .link
                .limit_read_wait(remaining)
                .and_then(|()| self.link.read(&mut buf));
            let n = match read {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
                Err(e) => {
                    self.state = TransactionState::Idle;
                    return Err(ModemError::Io(e.to_string()));
                }
            };

            if n > 0 {
                self.decoder.feed(&buf[..n], &mut lines);
            } else if self.decoder.peek_matches(&tx.expected_token) {
                // Unterminated prompt; anything else waits for its CRLF.
                lines.extend(self.decoder.flush());
            }

            for line in lines.drain(..) {
                if self.record(&line, &tx.expected_token) {
                    self.state = TransactionState::Matched;
                    return Ok(());
                }
            }
        }

        // Keep the trailing fragment for diagnostics only.
        if let Some(line) = self.decoder.flush() {
            let _ = self.record(&line, &tx.expected_token);
        }
        self.state = TransactionState::TimedOut;
        Err(ModemError::ProtocolTimeout {
            command: tx.command.clone(),
            expected: tx.expected_token.clone(),
            timeout: tx.timeout,
        })
    }

    /// Write bytes outside any transaction (SMS body, terminator).
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), ModemError> {
        self.link
            .write_all(data)
            .and_then(|()| self.link.flush())
            .map_err(|e| ModemError::Io(e.to_string()))
    }

    /// Log `line` into the diagnostic buffer; `true` on a match.
    fn record(&mut self, line: &ResponseLine, expected: &str) -> bool {
        trace!("Modem: < {:?}{}", line.text, if line.garbled { " (garbled)" } else { "" });
        if !self.diagnostics.is_empty() {
            let _ = self.diagnostics.push('|');
        }
        // A full buffer keeps its head; the tail is the least useful part.
        for c in line.text.chars() {
            if self.diagnostics.push(c).is_err() {
                break;
            }
        }
        line.matches(expected)
    }
}
