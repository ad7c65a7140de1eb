//! Line decoder for modem responses.
//!
//! The modem answers in CRLF-terminated lines, except for the SMS body
//! prompt (`> `), which is sent with no terminator at all.  The decoder
//! yields complete lines as they arrive.  When the link goes idle the
//! engine may peek at the pending fragment; the bytes stay pending, so a
//! line split by a pause still completes as one line.
//!
//! ```text
//!  bytes ──▶ [ pending (heapless, 256 B) ] ──'\n'──▶ ResponseLine
//!                       │
//!                       └──── idle peek (not consumed)
//! ```
//!
//! A line that overflowed the buffer or held invalid UTF-8 is marked
//! garbled.  Its lossy text is still reported for diagnostics.

use heapless::Vec;

/// Longest response line kept intact.
pub const MAX_LINE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// Trimmed text with undecodable bytes removed.
    pub text: String,
    pub garbled: bool,
}

impl ResponseLine {
    /// Whether this line satisfies a wait for `token`.
    pub fn matches(&self, token: &str) -> bool {
        !self.garbled && self.text.contains(token)
    }
}

pub struct LineDecoder {
    pending: Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed raw bytes, appending every completed line to `out`.
    pub fn feed(&mut self, data: &[u8], out: &mut std::vec::Vec<ResponseLine>) {
        for &b in data {
            match b {
                b'\n' => out.extend(self.take()),
                b'\r' => {}
                _ => {
                    if self.pending.push(b).is_err() {
                        self.overflowed = true;
                    }
                }
            }
        }
    }

    /// Whether the unterminated fragment already satisfies `token`.
    /// Leaves the fragment pending.
    pub fn peek_matches(&self, token: &str) -> bool {
        self.decode().is_some_and(|line| line.matches(token))
    }

    /// Hand back the unterminated fragment, if any.
    pub fn flush(&mut self) -> Option<ResponseLine> {
        self.take()
    }

    /// Drop any pending bytes (start of a new transaction).
    pub fn reset(&mut self) {
        self.pending.clear();
        self.overflowed = false;
    }

    fn take(&mut self) -> Option<ResponseLine> {
        let line = self.decode();
        self.pending.clear();
        self.overflowed = false;
        line
    }

    fn decode(&self) -> Option<ResponseLine> {
        let decoded = String::from_utf8_lossy(&self.pending);
        let invalid = matches!(decoded, std::borrow::Cow::Owned(_));
        let text: String = decoded
            .chars()
            .filter(|c| *c != char::REPLACEMENT_CHARACTER)
            .collect();
        let text = text.trim().to_owned();

        if text.is_empty() {
            None
        } else {
            Some(ResponseLine {
                text,
                garbled: self.overflowed || invalid,
            })
        }
    }
}
