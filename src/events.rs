//! Emergency event channel.
//!
//! The button side (interrupt or edge-polling context) only enqueues; a
//! dedicated consumer performs the notification and modem work, so
//! interrupt latency never depends on modem I/O latency.
//!
//! ```text
//! ┌──────────────┐  EmergencyEvent  ┌─────────────────┐     ┌──────────────────┐
//! │ Button edge  │────────────────▶│ EmergencyQueue  │────▶│ Emergency        │
//! │ (producer)   │   try_send       │ (bounded MPMC)  │     │ consumer thread  │
//! └──────────────┘   never blocks   └─────────────────┘     └──────────────────┘
//! ```

use chrono::{DateTime, Utc};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;

/// Pending emergency events before new presses are dropped.
const EMERGENCY_QUEUE_DEPTH: usize = 4;

/// One per button press edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyEvent {
    pub timestamp: DateTime<Utc>,
}

/// Bounded queue between the button edge and the emergency consumer,
/// plus the consumer's shutdown signal.
pub struct EmergencyQueue {
    channel: Channel<CriticalSectionRawMutex, EmergencyEvent, EMERGENCY_QUEUE_DEPTH>,
    shutdown: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for EmergencyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            shutdown: Signal::new(),
        }
    }

    /// Enqueue an event.  Safe from the edge context: never blocks.
    /// Returns `false` if the queue is full (event dropped).
    pub fn raise(&self, event: EmergencyEvent) -> bool {
        self.channel.try_send(event).is_ok()
    }

    /// Block until the next event, or `None` once [`close`](Self::close)
    /// has been called.
    pub fn next_blocking(&self) -> Option<EmergencyEvent> {
        future::block_on(future::or(
            async { Some(self.channel.receive().await) },
            async {
                self.shutdown.wait().await;
                None
            },
        ))
    }

    /// Wake the consumer and make it return.
    pub fn close(&self) {
        self.shutdown.signal(());
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}
