//! Real-time notification fan-out.
//!
//! Uses an `embassy-sync` [`PubSubChannel`] so every subscriber (one per
//! connected real-time client) sees every notification.  Publication is
//! immediate: it never waits, and a slow subscriber loses its oldest
//! unread notifications rather than holding up the publisher.
//!
//! ```text
//!  Orchestrator ──┐                       ┌──▶ subscriber (ws client)
//!                 ├──▶ NotificationHub ───┼──▶ subscriber (ws client)
//!  Emergency ─────┘   (publish_immediate) └──▶ ...
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use futures_lite::future;

use crate::app::events::Notification;
use crate::app::ports::NotificationSink;

/// Notifications buffered per subscriber before the oldest is overwritten.
const HUB_CAPACITY: usize = 16;
/// Maximum simultaneously connected subscribers.
pub const HUB_SUBSCRIBERS: usize = 4;
/// Long-lived publishers (immediate publication does not need one).
const HUB_PUBLISHERS: usize = 1;

type HubChannel = PubSubChannel<
    CriticalSectionRawMutex,
    Notification,
    HUB_CAPACITY,
    HUB_SUBSCRIBERS,
    HUB_PUBLISHERS,
>;

pub struct NotificationHub {
    channel: HubChannel,
}

/// One connected real-time client.
pub struct HubSubscription<'a> {
    inner: Subscriber<
        'a,
        CriticalSectionRawMutex,
        Notification,
        HUB_CAPACITY,
        HUB_SUBSCRIBERS,
        HUB_PUBLISHERS,
    >,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub const fn new() -> Self {
        Self {
            channel: PubSubChannel::new(),
        }
    }

    /// Attach a subscriber.  `None` when all slots are taken.
    pub fn subscribe(&self) -> Option<HubSubscription<'_>> {
        self.channel
            .subscriber()
            .ok()
            .map(|inner| HubSubscription { inner })
    }
}

impl NotificationSink for NotificationHub {
    fn emit(&self, notification: &Notification) {
        self.channel
            .immediate_publisher()
            .publish_immediate(notification.clone());
    }
}

impl HubSubscription<'_> {
    /// Block until the next notification arrives.
    pub fn recv(&mut self) -> Notification {
        future::block_on(self.inner.next_message_pure())
    }

    /// Next notification if one is waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.inner.try_next_message_pure()
    }
}

/// Delivers each notification to several sinks in order.
pub struct FanOutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanOutSink {
    fn emit(&self, notification: &Notification) {
        for sink in &self.sinks {
            sink.emit(notification);
        }
    }
}
