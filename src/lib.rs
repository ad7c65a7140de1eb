//! AMAR medication dispenser controller.
//!
//! Dose scheduling, serialized carousel actuation, and GSM emergency
//! escalation.  Everything hardware-facing sits behind the port traits in
//! [`app::ports`] or the [`modem::SerialLink`] trait, so the whole core
//! runs in integration tests against mocks.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod modem;
pub mod pins;
pub mod scheduler;
pub mod sequencer;
