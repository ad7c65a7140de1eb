//! Application core: dispense and alert orchestration.
//!
//! The business rules live here: what a dose trigger does, how an
//! emergency escalates, and how requests are validated.  All interaction
//! with hardware and transports happens through **port traits** defined
//! in [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod dispense;
pub mod emergency;
pub mod events;
pub mod ports;
pub mod service;
