//! Peripheral drivers over `embedded-hal` traits.

pub mod button;
pub mod servo;
