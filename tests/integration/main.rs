//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no servos,
//! GPIO, or modem attached.

mod dispense_tests;
mod emergency_tests;
mod mock_hw;
mod scheduler_tests;
mod service_tests;
