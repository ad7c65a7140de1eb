//! Fuzz target: `parse_daily_time`
//!
//! Feeds arbitrary UTF-8 into the `HH:MM` parser and checks that anything
//! it accepts formats back to a valid 24-hour time.
//!
//! cargo fuzz run fuzz_time_parse

#![no_main]

use amar::scheduler::parse_daily_time;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(t) = parse_daily_time(text) {
        let shown = t.format("%H:%M").to_string();
        assert_eq!(parse_daily_time(&shown), Ok(t));
    }
});
