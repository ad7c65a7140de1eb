//! Fuzz target: `LineDecoder::feed`
//!
//! Drives arbitrary modem output through the response line decoder in
//! two chunks and asserts it never panics and never yields an empty or
//! oversized line.
//!
//! cargo fuzz run fuzz_at_lines

#![no_main]

use amar::modem::codec::{LineDecoder, MAX_LINE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let split = data.first().map_or(0, |b| usize::from(*b)).min(data.len());
    let mut decoder = LineDecoder::new();
    let mut lines = Vec::new();
    decoder.feed(&data[..split], &mut lines);
    decoder.feed(&data[split..], &mut lines);
    lines.extend(decoder.flush());

    for line in &lines {
        assert!(!line.text.is_empty(), "decoder must not yield empty lines");
        assert!(line.text.len() <= MAX_LINE, "line exceeds buffer");
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    decoder.feed(data, &mut lines);
});
