//! Fuzz target: `LineBuffer::feed`
//!
//! Pushes arbitrary peer bytes through the line assembler and checks
//! that every emitted line is non-empty printable ASCII that fits the
//! buffer, and that the pending prefix never outgrows it.
//!
//! cargo fuzz run fuzz_line_buffer

#![no_main]

use bleconsole::shell::line::{LINE_CAPACITY, LineBuffer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = LineBuffer::new();

    for &byte in data {
        if let Some(line) = buf.feed(byte) {
            assert!(!line.is_empty(), "empty line emitted");
            assert!(line.len() < LINE_CAPACITY, "line exceeds capacity");
            assert!(line.bytes().all(|b| (0x20..=0x7E).contains(&b)));
        }
        assert!(buf.len() < LINE_CAPACITY);
    }
});
