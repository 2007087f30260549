//! Fuzz target for Frame::read
//!
//! This fuzzer tests frame reading with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in size calculations
//! - Buffer over-reads
//!
//! The fuzzer should NEVER panic. Incomplete input must read as `Ok(None)`
//! and invalid input as `Err`, and a successful read must report a total
//! length that fits inside the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use warren_proto::Frame;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some((frame, total))) = Frame::read(data) {
        assert!(total <= data.len());
        assert_eq!(total, 8 + frame.payload.len());
    }
});
