//! Fuzz target for content header decoding
//!
//! Property flag words drive a variable-length property list; this fuzzer
//! hunts for flag/value combinations that panic, over-read, or destabilise
//! the canonical encoding.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use warren_proto::ContentHeader;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = ContentHeader::read(data) else {
        return;
    };

    let mut first = BytesMut::new();
    if header.write(&mut first).is_err() {
        return;
    }

    let reread = ContentHeader::read(&first).expect("canonical encoding must decode");
    let mut second = BytesMut::new();
    reread.write(&mut second).expect("canonical header must encode");
    assert_eq!(first, second);
});
