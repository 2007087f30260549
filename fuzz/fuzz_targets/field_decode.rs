//! Fuzz target for tagged field decoding
//!
//! Feeds arbitrary bytes to the tagged-value decoder, which also exercises
//! tables, arrays and every scalar reader through nesting. Decoding must
//! never panic and must never read past the input. Whatever decodes must
//! re-encode to a stable canonical form: encoding it, decoding that, and
//! encoding again reproduces the same bytes.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use warren_proto::{Decoder, FieldValue};

fuzz_target!(|data: &[u8]| {
    let mut dec = Decoder::new(data);
    let Ok(value) = FieldValue::read_tagged(&mut dec) else {
        return;
    };
    assert!(dec.consumed() <= data.len());

    let mut first = BytesMut::new();
    if value.write_tagged(&mut first).is_err() {
        return;
    }

    let mut dec = Decoder::new(&first);
    let reread = FieldValue::read_tagged(&mut dec).expect("canonical encoding must decode");
    assert!(dec.is_empty());

    let mut second = BytesMut::new();
    reread.write_tagged(&mut second).expect("canonical value must encode");
    assert_eq!(first, second);
});
