//! Fuzz target for the client's inbound data path
//!
//! Runs the handshake state machine against arbitrary broker bytes split at
//! arbitrary points. The client must never panic: malformed input has to
//! surface as an `Error` action followed by `Disconnect`.

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use warren_client::{Client, ClientConfig, ClientEvent};

#[derive(Debug, Arbitrary)]
struct Input {
    chunks: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let Ok(mut client) = Client::new(ClientConfig::new("guest", "guest")) else {
        return;
    };

    client.handle(ClientEvent::Connected);
    for chunk in input.chunks {
        let _ = client.handle(ClientEvent::Data(Bytes::from(chunk)));
    }
    let _ = client.handle(ClientEvent::Closed);
});
