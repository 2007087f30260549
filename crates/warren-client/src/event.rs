//! Client events and actions.
//!
//! The client is a pure state machine. The caller owns the transport and is
//! responsible for:
//! - Feeding transport lifecycle events and received bytes in as
//!   [`ClientEvent`]s
//! - Executing the returned [`ClientAction`]s (writing bytes, closing the
//!   socket, surfacing notices)
//! - Driving time forward via ticks

use std::time::Instant;

use bytes::Bytes;

/// Events the caller feeds into the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transport established its connection.
    Connected,

    /// The transport failed to connect.
    ConnFailed,

    /// The transport connection closed.
    Closed,

    /// Bytes arrived from the broker.
    ///
    /// Chunks may split frames anywhere; the client buffers partial frames
    /// internally.
    Data(Bytes),

    /// Time tick for timeout processing.
    ///
    /// The caller should send ticks periodically so the client can detect a
    /// peer that never acknowledges a close.
    Tick {
        /// Current time.
        now: Instant,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Append these bytes to the transport write buffer.
    Send(Bytes),

    /// Close the transport.
    Disconnect,

    /// The connection to the broker was established.
    ConnEstablished,

    /// The connection attempt failed.
    ConnFailed,

    /// The connection closed.
    ConnClosed,

    /// The handshake completed; the client accepts operations now.
    Ready,

    /// A fatal or broker-signalled error.
    Error(String),

    /// Diagnostic trace text.
    Trace(String),
}

/// What to do with a delivered message, returned by consumer callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAction {
    /// Send no acknowledgement at all.
    None,
    /// Acknowledge the message.
    Ack,
    /// Reject the message without requeueing it.
    Reject,
    /// Reject the message and ask the broker to requeue it.
    Requeue,
}
