//! Error types for the client state machine.
//!
//! Everything here is fatal for the connection except [`ClientError::NotReady`],
//! [`ClientError::NoConsumer`] and [`ClientError::MissingCredentials`], which
//! are returned synchronously to the caller of the facade. Fatal errors never
//! escape [`crate::Client::handle`]: the top-level frame handler converts
//! them into an `Error` action followed by `Disconnect`.

use thiserror::Error;
use warren_proto::ProtocolError;

use crate::client::ClientState;

/// Errors produced by the client state machine and facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Login or password missing at construction time.
    #[error("missing credentials: both login and password must be set")]
    MissingCredentials,

    /// A facade operation was invoked before the handshake completed.
    #[error("cannot {operation}: client is not ready")]
    NotReady {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A codec failure while reading a frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A method's arguments failed to decode.
    #[error("{method}: {source}")]
    InvalidArguments {
        /// The method whose arguments were malformed.
        method: &'static str,
        /// The underlying codec failure.
        source: ProtocolError,
    },

    /// A method arrived in a state that forbids it.
    #[error("unexpected method {method} in state {state:?}")]
    UnexpectedMethod {
        /// Method name, or `class.method` digits when unknown.
        method: String,
        /// State the client was in.
        state: ClientState,
    },

    /// A method with no handler arrived.
    #[error("unhandled method {method}")]
    UnhandledMethod {
        /// Method name, or `class.method` digits when unknown.
        method: String,
    },

    /// A heartbeat frame arrived on a non-zero channel.
    #[error("heartbeat frame on channel {channel}")]
    HeartbeatChannel {
        /// The offending channel.
        channel: u16,
    },

    /// A frame arrived on a channel this client never opened.
    #[error("frame on unexpected channel {channel}")]
    UnexpectedChannel {
        /// The offending channel.
        channel: u16,
    },

    /// A content header arrived with no delivery method ahead of it.
    #[error("header frame without a pending delivery")]
    NoDelivery,

    /// A body frame arrived before the content header.
    #[error("body frame before content header")]
    ContentBeforeHeader,

    /// A second content header arrived for the same delivery.
    #[error("duplicate content header")]
    DuplicateHeader,

    /// A delivery method arrived while another delivery was in progress.
    #[error("delivery already in progress")]
    DeliveryInProgress,

    /// A content header announced a class other than basic.
    #[error("content header for unexpected class {class_id}")]
    UnexpectedContentClass {
        /// The class the header announced.
        class_id: u16,
    },

    /// A basic.deliver named a consumer tag this client never issued.
    #[error("unknown consumer tag '{tag}'")]
    UnknownConsumer {
        /// The unknown tag.
        tag: String,
    },

    /// An unsubscribe named a queue with no registered consumer.
    #[error("no consumer subscribed to queue '{queue}'")]
    NoConsumer {
        /// The queue name.
        queue: String,
    },
}
