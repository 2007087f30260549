//! Client
//!
//! Sans-IO AMQP 0-9-1 client: the connection/channel handshake state
//! machine, content delivery reassembly, the consumer registry, and the
//! high-level facade for declaring resources, publishing and consuming.
//!
//! # Architecture
//!
//! The client never touches a socket. It receives events ([`ClientEvent`]),
//! processes them through pure state machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute: bytes to write, a transport
//! to close, notices to surface. One thread drives everything; there are no
//! locks and no suspension points.
//!
//! # Components
//!
//! - [`Client`]: connection state machine, delivery reassembler and facade
//! - [`ClientEvent`] / [`ClientAction`]: the event/action boundary
//! - [`Delivery`] / [`MessageAction`]: what consumer callbacks see and decide
//! - Option structs ([`PublishOptions`], [`QueueDeclareOptions`], …) mapping
//!   onto the packed method bit octets

#![forbid(unsafe_code)]

mod client;
mod consumer;
mod delivery;
mod error;
mod event;
mod options;

pub use client::{CLOSE_TIMEOUT, Client, ClientConfig, ClientState, DATA_CHANNEL, UndeliverableCallback};
pub use consumer::{Consumer, MessageCallback};
pub use delivery::{Delivery, DeliveryKind};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, MessageAction};
pub use options::{
    ExchangeDeclareOptions, ExchangeDeleteOptions, ExchangeType, PublishOptions,
    QueueDeclareOptions, QueueDeleteOptions, SubscribeOptions,
};
