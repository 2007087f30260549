//! AMQP 0-9-1 wire codec.
//!
//! Everything a client needs to speak the binary protocol: bounds-checked
//! primitive reads, the 18-type field value codec with its tagged encoding,
//! field tables, method argument lists, frame framing, method identifiers,
//! content headers and message properties.
//!
//! This crate is pure: no I/O, no state. Decoders take byte slices and
//! report exactly how much they consumed; encoders append to a growable
//! [`bytes::BytesMut`]. The connection state machine that drives the codec
//! lives in `warren-client`.
//!
//! # Invariants
//!
//! - Every multi-byte integer is big-endian; floats are big-endian IEEE 754.
//! - Decoding any value and re-encoding it reproduces the input bytes.
//! - No decoder reads past the slice it was given; truncated input is a
//!   typed error (or "need more" at the frame boundary), never a panic.

#![forbid(unsafe_code)]

pub mod args;
pub mod codec;
pub mod content;
pub mod errors;
pub mod field;
pub mod frame;
pub mod message;
pub mod method;
pub mod reply;
pub mod table;

pub use codec::Decoder;
pub use content::ContentHeader;
pub use errors::{ProtocolError, Result};
pub use field::{Decimal, FieldKind, FieldValue};
pub use frame::{FRAME_END, Frame, FrameType, PROTOCOL_HEADER};
pub use message::{DeliveryMode, Message, Properties};
pub use method::{Method, MethodFrame};
pub use table::{FieldPair, FieldTable};
