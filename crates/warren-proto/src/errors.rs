//! Error types for the wire codec.
//!
//! Every decoder failure is a `ProtocolError`. All of them are fatal for the
//! connection that produced the bytes; the one recoverable condition, an
//! incomplete frame, is *not* an error and is reported as `Ok(None)` by
//! [`crate::Frame::read`].

use thiserror::Error;

/// Errors produced while encoding or decoding protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input ended before the value was complete.
    #[error("truncated {what}")]
    Truncated {
        /// What was being decoded when the input ran out.
        what: &'static str,
    },

    /// A tagged value carried a tag byte outside the known set.
    #[error("unknown field tag {tag:#04x}")]
    UnknownTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// A frame did not finish with the `0xCE` end marker.
    #[error("invalid frame end {end:#04x}")]
    InvalidFrameEnd {
        /// The byte found where `0xCE` was expected.
        end: u8,
    },

    /// A frame carried a type byte outside the known set.
    #[error("unknown frame type {0}")]
    UnknownFrameType(u8),

    /// A short string exceeded the 255-byte wire limit.
    #[error("short string too long ({len} bytes)")]
    ShortStringTooLong {
        /// Actual string length.
        len: usize,
    },

    /// A short string held bytes that are not valid UTF-8.
    #[error("short string is not valid UTF-8")]
    InvalidUtf8,

    /// Encoded content exceeded its 32-bit length prefix.
    #[error("{what} content too large ({len} bytes)")]
    ContentTooLarge {
        /// What was being encoded.
        what: &'static str,
        /// Actual content length.
        len: usize,
    },

    /// A payload did not end where its declared contents did.
    #[error("{left} trailing bytes after {what}")]
    TrailingBytes {
        /// What was being decoded.
        what: &'static str,
        /// Bytes left over.
        left: usize,
    },

    /// A content header carried property flag bits outside the known set.
    #[error("unknown property flags {flags:#06x}")]
    UnknownPropertyFlags {
        /// The full flag word.
        flags: u16,
    },
}

/// Convenience alias for codec results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
