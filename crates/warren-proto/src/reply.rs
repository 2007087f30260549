//! Reply codes carried by connection.close and channel.close.

/// Success.
pub const SUCCESS: u16 = 200;
/// The message body was larger than the peer accepts.
pub const CONTENT_TOO_LARGE: u16 = 311;
/// An immediate publish found no consumer.
pub const NO_CONSUMERS: u16 = 313;
/// The broker is shutting the connection down.
pub const CONNECTION_FORCED: u16 = 320;
/// The vhost path was malformed.
pub const INVALID_PATH: u16 = 402;
/// The peer lacks permission for the resource.
pub const ACCESS_REFUSED: u16 = 403;
/// No such queue or exchange.
pub const NOT_FOUND: u16 = 404;
/// The resource is locked by another connection.
pub const RESOURCE_LOCKED: u16 = 405;
/// A declare did not match the existing resource.
pub const PRECONDITION_FAILED: u16 = 406;
/// A malformed frame was received.
pub const FRAME_ERROR: u16 = 501;
/// A frame payload could not be decoded.
pub const SYNTAX_ERROR: u16 = 502;
/// A method was invalid for the current state.
pub const COMMAND_INVALID: u16 = 503;
/// A channel was used incorrectly.
pub const CHANNEL_ERROR: u16 = 504;
/// A frame type was unexpected at this point of the content protocol.
pub const UNEXPECTED_FRAME: u16 = 505;
/// The broker ran out of a resource.
pub const RESOURCE_ERROR: u16 = 506;
/// The operation is not allowed.
pub const NOT_ALLOWED: u16 = 530;
/// The method is not implemented by the peer.
pub const NOT_IMPLEMENTED: u16 = 540;
/// The peer hit an internal error.
pub const INTERNAL_ERROR: u16 = 541;

/// Symbolic name of a reply code, when recognised.
#[must_use]
pub fn name(code: u16) -> Option<&'static str> {
    Some(match code {
        SUCCESS => "SUCCESS",
        CONTENT_TOO_LARGE => "CONTENT_TOO_LARGE",
        NO_CONSUMERS => "NO_CONSUMERS",
        CONNECTION_FORCED => "CONNECTION_FORCED",
        INVALID_PATH => "INVALID_PATH",
        ACCESS_REFUSED => "ACCESS_REFUSED",
        NOT_FOUND => "NOT_FOUND",
        RESOURCE_LOCKED => "RESOURCE_LOCKED",
        PRECONDITION_FAILED => "PRECONDITION_FAILED",
        FRAME_ERROR => "FRAME_ERROR",
        SYNTAX_ERROR => "SYNTAX_ERROR",
        COMMAND_INVALID => "COMMAND_INVALID",
        CHANNEL_ERROR => "CHANNEL_ERROR",
        UNEXPECTED_FRAME => "UNEXPECTED_FRAME",
        RESOURCE_ERROR => "RESOURCE_ERROR",
        NOT_ALLOWED => "NOT_ALLOWED",
        NOT_IMPLEMENTED => "NOT_IMPLEMENTED",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        _ => return None,
    })
}
