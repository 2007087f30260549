//! Frame codec.
//!
//! The frame is the minimal wire unit: a seven-octet header (type, channel,
//! payload size), the payload, and the `0xCE` end marker. Total wire length
//! is `7 + size + 1`.
//!
//! Reading is incremental: [`Frame::read`] returns `Ok(None)` until a whole
//! frame is available and never consumes anything itself — on success the
//! caller advances its read buffer by the returned length. The decoded
//! payload borrows from the input.

use bytes::{BufMut, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Frame end marker. Any other trailing byte is fatal for the connection.
pub const FRAME_END: u8 = 0xCE;

/// The eight bytes a client sends to open the protocol: `"AMQP" 0 0 9 1`.
pub const PROTOCOL_HEADER: [u8; 8] = *b"AMQP\x00\x00\x09\x01";

/// Frame type octet values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// A method call or reply.
    Method = 1,
    /// A content header following a content-carrying method.
    Header = 2,
    /// A chunk of content body.
    Body = 3,
    /// A heartbeat; always on channel 0.
    Heartbeat = 8,
}

impl FrameType {
    /// Map a wire octet to a frame type.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Method),
            2 => Some(Self::Header),
            3 => Some(Self::Body),
            8 => Some(Self::Heartbeat),
            _ => None,
        }
    }

    /// The wire octet for this frame type.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A decoded frame. The payload borrows from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame type.
    pub frame_type: FrameType,
    /// Channel the frame belongs to.
    pub channel: u16,
    /// Frame payload.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Try to read one frame from the start of `buf`.
    ///
    /// Returns `Ok(None)` while the buffer holds less than a complete frame;
    /// nothing is consumed and no state changes. On success returns the frame
    /// and its total wire length (`8 + size`), which the caller must skip.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidFrameEnd`] if the end marker is not `0xCE`
    /// - [`ProtocolError::UnknownFrameType`] for an unrecognised type octet
    pub fn read(buf: &'a [u8]) -> Result<Option<(Self, usize)>> {
        if buf.len() < 7 {
            return Ok(None);
        }

        let type_byte = buf[0];
        let channel = u16::from_be_bytes([buf[1], buf[2]]);
        let size = u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]) as usize;

        let total = 7 + size + 1;
        if buf.len() < total {
            return Ok(None);
        }

        let end = buf[7 + size];
        if end != FRAME_END {
            return Err(ProtocolError::InvalidFrameEnd { end });
        }

        let frame_type =
            FrameType::from_u8(type_byte).ok_or(ProtocolError::UnknownFrameType(type_byte))?;

        Ok(Some((Self { frame_type, channel, payload: &buf[7..7 + size] }, total)))
    }

    /// Append the frame to a write buffer.
    ///
    /// Reserves `7 + size + 1` bytes, then writes the header, the payload and
    /// the end marker.
    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        let len = self.payload.len();
        let size = u32::try_from(len)
            .map_err(|_| ProtocolError::ContentTooLarge { what: "frame payload", len })?;

        buf.reserve(7 + len + 1);
        buf.put_u8(self.frame_type.to_u8());
        buf.put_u16(self.channel);
        buf.put_u32(size);
        buf.put_slice(self.payload);
        buf.put_u8(FRAME_END);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &Frame<'_>) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trip() {
        let frame = Frame { frame_type: FrameType::Method, channel: 1, payload: b"abcde" };
        let wire = encode(&frame);

        let (decoded, total) = Frame::read(&wire).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(total, 8 + 5);
        assert_eq!(total, wire.len());
    }

    #[test]
    fn every_shorter_prefix_needs_more() {
        let frame = Frame { frame_type: FrameType::Body, channel: 1, payload: b"body bytes" };
        let wire = encode(&frame);

        for len in 0..wire.len() {
            assert_eq!(Frame::read(&wire[..len]).unwrap(), None, "prefix of {len} bytes");
        }
    }

    #[test]
    fn trailing_bytes_are_left_alone() {
        let frame = Frame { frame_type: FrameType::Heartbeat, channel: 0, payload: &[] };
        let mut wire = encode(&frame);
        wire.extend_from_slice(b"next frame starts here");

        let (decoded, total) = Frame::read(&wire).unwrap().unwrap();
        assert_eq!(decoded.frame_type, FrameType::Heartbeat);
        assert_eq!(total, 8);
    }

    #[test]
    fn bad_end_marker_is_fatal() {
        let frame = Frame { frame_type: FrameType::Method, channel: 1, payload: b"x" };
        let mut wire = encode(&frame);
        let last = wire.len() - 1;
        wire[last] = 0x00;

        assert_eq!(Frame::read(&wire), Err(ProtocolError::InvalidFrameEnd { end: 0x00 }));
    }

    #[test]
    fn unknown_frame_type_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u8(9);
        wire.put_u16(0);
        wire.put_u32(0);
        wire.put_u8(FRAME_END);

        assert_eq!(Frame::read(&wire), Err(ProtocolError::UnknownFrameType(9)));
    }

    #[test]
    fn empty_payload_frame() {
        let frame = Frame { frame_type: FrameType::Heartbeat, channel: 0, payload: &[] };
        let wire = encode(&frame);
        assert_eq!(&wire[..], &[8, 0, 0, 0, 0, 0, 0, FRAME_END]);
    }
}
