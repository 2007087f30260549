//! Content header frames.
//!
//! A content-carrying method (basic.publish, basic.deliver, basic.return) is
//! followed by exactly one header frame announcing the body size and the
//! message properties, then by zero or more body frames.
//!
//! Header payload layout: class id, a reserved weight word (always 0), the
//! 64-bit body size, the 16-bit property flag word, then the present
//! property values in declaration order.

use bytes::{BufMut, BytesMut};

use crate::{
    codec::Decoder,
    errors::{ProtocolError, Result},
    message::Properties,
};

/// A decoded content header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentHeader {
    /// Content class; basic (60) is the only class with content.
    pub class_id: u16,
    /// Total body size across all following body frames.
    pub body_size: u64,
    /// Message properties.
    pub properties: Properties,
}

impl ContentHeader {
    /// Decode a header-frame payload.
    pub fn read(payload: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(payload);

        let class_id = dec.u16("content header class")?;
        let _weight = dec.u16("content header weight")?;
        let body_size = dec.u64("content header body size")?;
        let flags = dec.u16("property flags")?;
        let properties = Properties::read(&mut dec, flags)?;

        if !dec.is_empty() {
            return Err(ProtocolError::TrailingBytes {
                what: "content header",
                left: dec.remaining(),
            });
        }

        Ok(Self { class_id, body_size, properties })
    }

    /// Encode the header-frame payload, computing the flag word from the
    /// property present-mask.
    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u16(self.class_id);
        buf.put_u16(0); // weight, reserved
        buf.put_u64(self.body_size);
        buf.put_u16(self.properties.flags());
        self.properties.write(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::class;

    fn encode(header: &ContentHeader) -> BytesMut {
        let mut buf = BytesMut::new();
        header.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trip() {
        let header = ContentHeader {
            class_id: class::BASIC,
            body_size: 5,
            properties: Properties {
                content_type: Some("text/plain".to_string()),
                ..Properties::default()
            },
        };

        let wire = encode(&header);
        assert_eq!(ContentHeader::read(&wire).unwrap(), header);
    }

    #[test]
    fn known_layout_for_single_property() {
        // class=60, weight=0, body_size=5, flags=0x8000, "text/plain".
        let header = ContentHeader {
            class_id: class::BASIC,
            body_size: 5,
            properties: Properties {
                content_type: Some("text/plain".to_string()),
                ..Properties::default()
            },
        };

        let wire = encode(&header);
        assert_eq!(&wire[..2], &[0, 60]);
        assert_eq!(&wire[2..4], &[0, 0]);
        assert_eq!(&wire[4..12], &[0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(&wire[12..14], &[0x80, 0x00]);
        assert_eq!(wire[14] as usize, "text/plain".len());
        assert_eq!(&wire[15..], b"text/plain");
    }

    #[test]
    fn no_properties_is_just_the_fixed_part() {
        let header =
            ContentHeader { class_id: class::BASIC, body_size: 0, ..ContentHeader::default() };
        let wire = encode(&header);
        assert_eq!(wire.len(), 2 + 2 + 8 + 2);
        assert_eq!(&wire[12..14], &[0x00, 0x00]);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let header =
            ContentHeader { class_id: class::BASIC, body_size: 1, ..ContentHeader::default() };
        let mut wire = encode(&header);
        wire.put_u8(0xAA);

        assert_eq!(
            ContentHeader::read(&wire),
            Err(ProtocolError::TrailingBytes { what: "content header", left: 1 })
        );
    }

    #[test]
    fn truncated_header_is_rejected() {
        let header =
            ContentHeader { class_id: class::BASIC, body_size: 1, ..ContentHeader::default() };
        let wire = encode(&header);
        assert!(ContentHeader::read(&wire[..wire.len() - 1]).is_err());
    }
}
