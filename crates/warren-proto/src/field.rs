//! Field values and their tagged encoding.
//!
//! AMQP fields are a tagged sum over 18 types. Method arguments carry them
//! *untagged* (the method grammar fixes each field's type); tables and arrays
//! carry them *tagged*, with a one-byte ASCII tag ahead of each value so the
//! contents are self-describing.
//!
//! # Invariants
//!
//! Decoding a field and re-encoding it must reproduce the input bytes
//! exactly, for every type. Round-trip identity is verified by property
//! tests in `tests/codec_properties.rs`.

use bytes::{BufMut, BytesMut};

use crate::{
    codec::Decoder,
    errors::{ProtocolError, Result},
    table::FieldTable,
};

/// A decimal value: a base-10 scale and a raw 32-bit value.
///
/// The represented number is `value / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// Number of decimal digits after the point.
    pub scale: u8,
    /// Unscaled value.
    pub value: u32,
}

/// The 18 field types, used to drive untagged (method argument) decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One octet, zero is false.
    Boolean,
    /// Signed 8-bit integer.
    ShortShortInt,
    /// Unsigned 8-bit integer.
    ShortShortUint,
    /// Signed 16-bit integer.
    ShortInt,
    /// Unsigned 16-bit integer.
    ShortUint,
    /// Signed 32-bit integer.
    LongInt,
    /// Unsigned 32-bit integer.
    LongUint,
    /// Signed 64-bit integer.
    LongLongInt,
    /// Unsigned 64-bit integer.
    LongLongUint,
    /// IEEE 754 single-precision float.
    Float,
    /// IEEE 754 double-precision float.
    Double,
    /// Scaled decimal.
    Decimal,
    /// Length-prefixed string, at most 255 bytes.
    ShortString,
    /// Length-prefixed byte string, binary-safe.
    LongString,
    /// Ordered sequence of tagged values.
    Array,
    /// POSIX seconds as an unsigned 64-bit integer.
    Timestamp,
    /// Ordered name/value pairs.
    Table,
    /// No value at all; zero bytes on the wire.
    NoValue,
}

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    ShortShortInt(i8),
    /// Unsigned 8-bit integer.
    ShortShortUint(u8),
    /// Signed 16-bit integer.
    ShortInt(i16),
    /// Unsigned 16-bit integer.
    ShortUint(u16),
    /// Signed 32-bit integer.
    LongInt(i32),
    /// Unsigned 32-bit integer.
    LongUint(u32),
    /// Signed 64-bit integer.
    LongLongInt(i64),
    /// Unsigned 64-bit integer.
    LongLongUint(u64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Scaled decimal.
    Decimal(Decimal),
    /// Short string (UTF-8, ≤ 255 bytes).
    ShortString(String),
    /// Long string; arbitrary bytes, may contain NULs.
    LongString(Vec<u8>),
    /// Array of tagged values.
    Array(Vec<FieldValue>),
    /// POSIX timestamp in seconds.
    Timestamp(u64),
    /// Nested field table.
    Table(FieldTable),
    /// No value.
    NoValue,
}

/// Read a short string: one length octet then that many bytes.
pub fn read_short_string(dec: &mut Decoder<'_>) -> Result<String> {
    let len = dec.u8("short string length")?;
    let bytes = dec.bytes(len as usize, "short string")?;
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Read a long string: a four-octet length then that many bytes.
///
/// The value is binary-safe and is returned as raw bytes.
pub fn read_long_string(dec: &mut Decoder<'_>) -> Result<Vec<u8>> {
    let len = dec.u32("long string length")?;
    Ok(dec.bytes(len as usize, "long string")?.to_vec())
}

/// Write a short string. Fails if the string exceeds 255 bytes.
pub fn write_short_string(value: &str, buf: &mut BytesMut) -> Result<()> {
    let len = value.len();
    if len > u8::MAX as usize {
        return Err(ProtocolError::ShortStringTooLong { len });
    }
    buf.put_u8(len as u8);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Write a long string.
pub fn write_long_string(value: &[u8], buf: &mut BytesMut) -> Result<()> {
    let len = value.len();
    if u32::try_from(len).is_err() {
        return Err(ProtocolError::ContentTooLarge { what: "long string", len });
    }
    buf.put_u32(len as u32);
    buf.put_slice(value);
    Ok(())
}

/// Read an array: a four-octet content size then tagged values until the
/// declared content is exhausted.
pub fn read_array(dec: &mut Decoder<'_>) -> Result<Vec<FieldValue>> {
    let content_size = dec.u32("array size")?;
    let content = dec.bytes(content_size as usize, "array")?;

    let mut inner = Decoder::new(content);
    let mut fields = Vec::new();
    while !inner.is_empty() {
        fields.push(FieldValue::read_tagged(&mut inner)?);
    }

    Ok(fields)
}

/// Write an array with its content-size prefix.
pub fn write_array(fields: &[FieldValue], buf: &mut BytesMut) -> Result<()> {
    let size_at = buf.len();
    buf.put_u32(0);

    for field in fields {
        field.write_tagged(buf)?;
    }

    patch_content_size(buf, size_at, "array")
}

/// Backfill a four-octet content-size slot at `size_at` with the number of
/// bytes written after it.
pub(crate) fn patch_content_size(
    buf: &mut BytesMut,
    size_at: usize,
    what: &'static str,
) -> Result<()> {
    let len = buf.len() - size_at - 4;
    let size = u32::try_from(len).map_err(|_| ProtocolError::ContentTooLarge { what, len })?;
    buf[size_at..size_at + 4].copy_from_slice(&size.to_be_bytes());
    Ok(())
}

impl FieldValue {
    /// The type of this value.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Boolean(_) => FieldKind::Boolean,
            Self::ShortShortInt(_) => FieldKind::ShortShortInt,
            Self::ShortShortUint(_) => FieldKind::ShortShortUint,
            Self::ShortInt(_) => FieldKind::ShortInt,
            Self::ShortUint(_) => FieldKind::ShortUint,
            Self::LongInt(_) => FieldKind::LongInt,
            Self::LongUint(_) => FieldKind::LongUint,
            Self::LongLongInt(_) => FieldKind::LongLongInt,
            Self::LongLongUint(_) => FieldKind::LongLongUint,
            Self::Float(_) => FieldKind::Float,
            Self::Double(_) => FieldKind::Double,
            Self::Decimal(_) => FieldKind::Decimal,
            Self::ShortString(_) => FieldKind::ShortString,
            Self::LongString(_) => FieldKind::LongString,
            Self::Array(_) => FieldKind::Array,
            Self::Timestamp(_) => FieldKind::Timestamp,
            Self::Table(_) => FieldKind::Table,
            Self::NoValue => FieldKind::NoValue,
        }
    }

    /// The ASCII tag byte used when this value appears in a table or array.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self.kind() {
            FieldKind::Boolean => b't',
            FieldKind::ShortShortInt => b'b',
            FieldKind::ShortShortUint => b'B',
            FieldKind::ShortInt => b'U',
            FieldKind::ShortUint => b'u',
            FieldKind::LongInt => b'I',
            FieldKind::LongUint => b'i',
            FieldKind::LongLongInt => b'L',
            FieldKind::LongLongUint => b'l',
            FieldKind::Float => b'f',
            FieldKind::Double => b'd',
            FieldKind::Decimal => b'D',
            FieldKind::ShortString => b's',
            FieldKind::LongString => b'S',
            FieldKind::Array => b'A',
            FieldKind::Timestamp => b'T',
            FieldKind::Table => b'F',
            FieldKind::NoValue => b'V',
        }
    }

    /// Read an untagged value of the given type.
    pub fn read(dec: &mut Decoder<'_>, kind: FieldKind) -> Result<Self> {
        Ok(match kind {
            FieldKind::Boolean => Self::Boolean(dec.u8("boolean")? != 0),
            FieldKind::ShortShortInt => Self::ShortShortInt(dec.u8("short short int")? as i8),
            FieldKind::ShortShortUint => Self::ShortShortUint(dec.u8("short short uint")?),
            FieldKind::ShortInt => Self::ShortInt(dec.u16("short int")? as i16),
            FieldKind::ShortUint => Self::ShortUint(dec.u16("short uint")?),
            FieldKind::LongInt => Self::LongInt(dec.u32("long int")? as i32),
            FieldKind::LongUint => Self::LongUint(dec.u32("long uint")?),
            FieldKind::LongLongInt => Self::LongLongInt(dec.u64("long long int")? as i64),
            FieldKind::LongLongUint => Self::LongLongUint(dec.u64("long long uint")?),
            FieldKind::Float => Self::Float(dec.f32("float")?),
            FieldKind::Double => Self::Double(dec.f64("double")?),
            FieldKind::Decimal => Self::Decimal(Decimal {
                scale: dec.u8("decimal scale")?,
                value: dec.u32("decimal value")?,
            }),
            FieldKind::ShortString => Self::ShortString(read_short_string(dec)?),
            FieldKind::LongString => Self::LongString(read_long_string(dec)?),
            FieldKind::Array => Self::Array(read_array(dec)?),
            FieldKind::Timestamp => Self::Timestamp(dec.u64("timestamp")?),
            FieldKind::Table => Self::Table(FieldTable::read(dec)?),
            FieldKind::NoValue => Self::NoValue,
        })
    }

    /// Read a tagged value: a one-byte tag then the value it announces.
    pub fn read_tagged(dec: &mut Decoder<'_>) -> Result<Self> {
        let tag = dec.u8("field type tag")?;

        let kind = match tag {
            b't' => FieldKind::Boolean,
            b'b' => FieldKind::ShortShortInt,
            b'B' => FieldKind::ShortShortUint,
            b'U' => FieldKind::ShortInt,
            b'u' => FieldKind::ShortUint,
            b'I' => FieldKind::LongInt,
            b'i' => FieldKind::LongUint,
            b'L' => FieldKind::LongLongInt,
            b'l' => FieldKind::LongLongUint,
            b'f' => FieldKind::Float,
            b'd' => FieldKind::Double,
            b'D' => FieldKind::Decimal,
            b's' => FieldKind::ShortString,
            b'S' => FieldKind::LongString,
            b'A' => FieldKind::Array,
            b'T' => FieldKind::Timestamp,
            b'F' => FieldKind::Table,
            b'V' => FieldKind::NoValue,
            tag => return Err(ProtocolError::UnknownTag { tag }),
        };

        Self::read(dec, kind)
    }

    /// Write the value without its tag.
    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Self::Boolean(v) => buf.put_u8(u8::from(*v)),
            Self::ShortShortInt(v) => buf.put_i8(*v),
            Self::ShortShortUint(v) => buf.put_u8(*v),
            Self::ShortInt(v) => buf.put_i16(*v),
            Self::ShortUint(v) => buf.put_u16(*v),
            Self::LongInt(v) => buf.put_i32(*v),
            Self::LongUint(v) => buf.put_u32(*v),
            Self::LongLongInt(v) => buf.put_i64(*v),
            Self::LongLongUint(v) => buf.put_u64(*v),
            Self::Float(v) => buf.put_u32(v.to_bits()),
            Self::Double(v) => buf.put_u64(v.to_bits()),
            Self::Decimal(v) => {
                buf.put_u8(v.scale);
                buf.put_u32(v.value);
            },
            Self::ShortString(v) => write_short_string(v, buf)?,
            Self::LongString(v) => write_long_string(v, buf)?,
            Self::Array(v) => write_array(v, buf)?,
            Self::Timestamp(v) => buf.put_u64(*v),
            Self::Table(v) => v.write(buf)?,
            Self::NoValue => {},
        }

        Ok(())
    }

    /// Write the tag byte then the value.
    pub fn write_tagged(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.tag());
        self.write(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_tagged(value: &FieldValue) -> FieldValue {
        let mut buf = BytesMut::new();
        value.write_tagged(&mut buf).unwrap();

        let mut dec = Decoder::new(&buf);
        let decoded = FieldValue::read_tagged(&mut dec).unwrap();
        assert!(dec.is_empty(), "decode must consume exactly what encode produced");
        decoded
    }

    #[test]
    fn tagged_round_trip_scalars() {
        let values = [
            FieldValue::Boolean(true),
            FieldValue::ShortShortInt(-12),
            FieldValue::ShortShortUint(200),
            FieldValue::ShortInt(-30_000),
            FieldValue::ShortUint(60_000),
            FieldValue::LongInt(-2_000_000_000),
            FieldValue::LongUint(4_000_000_000),
            FieldValue::LongLongInt(i64::MIN),
            FieldValue::LongLongUint(u64::MAX),
            FieldValue::Float(3.25),
            FieldValue::Double(-1.5e300),
            FieldValue::Decimal(Decimal { scale: 2, value: 1999 }),
            FieldValue::Timestamp(1_430_000_000),
            FieldValue::NoValue,
        ];

        for value in values {
            assert_eq!(round_trip_tagged(&value), value);
        }
    }

    #[test]
    fn tagged_round_trip_strings() {
        let short = FieldValue::ShortString("hello".to_string());
        assert_eq!(round_trip_tagged(&short), short);

        // Long strings are binary-safe and may contain NULs.
        let long = FieldValue::LongString(vec![0x00, 0xFF, 0x00, 0x41]);
        assert_eq!(round_trip_tagged(&long), long);
    }

    #[test]
    fn tagged_round_trip_nested() {
        let mut table = FieldTable::new();
        table.append("k", FieldValue::LongUint(7));

        let value = FieldValue::Array(vec![
            FieldValue::ShortString("a".to_string()),
            FieldValue::Array(vec![FieldValue::Boolean(false)]),
            FieldValue::Table(table),
        ]);

        assert_eq!(round_trip_tagged(&value), value);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let buf = [b'x', 0x00];
        let mut dec = Decoder::new(&buf);
        assert_eq!(
            FieldValue::read_tagged(&mut dec),
            Err(ProtocolError::UnknownTag { tag: b'x' })
        );
    }

    #[test]
    fn boolean_any_nonzero_is_true() {
        let buf = [b't', 0x02];
        let mut dec = Decoder::new(&buf);
        assert_eq!(
            FieldValue::read_tagged(&mut dec).unwrap(),
            FieldValue::Boolean(true)
        );
    }

    #[test]
    fn short_string_over_255_bytes_fails_to_encode() {
        let value = "x".repeat(256);
        let mut buf = BytesMut::new();
        assert_eq!(
            write_short_string(&value, &mut buf),
            Err(ProtocolError::ShortStringTooLong { len: 256 })
        );
    }

    #[test]
    fn short_string_rejects_invalid_utf8() {
        let buf = [0x02, 0xFF, 0xFE];
        let mut dec = Decoder::new(&buf);
        assert_eq!(read_short_string(&mut dec), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn truncated_long_string_fails() {
        // Declares 10 bytes of content but provides 2.
        let buf = [0x00, 0x00, 0x00, 0x0A, 0x41, 0x42];
        let mut dec = Decoder::new(&buf);
        assert_eq!(
            read_long_string(&mut dec),
            Err(ProtocolError::Truncated { what: "long string" })
        );
    }

    #[test]
    fn float_encoding_is_big_endian_ieee754() {
        let mut buf = BytesMut::new();
        FieldValue::Float(1.0).write(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x3F, 0x80, 0x00, 0x00]);

        let mut buf = BytesMut::new();
        FieldValue::Double(1.0).write(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn array_with_truncated_element_fails() {
        // Array of 3 content bytes: tag 'u' then only one byte of a u16.
        let buf = [0x00, 0x00, 0x00, 0x02, b'u', 0x01];
        let mut dec = Decoder::new(&buf);
        assert!(read_array(&mut dec).is_err());
    }
}
