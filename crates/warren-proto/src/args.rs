//! Method argument field lists.
//!
//! Method arguments are a heterogeneous field sequence whose types are fixed
//! by the method grammar, so values travel *untagged*. A [`FieldKind`] slice
//! plays the role of the grammar: it drives decoding, and encoding simply
//! writes each value in order.
//!
//! A successful read consumes a deterministic number of bytes; callers
//! compare it against the payload length to detect trailing garbage.

use bytes::BytesMut;

use crate::{
    codec::Decoder,
    errors::Result,
    field::{FieldKind, FieldValue},
};

/// Read an untagged field sequence described by `kinds`.
///
/// On failure every value decoded so far is dropped; nothing partial is
/// returned.
pub fn read_field_list(dec: &mut Decoder<'_>, kinds: &[FieldKind]) -> Result<Vec<FieldValue>> {
    let mut fields = Vec::with_capacity(kinds.len());
    for kind in kinds {
        fields.push(FieldValue::read(dec, *kind)?);
    }
    Ok(fields)
}

/// Write an untagged field sequence in order.
pub fn write_field_list(fields: &[FieldValue], buf: &mut BytesMut) -> Result<()> {
    for field in fields {
        field.write(buf)?;
    }
    Ok(())
}
