//! Field tables: ordered name/value pairs.
//!
//! Tables preserve wire order and permit duplicate names; lookup returns the
//! first match. On the wire a table is a four-octet content size followed by
//! repeated (short-string name, tagged value) pairs. The decoder consumes
//! exactly the declared content; a value running past it is an error.

use bytes::{BufMut, BytesMut};

use crate::{
    codec::Decoder,
    errors::Result,
    field::{self, FieldValue},
};

/// One table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPair {
    /// Entry name, at most 128 bytes on the wire.
    pub name: String,
    /// Entry value.
    pub value: FieldValue,
}

/// An ordered sequence of named field values.
///
/// The table owns its names and values exclusively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable {
    pairs: Vec<FieldPair>,
}

impl FieldTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append an entry, preserving insertion order.
    ///
    /// Duplicate names are allowed; they are kept in order on the wire.
    pub fn append(&mut self, name: impl Into<String>, value: FieldValue) {
        self.pairs.push(FieldPair { name: name.into(), value });
    }

    /// Value of the first entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.pairs.iter().find(|pair| pair.name == name).map(|pair| &pair.value)
    }

    /// Iterate entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldPair> {
        self.pairs.iter()
    }

    /// Decode a table from its content-size prefix onward.
    pub fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        let content_size = dec.u32("table size")?;
        let content = dec.bytes(content_size as usize, "field table")?;

        let mut inner = Decoder::new(content);
        let mut table = Self::new();
        while !inner.is_empty() {
            let name = field::read_short_string(&mut inner)?;
            let value = FieldValue::read_tagged(&mut inner)?;
            table.append(name, value);
        }

        Ok(table)
    }

    /// Encode the table, backfilling the content-size prefix.
    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        let size_at = buf.len();
        buf.put_u32(0);

        for pair in &self.pairs {
            field::write_short_string(&pair.name, buf)?;
            pair.value.write_tagged(buf)?;
        }

        field::patch_content_size(buf, size_at, "field table")
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = &'a FieldPair;
    type IntoIter = std::slice::Iter<'a, FieldPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProtocolError;

    fn round_trip(table: &FieldTable) -> FieldTable {
        let mut buf = BytesMut::new();
        table.write(&mut buf).unwrap();

        let mut dec = Decoder::new(&buf);
        let decoded = FieldTable::read(&mut dec).unwrap();
        assert!(dec.is_empty());
        decoded
    }

    #[test]
    fn empty_table_is_four_zero_bytes() {
        let mut buf = BytesMut::new();
        FieldTable::new().write(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn round_trip_preserves_order_and_values() {
        let mut table = FieldTable::new();
        table.append("zebra", FieldValue::LongUint(1));
        table.append("alpha", FieldValue::ShortString("first".to_string()));
        table.append("mid", FieldValue::Boolean(true));

        let decoded = round_trip(&table);
        let names: Vec<&str> = decoded.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["zebra", "alpha", "mid"]);
        assert_eq!(decoded, table);
    }

    #[test]
    fn duplicate_names_keep_first_match_lookup() {
        let mut table = FieldTable::new();
        table.append("x", FieldValue::LongUint(1));
        table.append("x", FieldValue::LongUint(2));

        let decoded = round_trip(&table);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get("x"), Some(&FieldValue::LongUint(1)));
    }

    #[test]
    fn declared_size_beyond_input_fails() {
        // Claims 100 bytes of content, provides none.
        let buf = [0x00, 0x00, 0x00, 0x64];
        let mut dec = Decoder::new(&buf);
        assert_eq!(
            FieldTable::read(&mut dec),
            Err(ProtocolError::Truncated { what: "field table" })
        );
    }

    #[test]
    fn value_overrunning_content_fails() {
        // Content size 4: name "a" (2 bytes) + tag 'u' needs 2 more bytes but
        // only 1 remains inside the declared content.
        let buf = [0x00, 0x00, 0x00, 0x04, 0x01, b'a', b'u', 0x01];
        let mut dec = Decoder::new(&buf);
        assert!(FieldTable::read(&mut dec).is_err());
    }

    #[test]
    fn missing_lookup_returns_none() {
        let table = FieldTable::new();
        assert_eq!(table.get("nope"), None);
    }
}
