//! Messages and their optional properties.
//!
//! A message is a property set plus a body buffer. Properties travel in the
//! content header behind a 16-bit present-mask; only properties that are set
//! occupy bytes on the wire, and they always appear in declaration order.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    codec::Decoder,
    errors::{ProtocolError, Result},
    field,
    table::FieldTable,
};

/// Delivery mode property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The broker may drop the message on restart.
    NonPersistent = 1,
    /// The broker persists the message to disk.
    Persistent = 2,
}

impl DeliveryMode {
    /// Map a wire octet to a delivery mode.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::NonPersistent),
            2 => Some(Self::Persistent),
            _ => None,
        }
    }
}

/// Property flag bits, most significant first in declaration order.
///
/// Bit 2 is the reserved slot of the retired cluster-id property and bit 0
/// is the continuation flag; both are always zero here.
pub mod property_flags {
    /// content-type present.
    pub const CONTENT_TYPE: u16 = 1 << 15;
    /// content-encoding present.
    pub const CONTENT_ENCODING: u16 = 1 << 14;
    /// headers present.
    pub const HEADERS: u16 = 1 << 13;
    /// delivery-mode present.
    pub const DELIVERY_MODE: u16 = 1 << 12;
    /// priority present.
    pub const PRIORITY: u16 = 1 << 11;
    /// correlation-id present.
    pub const CORRELATION_ID: u16 = 1 << 10;
    /// reply-to present.
    pub const REPLY_TO: u16 = 1 << 9;
    /// expiration present.
    pub const EXPIRATION: u16 = 1 << 8;
    /// message-id present.
    pub const MESSAGE_ID: u16 = 1 << 7;
    /// timestamp present.
    pub const TIMESTAMP: u16 = 1 << 6;
    /// type present.
    pub const MESSAGE_TYPE: u16 = 1 << 5;
    /// user-id present.
    pub const USER_ID: u16 = 1 << 4;
    /// app-id present.
    pub const APP_ID: u16 = 1 << 3;

    /// Every bit a peer is allowed to set.
    pub const KNOWN: u16 = CONTENT_TYPE
        | CONTENT_ENCODING
        | HEADERS
        | DELIVERY_MODE
        | PRIORITY
        | CORRELATION_ID
        | REPLY_TO
        | EXPIRATION
        | MESSAGE_ID
        | TIMESTAMP
        | MESSAGE_TYPE
        | USER_ID
        | APP_ID;
}

/// The optional properties of a message.
///
/// A property is present exactly when its field is `Some`; the wire mask is
/// derived from that, so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// MIME content type.
    pub content_type: Option<String>,
    /// MIME content encoding.
    pub content_encoding: Option<String>,
    /// Application headers.
    pub headers: Option<FieldTable>,
    /// Non-persistent or persistent.
    pub delivery_mode: Option<DeliveryMode>,
    /// Priority, 0 to 9.
    pub priority: Option<u8>,
    /// Application correlation identifier.
    pub correlation_id: Option<String>,
    /// Address to reply to.
    pub reply_to: Option<String>,
    /// Message expiration specification.
    pub expiration: Option<String>,
    /// Application message identifier.
    pub message_id: Option<String>,
    /// Message timestamp (POSIX seconds).
    pub timestamp: Option<u64>,
    /// Message type name.
    pub message_type: Option<String>,
    /// Creating user id.
    pub user_id: Option<String>,
    /// Creating application id.
    pub app_id: Option<String>,
}

impl Properties {
    /// The present-mask derived from which fields are set.
    #[must_use]
    pub fn flags(&self) -> u16 {
        use property_flags as f;

        let mut flags = 0;
        if self.content_type.is_some() {
            flags |= f::CONTENT_TYPE;
        }
        if self.content_encoding.is_some() {
            flags |= f::CONTENT_ENCODING;
        }
        if self.headers.is_some() {
            flags |= f::HEADERS;
        }
        if self.delivery_mode.is_some() {
            flags |= f::DELIVERY_MODE;
        }
        if self.priority.is_some() {
            flags |= f::PRIORITY;
        }
        if self.correlation_id.is_some() {
            flags |= f::CORRELATION_ID;
        }
        if self.reply_to.is_some() {
            flags |= f::REPLY_TO;
        }
        if self.expiration.is_some() {
            flags |= f::EXPIRATION;
        }
        if self.message_id.is_some() {
            flags |= f::MESSAGE_ID;
        }
        if self.timestamp.is_some() {
            flags |= f::TIMESTAMP;
        }
        if self.message_type.is_some() {
            flags |= f::MESSAGE_TYPE;
        }
        if self.user_id.is_some() {
            flags |= f::USER_ID;
        }
        if self.app_id.is_some() {
            flags |= f::APP_ID;
        }
        flags
    }

    /// Write the present properties in declaration order (flags excluded).
    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        if let Some(v) = &self.content_type {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.content_encoding {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.headers {
            v.write(buf)?;
        }
        if let Some(v) = self.delivery_mode {
            buf.put_u8(v as u8);
        }
        if let Some(v) = self.priority {
            debug_assert!(v <= 9, "priority must be in 0..=9");
            buf.put_u8(v);
        }
        if let Some(v) = &self.correlation_id {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.reply_to {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.expiration {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.message_id {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = self.timestamp {
            buf.put_u64(v);
        }
        if let Some(v) = &self.message_type {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.user_id {
            field::write_short_string(v, buf)?;
        }
        if let Some(v) = &self.app_id {
            field::write_short_string(v, buf)?;
        }
        Ok(())
    }

    /// Read the properties a flag word announces, in declaration order.
    pub fn read(dec: &mut Decoder<'_>, flags: u16) -> Result<Self> {
        use property_flags as f;

        if flags & !f::KNOWN != 0 {
            return Err(ProtocolError::UnknownPropertyFlags { flags });
        }

        let mut props = Self::default();
        if flags & f::CONTENT_TYPE != 0 {
            props.content_type = Some(field::read_short_string(dec)?);
        }
        if flags & f::CONTENT_ENCODING != 0 {
            props.content_encoding = Some(field::read_short_string(dec)?);
        }
        if flags & f::HEADERS != 0 {
            props.headers = Some(FieldTable::read(dec)?);
        }
        if flags & f::DELIVERY_MODE != 0 {
            // Unknown modes fall back to non-persistent.
            let raw = dec.u8("delivery mode")?;
            props.delivery_mode =
                Some(DeliveryMode::from_u8(raw).unwrap_or(DeliveryMode::NonPersistent));
        }
        if flags & f::PRIORITY != 0 {
            props.priority = Some(dec.u8("priority")?);
        }
        if flags & f::CORRELATION_ID != 0 {
            props.correlation_id = Some(field::read_short_string(dec)?);
        }
        if flags & f::REPLY_TO != 0 {
            props.reply_to = Some(field::read_short_string(dec)?);
        }
        if flags & f::EXPIRATION != 0 {
            props.expiration = Some(field::read_short_string(dec)?);
        }
        if flags & f::MESSAGE_ID != 0 {
            props.message_id = Some(field::read_short_string(dec)?);
        }
        if flags & f::TIMESTAMP != 0 {
            props.timestamp = Some(dec.u64("timestamp")?);
        }
        if flags & f::MESSAGE_TYPE != 0 {
            props.message_type = Some(field::read_short_string(dec)?);
        }
        if flags & f::USER_ID != 0 {
            props.user_id = Some(field::read_short_string(dec)?);
        }
        if flags & f::APP_ID != 0 {
            props.app_id = Some(field::read_short_string(dec)?);
        }
        Ok(props)
    }
}

/// A message: properties plus a body buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Optional message properties.
    pub properties: Properties,
    data: Bytes,
}

impl Message {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body by copying `data`.
    pub fn set_data(&mut self, data: &[u8]) {
        self.data = Bytes::copy_from_slice(data);
    }

    /// Set the body without copying, taking ownership of the buffer.
    pub fn set_data_nocopy(&mut self, data: Bytes) {
        self.data = data;
    }

    /// The message body.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Body length in bytes.
    #[must_use]
    pub fn data_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Split the message into its properties and body.
    #[must_use]
    pub fn into_parts(self) -> (Properties, Bytes) {
        (self.properties, self.data)
    }
}
