//! Method identifiers and method frames.
//!
//! A method is identified by its `(class_id, method_id)` pair; dispatch uses
//! the compact form `(class_id << 16) | method_id`. The [`Method`] enum
//! covers the six classes the protocol defines for clients: Connection,
//! Channel, Exchange, Queue, Basic and Tx.

use bytes::{BufMut, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    frame::{Frame, FrameType},
};

/// Class identifiers.
pub mod class {
    /// Connection class.
    pub const CONNECTION: u16 = 10;
    /// Channel class.
    pub const CHANNEL: u16 = 20;
    /// Exchange class.
    pub const EXCHANGE: u16 = 40;
    /// Queue class.
    pub const QUEUE: u16 = 50;
    /// Basic (content) class.
    pub const BASIC: u16 = 60;
    /// Transaction class.
    pub const TX: u16 = 90;
}

const fn id(class_id: u16, method_id: u16) -> u32 {
    ((class_id as u32) << 16) | method_id as u32
}

/// Every method of the client-facing classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[allow(missing_docs)] // Names mirror the protocol's Class.Method grammar.
pub enum Method {
    ConnectionStart = id(class::CONNECTION, 10),
    ConnectionStartOk = id(class::CONNECTION, 11),
    ConnectionSecure = id(class::CONNECTION, 20),
    ConnectionSecureOk = id(class::CONNECTION, 21),
    ConnectionTune = id(class::CONNECTION, 30),
    ConnectionTuneOk = id(class::CONNECTION, 31),
    ConnectionOpen = id(class::CONNECTION, 40),
    ConnectionOpenOk = id(class::CONNECTION, 41),
    ConnectionClose = id(class::CONNECTION, 50),
    ConnectionCloseOk = id(class::CONNECTION, 51),

    ChannelOpen = id(class::CHANNEL, 10),
    ChannelOpenOk = id(class::CHANNEL, 11),
    ChannelFlow = id(class::CHANNEL, 20),
    ChannelFlowOk = id(class::CHANNEL, 21),
    ChannelClose = id(class::CHANNEL, 40),
    ChannelCloseOk = id(class::CHANNEL, 41),

    ExchangeDeclare = id(class::EXCHANGE, 10),
    ExchangeDeclareOk = id(class::EXCHANGE, 11),
    ExchangeDelete = id(class::EXCHANGE, 20),
    ExchangeDeleteOk = id(class::EXCHANGE, 21),

    QueueDeclare = id(class::QUEUE, 10),
    QueueDeclareOk = id(class::QUEUE, 11),
    QueueBind = id(class::QUEUE, 20),
    QueueBindOk = id(class::QUEUE, 21),
    QueuePurge = id(class::QUEUE, 30),
    QueuePurgeOk = id(class::QUEUE, 31),
    QueueDelete = id(class::QUEUE, 40),
    QueueDeleteOk = id(class::QUEUE, 41),
    QueueUnbind = id(class::QUEUE, 50),
    QueueUnbindOk = id(class::QUEUE, 51),

    BasicQos = id(class::BASIC, 10),
    BasicQosOk = id(class::BASIC, 11),
    BasicConsume = id(class::BASIC, 20),
    BasicConsumeOk = id(class::BASIC, 21),
    BasicCancel = id(class::BASIC, 30),
    BasicCancelOk = id(class::BASIC, 31),
    BasicPublish = id(class::BASIC, 40),
    BasicReturn = id(class::BASIC, 50),
    BasicDeliver = id(class::BASIC, 60),
    BasicGet = id(class::BASIC, 70),
    BasicGetOk = id(class::BASIC, 71),
    BasicGetEmpty = id(class::BASIC, 72),
    BasicAck = id(class::BASIC, 80),
    BasicReject = id(class::BASIC, 90),
    BasicRecoverAsync = id(class::BASIC, 100),
    BasicRecover = id(class::BASIC, 110),
    BasicRecoverOk = id(class::BASIC, 111),

    TxSelect = id(class::TX, 10),
    TxSelectOk = id(class::TX, 11),
    TxCommit = id(class::TX, 20),
    TxCommitOk = id(class::TX, 21),
    TxRollback = id(class::TX, 30),
    TxRollbackOk = id(class::TX, 31),
}

impl Method {
    /// Class identifier (upper half of the compact id).
    #[must_use]
    pub const fn class_id(self) -> u16 {
        (self as u32 >> 16) as u16
    }

    /// Method identifier within its class (lower half of the compact id).
    #[must_use]
    pub const fn method_id(self) -> u16 {
        self as u32 as u16
    }

    /// Look up a method by its wire identifiers.
    #[must_use]
    pub fn from_ids(class_id: u16, method_id: u16) -> Option<Self> {
        Some(match (class_id, method_id) {
            (class::CONNECTION, 10) => Self::ConnectionStart,
            (class::CONNECTION, 11) => Self::ConnectionStartOk,
            (class::CONNECTION, 20) => Self::ConnectionSecure,
            (class::CONNECTION, 21) => Self::ConnectionSecureOk,
            (class::CONNECTION, 30) => Self::ConnectionTune,
            (class::CONNECTION, 31) => Self::ConnectionTuneOk,
            (class::CONNECTION, 40) => Self::ConnectionOpen,
            (class::CONNECTION, 41) => Self::ConnectionOpenOk,
            (class::CONNECTION, 50) => Self::ConnectionClose,
            (class::CONNECTION, 51) => Self::ConnectionCloseOk,

            (class::CHANNEL, 10) => Self::ChannelOpen,
            (class::CHANNEL, 11) => Self::ChannelOpenOk,
            (class::CHANNEL, 20) => Self::ChannelFlow,
            (class::CHANNEL, 21) => Self::ChannelFlowOk,
            (class::CHANNEL, 40) => Self::ChannelClose,
            (class::CHANNEL, 41) => Self::ChannelCloseOk,

            (class::EXCHANGE, 10) => Self::ExchangeDeclare,
            (class::EXCHANGE, 11) => Self::ExchangeDeclareOk,
            (class::EXCHANGE, 20) => Self::ExchangeDelete,
            (class::EXCHANGE, 21) => Self::ExchangeDeleteOk,

            (class::QUEUE, 10) => Self::QueueDeclare,
            (class::QUEUE, 11) => Self::QueueDeclareOk,
            (class::QUEUE, 20) => Self::QueueBind,
            (class::QUEUE, 21) => Self::QueueBindOk,
            (class::QUEUE, 30) => Self::QueuePurge,
            (class::QUEUE, 31) => Self::QueuePurgeOk,
            (class::QUEUE, 40) => Self::QueueDelete,
            (class::QUEUE, 41) => Self::QueueDeleteOk,
            (class::QUEUE, 50) => Self::QueueUnbind,
            (class::QUEUE, 51) => Self::QueueUnbindOk,

            (class::BASIC, 10) => Self::BasicQos,
            (class::BASIC, 11) => Self::BasicQosOk,
            (class::BASIC, 20) => Self::BasicConsume,
            (class::BASIC, 21) => Self::BasicConsumeOk,
            (class::BASIC, 30) => Self::BasicCancel,
            (class::BASIC, 31) => Self::BasicCancelOk,
            (class::BASIC, 40) => Self::BasicPublish,
            (class::BASIC, 50) => Self::BasicReturn,
            (class::BASIC, 60) => Self::BasicDeliver,
            (class::BASIC, 70) => Self::BasicGet,
            (class::BASIC, 71) => Self::BasicGetOk,
            (class::BASIC, 72) => Self::BasicGetEmpty,
            (class::BASIC, 80) => Self::BasicAck,
            (class::BASIC, 90) => Self::BasicReject,
            (class::BASIC, 100) => Self::BasicRecoverAsync,
            (class::BASIC, 110) => Self::BasicRecover,
            (class::BASIC, 111) => Self::BasicRecoverOk,

            (class::TX, 10) => Self::TxSelect,
            (class::TX, 11) => Self::TxSelectOk,
            (class::TX, 20) => Self::TxCommit,
            (class::TX, 21) => Self::TxCommitOk,
            (class::TX, 30) => Self::TxRollback,
            (class::TX, 31) => Self::TxRollbackOk,

            _ => return None,
        })
    }

    /// Display name in `Class.Method` form, used in traces and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ConnectionStart => "Connection.Start",
            Self::ConnectionStartOk => "Connection.Start-Ok",
            Self::ConnectionSecure => "Connection.Secure",
            Self::ConnectionSecureOk => "Connection.Secure-Ok",
            Self::ConnectionTune => "Connection.Tune",
            Self::ConnectionTuneOk => "Connection.Tune-Ok",
            Self::ConnectionOpen => "Connection.Open",
            Self::ConnectionOpenOk => "Connection.Open-Ok",
            Self::ConnectionClose => "Connection.Close",
            Self::ConnectionCloseOk => "Connection.Close-Ok",

            Self::ChannelOpen => "Channel.Open",
            Self::ChannelOpenOk => "Channel.Open-Ok",
            Self::ChannelFlow => "Channel.Flow",
            Self::ChannelFlowOk => "Channel.Flow-Ok",
            Self::ChannelClose => "Channel.Close",
            Self::ChannelCloseOk => "Channel.Close-Ok",

            Self::ExchangeDeclare => "Exchange.Declare",
            Self::ExchangeDeclareOk => "Exchange.Declare-Ok",
            Self::ExchangeDelete => "Exchange.Delete",
            Self::ExchangeDeleteOk => "Exchange.Delete-Ok",

            Self::QueueDeclare => "Queue.Declare",
            Self::QueueDeclareOk => "Queue.Declare-Ok",
            Self::QueueBind => "Queue.Bind",
            Self::QueueBindOk => "Queue.Bind-Ok",
            Self::QueuePurge => "Queue.Purge",
            Self::QueuePurgeOk => "Queue.Purge-Ok",
            Self::QueueDelete => "Queue.Delete",
            Self::QueueDeleteOk => "Queue.Delete-Ok",
            Self::QueueUnbind => "Queue.Unbind",
            Self::QueueUnbindOk => "Queue.Unbind-Ok",

            Self::BasicQos => "Basic.Qos",
            Self::BasicQosOk => "Basic.Qos-Ok",
            Self::BasicConsume => "Basic.Consume",
            Self::BasicConsumeOk => "Basic.Consume-Ok",
            Self::BasicCancel => "Basic.Cancel",
            Self::BasicCancelOk => "Basic.Cancel-Ok",
            Self::BasicPublish => "Basic.Publish",
            Self::BasicReturn => "Basic.Return",
            Self::BasicDeliver => "Basic.Deliver",
            Self::BasicGet => "Basic.Get",
            Self::BasicGetOk => "Basic.Get-Ok",
            Self::BasicGetEmpty => "Basic.Get-Empty",
            Self::BasicAck => "Basic.Ack",
            Self::BasicReject => "Basic.Reject",
            Self::BasicRecoverAsync => "Basic.Recover-Async",
            Self::BasicRecover => "Basic.Recover",
            Self::BasicRecoverOk => "Basic.Recover-Ok",

            Self::TxSelect => "Tx.Select",
            Self::TxSelectOk => "Tx.Select-Ok",
            Self::TxCommit => "Tx.Commit",
            Self::TxCommitOk => "Tx.Commit-Ok",
            Self::TxRollback => "Tx.Rollback",
            Self::TxRollbackOk => "Tx.Rollback-Ok",
        }
    }
}

/// The payload of a method frame: class, method, then the argument bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodFrame<'a> {
    /// Class identifier.
    pub class_id: u16,
    /// Method identifier.
    pub method_id: u16,
    /// Encoded arguments, decoded by the method-specific field list.
    pub args: &'a [u8],
}

impl<'a> MethodFrame<'a> {
    /// Extract the method payload from a frame of type [`FrameType::Method`].
    pub fn read(frame: &Frame<'a>) -> Result<Self> {
        debug_assert_eq!(frame.frame_type, FrameType::Method);

        if frame.payload.len() < 4 {
            return Err(ProtocolError::Truncated { what: "method frame" });
        }

        let class_id = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
        let method_id = u16::from_be_bytes([frame.payload[2], frame.payload[3]]);

        Ok(Self { class_id, method_id, args: &frame.payload[4..] })
    }

    /// The method, when its identifiers are recognised.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        Method::from_ids(self.class_id, self.method_id)
    }

    /// Human-readable description: the method name, or `class.method`
    /// digits for an unknown pair.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.method() {
            Some(method) => method.name().to_string(),
            None => format!("{}.{}", self.class_id, self.method_id),
        }
    }
}

/// Build a method-frame payload: class id, method id, then `args`.
pub fn write_method_payload(method: Method, args: &[u8], buf: &mut BytesMut) {
    buf.put_u16(method.class_id());
    buf.put_u16(method.method_id());
    buf.put_slice(args);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_id_math() {
        assert_eq!(Method::ConnectionStart.class_id(), 10);
        assert_eq!(Method::ConnectionStart.method_id(), 10);
        assert_eq!(Method::BasicDeliver.class_id(), 60);
        assert_eq!(Method::BasicDeliver.method_id(), 60);
        assert_eq!(Method::BasicDeliver as u32, (60 << 16) | 60);
    }

    #[test]
    fn from_ids_round_trips_every_method() {
        let methods = [
            Method::ConnectionStart,
            Method::ConnectionTuneOk,
            Method::ChannelCloseOk,
            Method::ExchangeDelete,
            Method::QueueUnbindOk,
            Method::BasicPublish,
            Method::BasicRecoverOk,
            Method::TxRollbackOk,
        ];
        for method in methods {
            assert_eq!(Method::from_ids(method.class_id(), method.method_id()), Some(method));
        }
    }

    #[test]
    fn unknown_ids_are_none() {
        assert_eq!(Method::from_ids(10, 99), None);
        assert_eq!(Method::from_ids(85, 10), None);
    }

    #[test]
    fn method_frame_round_trip() {
        let mut payload = BytesMut::new();
        write_method_payload(Method::QueueDeclare, b"\x00\x00", &mut payload);

        let frame = Frame { frame_type: FrameType::Method, channel: 1, payload: &payload };
        let method_frame = MethodFrame::read(&frame).unwrap();

        assert_eq!(method_frame.method(), Some(Method::QueueDeclare));
        assert_eq!(method_frame.args, b"\x00\x00");
        assert_eq!(method_frame.describe(), "Queue.Declare");
    }

    #[test]
    fn short_method_payload_is_truncated() {
        let frame = Frame { frame_type: FrameType::Method, channel: 1, payload: &[0, 10, 0] };
        assert_eq!(
            MethodFrame::read(&frame),
            Err(ProtocolError::Truncated { what: "method frame" })
        );
    }

    #[test]
    fn unknown_method_describe_uses_digits() {
        let frame = MethodFrame { class_id: 85, method_id: 5, args: &[] };
        assert_eq!(frame.describe(), "85.5");
    }
}
