//! Option sets for the facade operations.
//!
//! Each options struct maps onto the packed bit octet of the corresponding
//! method. The no-wait bit is not exposed: the client forces it on for every
//! operation so the broker stays silent on success.

use std::str::FromStr;

/// Position of the no-wait bit inside each method's packed flag octet.
///
/// The bit follows the method-specific flags, so its position differs per
/// method.
pub(crate) mod no_wait {
    pub(crate) const EXCHANGE_DECLARE: u8 = 0x10;
    pub(crate) const EXCHANGE_DELETE: u8 = 0x02;
    pub(crate) const QUEUE_DECLARE: u8 = 0x10;
    pub(crate) const QUEUE_DELETE: u8 = 0x04;
    pub(crate) const QUEUE_BIND: u8 = 0x01;
    pub(crate) const BASIC_CONSUME: u8 = 0x08;
    pub(crate) const BASIC_CANCEL: u8 = 0x01;
}

/// Exchange routing behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeType {
    /// Route on an exact routing-key match.
    Direct,
    /// Route to every bound queue.
    Fanout,
    /// Route on routing-key pattern match.
    Topic,
    /// Route on header table match.
    Headers,
}

impl ExchangeType {
    /// The type name sent in exchange.declare.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fanout => "fanout",
            Self::Topic => "topic",
            Self::Headers => "headers",
        }
    }
}

impl FromStr for ExchangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "fanout" => Ok(Self::Fanout),
            "topic" => Ok(Self::Topic),
            "headers" => Ok(Self::Headers),
            other => Err(format!("unknown exchange type '{other}'")),
        }
    }
}

/// Options for [`crate::Client::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Return the message if it cannot be routed to a queue.
    pub mandatory: bool,
    /// Return the message if it cannot be delivered to a consumer
    /// immediately.
    pub immediate: bool,
}

impl PublishOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.mandatory) | (u8::from(self.immediate) << 1)
    }
}

/// Options for [`crate::Client::subscribe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Do not deliver messages this connection published.
    pub no_local: bool,
    /// The broker considers messages acknowledged once delivered.
    pub no_ack: bool,
    /// Request exclusive consumer access to the queue.
    pub exclusive: bool,
}

impl SubscribeOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.no_local) | (u8::from(self.no_ack) << 1) | (u8::from(self.exclusive) << 2)
    }
}

/// Options for [`crate::Client::declare_exchange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeDeclareOptions {
    /// Assert the exchange exists instead of creating it.
    pub passive: bool,
    /// Survive broker restart.
    pub durable: bool,
    /// Delete the exchange once all queues are done with it.
    pub auto_delete: bool,
    /// The exchange only accepts messages from other exchanges.
    pub internal: bool,
}

impl ExchangeDeclareOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.passive)
            | (u8::from(self.durable) << 1)
            | (u8::from(self.auto_delete) << 2)
            | (u8::from(self.internal) << 3)
    }
}

/// Options for [`crate::Client::delete_exchange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeDeleteOptions {
    /// Only delete the exchange if it has no queue bindings.
    pub if_unused: bool,
}

impl ExchangeDeleteOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.if_unused)
    }
}

/// Options for [`crate::Client::declare_queue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDeclareOptions {
    /// Assert the queue exists instead of creating it.
    pub passive: bool,
    /// Survive broker restart.
    pub durable: bool,
    /// Restrict the queue to this connection.
    pub exclusive: bool,
    /// Delete the queue once it has no consumers.
    pub auto_delete: bool,
}

impl QueueDeclareOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.passive)
            | (u8::from(self.durable) << 1)
            | (u8::from(self.exclusive) << 2)
            | (u8::from(self.auto_delete) << 3)
    }
}

/// Options for [`crate::Client::delete_queue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDeleteOptions {
    /// Only delete the queue if it has no consumers.
    pub if_unused: bool,
    /// Only delete the queue if it is empty.
    pub if_empty: bool,
}

impl QueueDeleteOptions {
    pub(crate) fn bits(self) -> u8 {
        u8::from(self.if_unused) | (u8::from(self.if_empty) << 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_bits() {
        assert_eq!(PublishOptions::default().bits(), 0);
        assert_eq!(PublishOptions { mandatory: true, immediate: false }.bits(), 0x01);
        assert_eq!(PublishOptions { mandatory: false, immediate: true }.bits(), 0x02);
    }

    #[test]
    fn queue_declare_bits() {
        let opts = QueueDeclareOptions {
            passive: false,
            durable: true,
            exclusive: false,
            auto_delete: true,
        };
        assert_eq!(opts.bits(), 0x02 | 0x08);
    }

    #[test]
    fn exchange_type_parsing() {
        assert_eq!("direct".parse(), Ok(ExchangeType::Direct));
        assert_eq!("headers".parse(), Ok(ExchangeType::Headers));
        assert!("random".parse::<ExchangeType>().is_err());
        assert_eq!(ExchangeType::Topic.as_str(), "topic");
    }
}
