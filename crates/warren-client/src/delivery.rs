//! Broker-to-client deliveries and their reassembly state.
//!
//! A delivery starts with a `basic.deliver` or `basic.return` method frame,
//! continues with exactly one content header announcing the body size, and
//! finishes once body frames totalling that size have arrived. Only one
//! delivery can be in flight at a time on this client's single channel.

use bytes::BytesMut;
use warren_proto::{Message, Properties};

/// What kind of delivery this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryKind {
    /// A message routed to one of our consumers.
    Deliver {
        /// Tag of the consumer the message is for.
        consumer_tag: String,
        /// Broker-assigned tag used to acknowledge the message.
        delivery_tag: u64,
        /// True when the broker delivered this message before.
        redelivered: bool,
    },

    /// A published message the broker could not route.
    Return {
        /// Reply code explaining the return.
        reply_code: u16,
        /// Reply text explaining the return.
        reply_text: String,
    },
}

/// A delivery in either direction of completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Deliver or return.
    pub kind: DeliveryKind,
    /// Exchange the message was published to.
    pub exchange: String,
    /// Routing key the message was published with.
    pub routing_key: String,
}

impl Delivery {
    /// The broker's delivery tag; `None` for returned messages.
    #[must_use]
    pub fn delivery_tag(&self) -> Option<u64> {
        match &self.kind {
            DeliveryKind::Deliver { delivery_tag, .. } => Some(*delivery_tag),
            DeliveryKind::Return { .. } => None,
        }
    }

    /// The reply text of an undeliverable message; `None` for deliveries.
    #[must_use]
    pub fn undeliverable_reply_text(&self) -> Option<&str> {
        match &self.kind {
            DeliveryKind::Return { reply_text, .. } => Some(reply_text),
            DeliveryKind::Deliver { .. } => None,
        }
    }
}

/// Content reassembly state for the in-flight delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentState {
    /// The delivery method arrived; the content header is next.
    AwaitingHeader,
    /// The header arrived; body frames are accumulating.
    AccumulatingBody,
}

/// The one delivery currently being reassembled.
pub(crate) struct IncomingDelivery {
    pub(crate) delivery: Delivery,
    pub(crate) state: ContentState,
    pub(crate) expected_body_size: u64,
    pub(crate) properties: Properties,
    pub(crate) body: BytesMut,
}

impl IncomingDelivery {
    /// Start reassembling a fresh delivery.
    pub(crate) fn new(delivery: Delivery) -> Self {
        Self {
            delivery,
            state: ContentState::AwaitingHeader,
            expected_body_size: 0,
            properties: Properties::default(),
            body: BytesMut::new(),
        }
    }

    /// True once the accumulated body covers the announced size.
    pub(crate) fn is_complete(&self) -> bool {
        self.state == ContentState::AccumulatingBody
            && self.body.len() as u64 >= self.expected_body_size
    }

    /// Finish the delivery, producing the reassembled message.
    pub(crate) fn finish(self) -> (Delivery, Message) {
        debug_assert!(self.is_complete());

        let mut message = Message::new();
        message.properties = self.properties;
        message.set_data_nocopy(self.body.freeze());

        (self.delivery, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver() -> Delivery {
        Delivery {
            kind: DeliveryKind::Deliver {
                consumer_tag: "consumer-1".to_string(),
                delivery_tag: 7,
                redelivered: false,
            },
            exchange: "ex".to_string(),
            routing_key: "rk".to_string(),
        }
    }

    #[test]
    fn completion_tracks_expected_size() {
        let mut incoming = IncomingDelivery::new(deliver());
        assert!(!incoming.is_complete());

        incoming.state = ContentState::AccumulatingBody;
        incoming.expected_body_size = 3;
        assert!(!incoming.is_complete());

        incoming.body.extend_from_slice(b"ab");
        assert!(!incoming.is_complete());

        incoming.body.extend_from_slice(b"c");
        assert!(incoming.is_complete());

        let (delivery, message) = incoming.finish();
        assert_eq!(delivery.delivery_tag(), Some(7));
        assert_eq!(message.data(), b"abc");
        assert_eq!(message.data_size(), 3);
    }

    #[test]
    fn zero_size_body_is_complete_at_header() {
        let mut incoming = IncomingDelivery::new(deliver());
        incoming.state = ContentState::AccumulatingBody;
        assert!(incoming.is_complete());
    }

    #[test]
    fn reply_text_only_for_returns() {
        let returned = Delivery {
            kind: DeliveryKind::Return { reply_code: 313, reply_text: "NO_ROUTE".to_string() },
            exchange: "ex".to_string(),
            routing_key: "rk".to_string(),
        };
        assert_eq!(returned.undeliverable_reply_text(), Some("NO_ROUTE"));
        assert_eq!(returned.delivery_tag(), None);
        assert_eq!(deliver().undeliverable_reply_text(), None);
    }
}
