//! Connection state machine and client facade.
//!
//! The client follows the action pattern: the caller feeds it events
//! ([`ClientEvent`]) and executes the actions it returns ([`ClientAction`]).
//! All protocol logic is synchronous transformations of buffers and state;
//! the transport, timers and callbacks to the application all live outside.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connected──> Connected ──Start──> StartReceived
//!     ▲                                                 │ Tune
//!     │                                                 ▼
//!     │                                            TuneReceived
//!     │ close-ok /                                      │ Open-Ok
//!     │ transport closed                                ▼
//!  Closing <──disconnect()── Ready <──Open-Ok── ConnectionOpen
//! ```
//!
//! Fatal protocol errors never escape [`Client::handle`]; they become an
//! `Error` action followed by `Disconnect`, and no partial state survives.

use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use warren_proto::{
    ContentHeader, Decoder, FieldTable, FieldValue, Frame, FrameType, Message, Method, MethodFrame,
    ProtocolError, PROTOCOL_HEADER, args, field,
    method::{class, write_method_payload},
    reply,
};

use crate::{
    consumer::{ConsumerRegistry, MessageCallback},
    delivery::{ContentState, Delivery, DeliveryKind, IncomingDelivery},
    error::ClientError,
    event::{ClientAction, ClientEvent, MessageAction},
    options::{
        ExchangeDeclareOptions, ExchangeDeleteOptions, ExchangeType, PublishOptions,
        QueueDeclareOptions, QueueDeleteOptions, SubscribeOptions, no_wait,
    },
};

/// The one channel this client opens for data.
pub const DATA_CHANNEL: u16 = 1;

/// Connection-class methods travel on channel 0.
const CONNECTION_CHANNEL: u16 = 0;

/// How long to wait for Connection.Close-Ok before forcing the transport
/// shut.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// The only SASL mechanism supported.
const MECHANISM: &str = "PLAIN";

/// Locale requested during the handshake.
const LOCALE: &str = "en_US";

/// Reply text sent with a client-initiated close.
const CLOSE_REPLY_TEXT: &str = "goodbye";

/// Frame size assumed until the broker's tune arrives.
const DEFAULT_FRAME_MAX: u32 = 131_072;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No transport connection.
    Disconnected,
    /// Transport up, protocol header sent, waiting for Connection.Start.
    Connected,
    /// Start-Ok sent, waiting for Connection.Tune.
    StartReceived,
    /// Tune-Ok and Connection.Open sent, waiting for Open-Ok.
    TuneReceived,
    /// Channel.Open sent, waiting for its Open-Ok.
    ConnectionOpen,
    /// Handshake complete; operations are accepted.
    Ready,
    /// Connection.Close sent, waiting for Close-Ok.
    Closing,
}

/// Credentials and vhost used during the handshake.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Login name for PLAIN authentication.
    pub login: String,
    /// Password for PLAIN authentication.
    pub password: String,
    /// Virtual host selected by Connection.Open.
    pub vhost: String,
}

impl ClientConfig {
    /// Config with the given credentials and the default vhost `/`.
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self { login: login.into(), password: password.into(), vhost: "/".to_string() }
    }

    /// Select a virtual host.
    #[must_use]
    pub fn vhost(mut self, vhost: impl Into<String>) -> Self {
        self.vhost = vhost.into();
        self
    }
}

/// Callback invoked when the broker returns an undeliverable message.
pub type UndeliverableCallback = Box<dyn FnMut(&Delivery, &Message)>;

/// The AMQP client state machine.
pub struct Client {
    config: ClientConfig,
    state: ClientState,
    rbuf: BytesMut,
    frame_max: u32,
    consumers: ConsumerRegistry,
    delivery: Option<IncomingDelivery>,
    undeliverable_callback: Option<UndeliverableCallback>,
    closing_since: Option<Instant>,
}

impl Client {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingCredentials`] unless both login and password are
    /// non-empty.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.login.is_empty() || config.password.is_empty() {
            return Err(ClientError::MissingCredentials);
        }

        Ok(Self {
            config,
            state: ClientState::Disconnected,
            rbuf: BytesMut::new(),
            frame_max: DEFAULT_FRAME_MAX,
            consumers: ConsumerRegistry::default(),
            delivery: None,
            undeliverable_callback: None,
            closing_since: None,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// True once the handshake has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready
    }

    /// Tag of the consumer subscribed to `queue`, if any.
    #[must_use]
    pub fn consumer_tag(&self, queue: &str) -> Option<&str> {
        self.consumers.tag_for_queue(queue)
    }

    /// Register the callback invoked for undeliverable (returned) messages.
    pub fn set_undeliverable_callback(&mut self, callback: UndeliverableCallback) {
        self.undeliverable_callback = Some(callback);
    }

    /// Process a transport event and return the resulting actions.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::Connected => self.on_connected(),
            ClientEvent::ConnFailed => vec![ClientAction::ConnFailed],
            ClientEvent::Closed => self.on_closed(),
            ClientEvent::Data(data) => self.on_data(&data),
            ClientEvent::Tick { now } => self.on_tick(now),
        }
    }

    // ------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------

    fn on_connected(&mut self) -> Vec<ClientAction> {
        tracing::debug!("transport connected, sending protocol header");

        self.state = ClientState::Connected;
        self.rbuf.clear();
        self.delivery = None;
        self.frame_max = DEFAULT_FRAME_MAX;
        self.closing_since = None;

        vec![
            ClientAction::ConnEstablished,
            ClientAction::Send(Bytes::from_static(&PROTOCOL_HEADER)),
        ]
    }

    fn on_closed(&mut self) -> Vec<ClientAction> {
        tracing::debug!("transport closed");

        self.state = ClientState::Disconnected;
        self.rbuf.clear();
        self.delivery = None;
        self.consumers.clear();
        self.closing_since = None;

        vec![ClientAction::ConnClosed]
    }

    fn on_tick(&mut self, now: Instant) -> Vec<ClientAction> {
        if self.state != ClientState::Closing {
            self.closing_since = None;
            return Vec::new();
        }

        match self.closing_since {
            None => {
                self.closing_since = Some(now);
                Vec::new()
            },
            Some(since) if now.duration_since(since) >= CLOSE_TIMEOUT => {
                tracing::warn!("peer never acknowledged close, forcing disconnect");
                vec![
                    ClientAction::Trace("close timed out, forcing disconnect".to_string()),
                    ClientAction::Disconnect,
                ]
            },
            Some(_) => Vec::new(),
        }
    }

    fn on_data(&mut self, data: &[u8]) -> Vec<ClientAction> {
        self.rbuf.extend_from_slice(data);

        let mut actions = Vec::new();
        loop {
            // Probe for one complete frame; keep only its length so the
            // buffer borrow ends before any state changes below.
            let probe = Frame::read(&self.rbuf).map(|read| read.map(|(_, total)| total));
            let total = match probe {
                Ok(Some(total)) => total,
                Ok(None) => break,
                Err(err) => {
                    actions.extend(self.fatal(&format!("cannot read frame: {err}")));
                    return actions;
                },
            };

            // Detach the frame's bytes so the handlers below can borrow the
            // client mutably while the frame stays alive.
            let chunk = self.rbuf.split_to(total).freeze();
            let frame = match Frame::read(&chunk) {
                Ok(Some((frame, _))) => frame,
                // The chunk was validated as one complete frame above.
                Ok(None) | Err(_) => break,
            };

            match self.on_frame(&frame) {
                Ok(frame_actions) => actions.extend(frame_actions),
                Err(err) => {
                    actions.extend(self.fatal(&format!("cannot process frame: {err}")));
                    return actions;
                },
            }
        }

        actions
    }

    fn fatal(&mut self, text: &str) -> Vec<ClientAction> {
        tracing::warn!(error = text, "fatal protocol error");

        self.rbuf.clear();
        self.delivery = None;

        vec![ClientAction::Error(text.to_string()), ClientAction::Disconnect]
    }

    // ------------------------------------------------------------------
    // Frame dispatch
    // ------------------------------------------------------------------

    fn on_frame(&mut self, frame: &Frame<'_>) -> Result<Vec<ClientAction>, ClientError> {
        match frame.frame_type {
            FrameType::Method => {
                if frame.channel != CONNECTION_CHANNEL && frame.channel != DATA_CHANNEL {
                    return Err(ClientError::UnexpectedChannel { channel: frame.channel });
                }
                let method = MethodFrame::read(frame)?;
                self.on_method(&method)
            },
            FrameType::Header => {
                if frame.channel != DATA_CHANNEL {
                    return Err(ClientError::UnexpectedChannel { channel: frame.channel });
                }
                self.on_header(frame.payload)
            },
            FrameType::Body => {
                if frame.channel != DATA_CHANNEL {
                    return Err(ClientError::UnexpectedChannel { channel: frame.channel });
                }
                self.on_body(frame.payload)
            },
            FrameType::Heartbeat => {
                if frame.channel != 0 {
                    return Err(ClientError::HeartbeatChannel { channel: frame.channel });
                }
                // No send side yet; inbound heartbeats are accepted silently.
                Ok(vec![ClientAction::Trace("heartbeat frame".to_string())])
            },
        }
    }

    fn on_method(&mut self, frame: &MethodFrame<'_>) -> Result<Vec<ClientAction>, ClientError> {
        let describe = frame.describe();
        let mut actions = vec![ClientAction::Trace(format!("method {describe}"))];

        let Some(method) = frame.method() else {
            return Err(ClientError::UnhandledMethod { method: describe });
        };

        // While closing, only close-related traffic matters; the broker may
        // still flush replies to earlier operations.
        if self.state == ClientState::Closing
            && !matches!(
                method,
                Method::ConnectionClose | Method::ConnectionCloseOk | Method::ChannelClose
            )
        {
            actions.push(ClientAction::Trace(format!("dropping method {describe} while closing")));
            return Ok(actions);
        }

        let handled = match method {
            Method::ConnectionStart => self.on_connection_start(frame)?,
            Method::ConnectionTune => self.on_connection_tune(frame)?,
            Method::ConnectionOpenOk => self.on_connection_open_ok(frame)?,
            Method::ChannelOpenOk => self.on_channel_open_ok(frame)?,
            Method::ConnectionClose => self.on_connection_close(frame)?,
            Method::ConnectionCloseOk => self.on_connection_close_ok()?,
            Method::ChannelClose => self.on_channel_close(frame)?,
            Method::BasicDeliver => self.on_basic_deliver(frame)?,
            Method::BasicReturn => self.on_basic_return(frame)?,
            Method::QueueUnbindOk => {
                // The only reply the broker sends even though every operation
                // goes out no-wait: queue.unbind has no no-wait bit.
                self.expect_state(ClientState::Ready, Method::QueueUnbindOk)?;
                vec![ClientAction::Trace("queue unbound".to_string())]
            },
            _ => return Err(ClientError::UnhandledMethod { method: describe }),
        };

        actions.extend(handled);
        Ok(actions)
    }

    fn expect_state(&self, expected: ClientState, method: Method) -> Result<(), ClientError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::UnexpectedMethod {
                method: method.name().to_string(),
                state: self.state,
            })
        }
    }

    // ------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------

    fn on_connection_start(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::Connected, Method::ConnectionStart)?;

        let mut dec = Decoder::new(frame.args);
        decode_args(Method::ConnectionStart, &mut dec, |dec| {
            // Server capabilities are decoded for well-formedness and
            // discarded; this client always answers PLAIN / en_US.
            let _version_major = dec.u8("version-major")?;
            let _version_minor = dec.u8("version-minor")?;
            let _server_properties = FieldTable::read(dec)?;
            let _mechanisms = field::read_long_string(dec)?;
            let _locales = field::read_long_string(dec)?;
            Ok(())
        })?;

        let response = format!("\0{}\0{}", self.config.login, self.config.password);

        let mut start_ok = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::Table(FieldTable::new()),
                FieldValue::ShortString(MECHANISM.to_string()),
                FieldValue::LongString(response.into_bytes()),
                FieldValue::ShortString(LOCALE.to_string()),
            ],
            &mut start_ok,
        )?;

        self.state = ClientState::StartReceived;
        Ok(vec![self.method_action(CONNECTION_CHANNEL, Method::ConnectionStartOk, &start_ok)?])
    }

    fn on_connection_tune(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::StartReceived, Method::ConnectionTune)?;

        let mut dec = Decoder::new(frame.args);
        let (frame_max, heartbeat) = decode_args(Method::ConnectionTune, &mut dec, |dec| {
            let _channel_max = dec.u16("channel-max")?;
            let frame_max = dec.u32("frame-max")?;
            let heartbeat = dec.u16("heartbeat")?;
            Ok((frame_max, heartbeat))
        })?;

        self.frame_max = frame_max;

        // channel-max is forced to 1: this client never multiplexes.
        let mut tune_ok = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(1),
                FieldValue::LongUint(frame_max),
                FieldValue::ShortUint(heartbeat),
            ],
            &mut tune_ok,
        )?;

        let mut open = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortString(self.config.vhost.clone()),
                FieldValue::ShortString(String::new()),
                FieldValue::ShortShortUint(0),
            ],
            &mut open,
        )?;

        self.state = ClientState::TuneReceived;
        Ok(vec![
            self.method_action(CONNECTION_CHANNEL, Method::ConnectionTuneOk, &tune_ok)?,
            self.method_action(CONNECTION_CHANNEL, Method::ConnectionOpen, &open)?,
        ])
    }

    fn on_connection_open_ok(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::TuneReceived, Method::ConnectionOpenOk)?;

        let mut dec = Decoder::new(frame.args);
        decode_args(Method::ConnectionOpenOk, &mut dec, |dec| {
            let _known_hosts = field::read_short_string(dec)?;
            Ok(())
        })?;

        let mut open = BytesMut::new();
        args::write_field_list(&[FieldValue::ShortString(String::new())], &mut open)?;

        self.state = ClientState::ConnectionOpen;
        Ok(vec![self.method_action(DATA_CHANNEL, Method::ChannelOpen, &open)?])
    }

    fn on_channel_open_ok(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::ConnectionOpen, Method::ChannelOpenOk)?;

        let mut dec = Decoder::new(frame.args);
        decode_args(Method::ChannelOpenOk, &mut dec, |dec| {
            let _channel_id = field::read_long_string(dec)?;
            Ok(())
        })?;

        tracing::debug!("handshake complete");
        self.state = ClientState::Ready;
        Ok(vec![ClientAction::Ready])
    }

    // ------------------------------------------------------------------
    // Close paths
    // ------------------------------------------------------------------

    fn on_connection_close(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let mut dec = Decoder::new(frame.args);
        let (reply_code, reply_text, class_id, method_id) =
            decode_args(Method::ConnectionClose, &mut dec, |dec| {
                let reply_code = dec.u16("reply-code")?;
                let reply_text = field::read_short_string(dec)?;
                let class_id = dec.u16("class-id")?;
                let method_id = dec.u16("method-id")?;
                Ok((reply_code, reply_text, class_id, method_id))
            })?;

        let text = exception_text(reply_code, &reply_text);
        let message = if class_id == 0 {
            format!("connection exception: code {reply_code}: {text}")
        } else {
            let failing = describe_method(class_id, method_id);
            format!(
                "connection exception: method {failing} failed with code {reply_code}: {text}"
            )
        };

        self.state = ClientState::Closing;
        Ok(vec![
            ClientAction::Error(message),
            self.method_action(CONNECTION_CHANNEL, Method::ConnectionCloseOk, &[])?,
            ClientAction::Disconnect,
        ])
    }

    fn on_connection_close_ok(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if self.state != ClientState::Closing {
            return Err(ClientError::UnexpectedMethod {
                method: Method::ConnectionCloseOk.name().to_string(),
                state: self.state,
            });
        }

        Ok(vec![ClientAction::Trace("close acknowledged".to_string()), ClientAction::Disconnect])
    }

    fn on_channel_close(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let mut dec = Decoder::new(frame.args);
        let (reply_code, reply_text, class_id, method_id) =
            decode_args(Method::ChannelClose, &mut dec, |dec| {
                let reply_code = dec.u16("reply-code")?;
                let reply_text = field::read_short_string(dec)?;
                let class_id = dec.u16("class-id")?;
                let method_id = dec.u16("method-id")?;
                Ok((reply_code, reply_text, class_id, method_id))
            })?;

        let failing = describe_method(class_id, method_id);
        let text = exception_text(reply_code, &reply_text);
        let message =
            format!("channel exception: method {failing} failed with code {reply_code}: {text}");

        // Acknowledge the channel close, then take the whole connection down:
        // with a single channel there is nothing left to salvage.
        let mut actions = vec![
            ClientAction::Error(message),
            self.method_action(DATA_CHANNEL, Method::ChannelCloseOk, &[])?,
        ];
        actions.extend(self.begin_close()?);
        Ok(actions)
    }

    fn begin_close(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let mut close = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(reply::SUCCESS),
                FieldValue::ShortString(CLOSE_REPLY_TEXT.to_string()),
                FieldValue::ShortUint(0),
                FieldValue::ShortUint(0),
            ],
            &mut close,
        )?;

        self.state = ClientState::Closing;
        self.closing_since = None;
        Ok(vec![self.method_action(CONNECTION_CHANNEL, Method::ConnectionClose, &close)?])
    }

    // ------------------------------------------------------------------
    // Deliveries
    // ------------------------------------------------------------------

    fn on_basic_deliver(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::Ready, Method::BasicDeliver)?;
        if self.delivery.is_some() {
            return Err(ClientError::DeliveryInProgress);
        }

        let mut dec = Decoder::new(frame.args);
        let delivery = decode_args(Method::BasicDeliver, &mut dec, |dec| {
            let consumer_tag = field::read_short_string(dec)?;
            let delivery_tag = dec.u64("delivery-tag")?;
            let redelivered = dec.u8("redelivered")? != 0;
            let exchange = field::read_short_string(dec)?;
            let routing_key = field::read_short_string(dec)?;
            Ok(Delivery {
                kind: DeliveryKind::Deliver { consumer_tag, delivery_tag, redelivered },
                exchange,
                routing_key,
            })
        })?;

        self.delivery = Some(IncomingDelivery::new(delivery));
        Ok(Vec::new())
    }

    fn on_basic_return(
        &mut self,
        frame: &MethodFrame<'_>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.expect_state(ClientState::Ready, Method::BasicReturn)?;
        if self.delivery.is_some() {
            return Err(ClientError::DeliveryInProgress);
        }

        let mut dec = Decoder::new(frame.args);
        let delivery = decode_args(Method::BasicReturn, &mut dec, |dec| {
            let reply_code = dec.u16("reply-code")?;
            let reply_text = field::read_short_string(dec)?;
            let exchange = field::read_short_string(dec)?;
            let routing_key = field::read_short_string(dec)?;
            Ok(Delivery {
                kind: DeliveryKind::Return { reply_code, reply_text },
                exchange,
                routing_key,
            })
        })?;

        self.delivery = Some(IncomingDelivery::new(delivery));
        Ok(Vec::new())
    }

    fn on_header(&mut self, payload: &[u8]) -> Result<Vec<ClientAction>, ClientError> {
        let Some(incoming) = self.delivery.as_mut() else {
            return Err(ClientError::NoDelivery);
        };

        match incoming.state {
            ContentState::AccumulatingBody => Err(ClientError::DuplicateHeader),
            ContentState::AwaitingHeader => {
                let header = ContentHeader::read(payload)?;
                if header.class_id != class::BASIC {
                    return Err(ClientError::UnexpectedContentClass {
                        class_id: header.class_id,
                    });
                }

                incoming.expected_body_size = header.body_size;
                incoming.properties = header.properties;
                incoming.state = ContentState::AccumulatingBody;

                // A zero-size body completes right here; no body frames will
                // follow.
                self.try_complete()
            },
        }
    }

    fn on_body(&mut self, payload: &[u8]) -> Result<Vec<ClientAction>, ClientError> {
        let Some(incoming) = self.delivery.as_mut() else {
            return Err(ClientError::ContentBeforeHeader);
        };
        if incoming.state == ContentState::AwaitingHeader {
            return Err(ClientError::ContentBeforeHeader);
        }

        // Zero-byte continuations are permitted; completion is driven purely
        // by the size check below.
        incoming.body.extend_from_slice(payload);
        self.try_complete()
    }

    fn try_complete(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if !self.delivery.as_ref().is_some_and(IncomingDelivery::is_complete) {
            return Ok(Vec::new());
        }
        let Some(incoming) = self.delivery.take() else {
            return Ok(Vec::new());
        };

        let (delivery, message) = incoming.finish();
        match &delivery.kind {
            DeliveryKind::Deliver { consumer_tag, delivery_tag, .. } => {
                let delivery_tag = *delivery_tag;

                let action = {
                    let Some(consumer) = self.consumers.get_mut(consumer_tag) else {
                        return Err(ClientError::UnknownConsumer { tag: consumer_tag.clone() });
                    };
                    match consumer.callback.as_mut() {
                        Some(callback) => callback(&delivery, &message),
                        None => MessageAction::Requeue,
                    }
                };

                match action {
                    MessageAction::None => Ok(Vec::new()),
                    MessageAction::Ack => Ok(vec![self.basic_ack_action(delivery_tag)?]),
                    MessageAction::Reject => {
                        Ok(vec![self.basic_reject_action(delivery_tag, false)?])
                    },
                    MessageAction::Requeue => {
                        Ok(vec![self.basic_reject_action(delivery_tag, true)?])
                    },
                }
            },
            DeliveryKind::Return { .. } => {
                if let Some(callback) = self.undeliverable_callback.as_mut() {
                    callback(&delivery, &message);
                }
                Ok(Vec::new())
            },
        }
    }

    // ------------------------------------------------------------------
    // Facade
    // ------------------------------------------------------------------

    /// Publish a message to `exchange` with `routing_key`.
    ///
    /// Emits the basic.publish method, one content header and as many body
    /// frames as the negotiated frame size requires, contiguously.
    pub fn publish(
        &self,
        message: Message,
        exchange: &str,
        routing_key: &str,
        options: PublishOptions,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("publish")?;

        let mut publish = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(exchange.to_string()),
                FieldValue::ShortString(routing_key.to_string()),
                FieldValue::ShortShortUint(options.bits()),
            ],
            &mut publish,
        )?;

        let (properties, data) = message.into_parts();
        let header =
            ContentHeader { class_id: class::BASIC, body_size: data.len() as u64, properties };
        let mut header_payload = BytesMut::new();
        header.write(&mut header_payload)?;

        let mut actions = vec![
            self.method_action(DATA_CHANNEL, Method::BasicPublish, &publish)?,
            self.frame_action(FrameType::Header, &header_payload)?,
        ];
        for chunk in data.chunks(self.body_frame_capacity()) {
            actions.push(self.frame_action(FrameType::Body, chunk)?);
        }

        Ok(actions)
    }

    /// Subscribe to `queue`, registering `callback` for its deliveries.
    ///
    /// The consumer tag is assigned locally; no-wait is forced on so the
    /// broker sends no Consume-Ok. Without a callback, deliveries are
    /// requeued.
    pub fn subscribe(
        &mut self,
        queue: &str,
        options: SubscribeOptions,
        callback: Option<MessageCallback>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("subscribe")?;

        let tag = self.consumers.register(queue, callback);

        let mut consume = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(queue.to_string()),
                FieldValue::ShortString(tag),
                FieldValue::ShortShortUint(options.bits() | no_wait::BASIC_CONSUME),
                FieldValue::Table(FieldTable::new()),
            ],
            &mut consume,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::BasicConsume, &consume)?])
    }

    /// Cancel the consumer subscribed to `queue`.
    pub fn unsubscribe(&mut self, queue: &str) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("unsubscribe")?;

        let consumer = self
            .consumers
            .remove_by_queue(queue)
            .ok_or_else(|| ClientError::NoConsumer { queue: queue.to_string() })?;

        let mut cancel = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortString(consumer.tag),
                FieldValue::ShortShortUint(no_wait::BASIC_CANCEL),
            ],
            &mut cancel,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::BasicCancel, &cancel)?])
    }

    /// Acknowledge a delivery.
    pub fn ack(&self, delivery_tag: u64) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("ack")?;
        Ok(vec![self.basic_ack_action(delivery_tag)?])
    }

    /// Reject a delivery without requeueing it.
    pub fn reject(&self, delivery_tag: u64) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("reject")?;
        Ok(vec![self.basic_reject_action(delivery_tag, false)?])
    }

    /// Reject a delivery and ask the broker to requeue it.
    pub fn requeue(&self, delivery_tag: u64) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("requeue")?;
        Ok(vec![self.basic_reject_action(delivery_tag, true)?])
    }

    /// Declare an exchange.
    pub fn declare_exchange(
        &self,
        name: &str,
        exchange_type: ExchangeType,
        options: ExchangeDeclareOptions,
        arguments: FieldTable,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("declare exchange")?;

        let mut declare = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(name.to_string()),
                FieldValue::ShortString(exchange_type.as_str().to_string()),
                FieldValue::ShortShortUint(options.bits() | no_wait::EXCHANGE_DECLARE),
                FieldValue::Table(arguments),
            ],
            &mut declare,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::ExchangeDeclare, &declare)?])
    }

    /// Delete an exchange.
    pub fn delete_exchange(
        &self,
        name: &str,
        options: ExchangeDeleteOptions,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("delete exchange")?;

        let mut delete = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(name.to_string()),
                FieldValue::ShortShortUint(options.bits() | no_wait::EXCHANGE_DELETE),
            ],
            &mut delete,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::ExchangeDelete, &delete)?])
    }

    /// Declare a queue.
    pub fn declare_queue(
        &self,
        name: &str,
        options: QueueDeclareOptions,
        arguments: FieldTable,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("declare queue")?;

        let mut declare = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(name.to_string()),
                FieldValue::ShortShortUint(options.bits() | no_wait::QUEUE_DECLARE),
                FieldValue::Table(arguments),
            ],
            &mut declare,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::QueueDeclare, &declare)?])
    }

    /// Delete a queue.
    pub fn delete_queue(
        &self,
        name: &str,
        options: QueueDeleteOptions,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("delete queue")?;

        let mut delete = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(name.to_string()),
                FieldValue::ShortShortUint(options.bits() | no_wait::QUEUE_DELETE),
            ],
            &mut delete,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::QueueDelete, &delete)?])
    }

    /// Bind a queue to an exchange.
    pub fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        arguments: FieldTable,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("bind queue")?;

        let mut bind = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(queue.to_string()),
                FieldValue::ShortString(exchange.to_string()),
                FieldValue::ShortString(routing_key.to_string()),
                FieldValue::ShortShortUint(no_wait::QUEUE_BIND),
                FieldValue::Table(arguments),
            ],
            &mut bind,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::QueueBind, &bind)?])
    }

    /// Unbind a queue from an exchange.
    pub fn unbind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        arguments: FieldTable,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_ready("unbind queue")?;

        // queue.unbind carries no no-wait bit; the broker replies Unbind-Ok.
        let mut unbind = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::ShortUint(0),
                FieldValue::ShortString(queue.to_string()),
                FieldValue::ShortString(exchange.to_string()),
                FieldValue::ShortString(routing_key.to_string()),
                FieldValue::Table(arguments),
            ],
            &mut unbind,
        )?;

        Ok(vec![self.method_action(DATA_CHANNEL, Method::QueueUnbind, &unbind)?])
    }

    /// Initiate a graceful close.
    ///
    /// Sends Connection.Close and waits for the acknowledgement; the
    /// transport is disconnected when it arrives, or when the close timeout
    /// expires.
    pub fn disconnect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        match self.state {
            ClientState::Disconnected | ClientState::Closing => Ok(Vec::new()),
            _ => self.begin_close(),
        }
    }

    // ------------------------------------------------------------------
    // Frame composition
    // ------------------------------------------------------------------

    fn method_action(
        &self,
        channel: u16,
        method: Method,
        method_args: &[u8],
    ) -> Result<ClientAction, ClientError> {
        let mut payload = BytesMut::new();
        write_method_payload(method, method_args, &mut payload);

        let mut wire = BytesMut::new();
        Frame { frame_type: FrameType::Method, channel, payload: &payload }.write(&mut wire)?;
        Ok(ClientAction::Send(wire.freeze()))
    }

    fn frame_action(
        &self,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<ClientAction, ClientError> {
        let mut wire = BytesMut::new();
        Frame { frame_type, channel: DATA_CHANNEL, payload }.write(&mut wire)?;
        Ok(ClientAction::Send(wire.freeze()))
    }

    fn basic_ack_action(&self, delivery_tag: u64) -> Result<ClientAction, ClientError> {
        // The "multiple" bit stays clear: one delivery, one acknowledgement.
        let mut ack = BytesMut::new();
        args::write_field_list(
            &[FieldValue::LongLongUint(delivery_tag), FieldValue::ShortShortUint(0)],
            &mut ack,
        )?;

        self.method_action(DATA_CHANNEL, Method::BasicAck, &ack)
    }

    fn basic_reject_action(
        &self,
        delivery_tag: u64,
        requeue: bool,
    ) -> Result<ClientAction, ClientError> {
        let mut reject = BytesMut::new();
        args::write_field_list(
            &[
                FieldValue::LongLongUint(delivery_tag),
                FieldValue::ShortShortUint(u8::from(requeue)),
            ],
            &mut reject,
        )?;

        self.method_action(DATA_CHANNEL, Method::BasicReject, &reject)
    }

    fn body_frame_capacity(&self) -> usize {
        if self.frame_max == 0 {
            usize::MAX
        } else {
            (self.frame_max as usize).saturating_sub(8).max(1)
        }
    }

    fn require_ready(&self, operation: &'static str) -> Result<(), ClientError> {
        if self.state == ClientState::Ready {
            Ok(())
        } else {
            Err(ClientError::NotReady { operation })
        }
    }
}

/// Decode method arguments with `f`, wrapping failures with the method name
/// and rejecting trailing bytes.
fn decode_args<T>(
    method: Method,
    dec: &mut Decoder<'_>,
    f: impl FnOnce(&mut Decoder<'_>) -> Result<T, ProtocolError>,
) -> Result<T, ClientError> {
    let wrap = |source| ClientError::InvalidArguments { method: method.name(), source };

    let value = f(dec).map_err(wrap)?;
    if !dec.is_empty() {
        return Err(wrap(ProtocolError::TrailingBytes {
            what: "method arguments",
            left: dec.remaining(),
        }));
    }
    Ok(value)
}

/// `Class.Method` name for an arbitrary id pair.
fn describe_method(class_id: u16, method_id: u16) -> String {
    match Method::from_ids(class_id, method_id) {
        Some(method) => method.name().to_string(),
        None => format!("{class_id}.{method_id}"),
    }
}

/// Reply text, falling back to the symbolic code name when the broker sent
/// none.
fn exception_text(reply_code: u16, reply_text: &str) -> String {
    if reply_text.is_empty() {
        reply::name(reply_code).unwrap_or("unknown").to_string()
    } else {
        reply_text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_credentials() {
        assert_eq!(
            Client::new(ClientConfig::new("", "guest")).err(),
            Some(ClientError::MissingCredentials)
        );
        assert_eq!(
            Client::new(ClientConfig::new("guest", "")).err(),
            Some(ClientError::MissingCredentials)
        );
        assert!(Client::new(ClientConfig::new("guest", "guest")).is_ok());
    }

    #[test]
    fn starts_disconnected() {
        let client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        assert_eq!(client.state(), ClientState::Disconnected);
        assert!(!client.is_ready());
    }

    #[test]
    fn facade_rejects_calls_before_ready() {
        let client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        assert_eq!(
            client.ack(1).err(),
            Some(ClientError::NotReady { operation: "ack" })
        );
        assert_eq!(
            client.declare_queue("q", QueueDeclareOptions::default(), FieldTable::new()).err(),
            Some(ClientError::NotReady { operation: "declare queue" })
        );
    }

    #[test]
    fn connected_resets_state_and_sends_protocol_header() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        let actions = client.handle(ClientEvent::Connected);

        assert_eq!(client.state(), ClientState::Connected);
        assert_eq!(actions[0], ClientAction::ConnEstablished);
        assert_eq!(actions[1], ClientAction::Send(Bytes::from_static(b"AMQP\x00\x00\x09\x01")));
    }

    #[test]
    fn closed_clears_consumers() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        client.state = ClientState::Ready;
        client.consumers.register("q", None);

        let actions = client.handle(ClientEvent::Closed);
        assert_eq!(actions, vec![ClientAction::ConnClosed]);
        assert_eq!(client.state(), ClientState::Disconnected);
        assert!(client.consumer_tag("q").is_none());
    }

    #[test]
    fn conn_failed_is_forwarded() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        assert_eq!(client.handle(ClientEvent::ConnFailed), vec![ClientAction::ConnFailed]);
    }

    #[test]
    fn tick_outside_closing_does_nothing() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        assert!(client.handle(ClientEvent::Tick { now: Instant::now() }).is_empty());
    }

    #[test]
    fn close_times_out() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        client.state = ClientState::Ready;
        client.disconnect().unwrap();
        assert_eq!(client.state(), ClientState::Closing);

        let t0 = Instant::now();
        assert!(client.handle(ClientEvent::Tick { now: t0 }).is_empty());
        assert!(client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(1) }).is_empty());

        let actions = client.handle(ClientEvent::Tick { now: t0 + CLOSE_TIMEOUT });
        assert_eq!(actions.last(), Some(&ClientAction::Disconnect));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut client = Client::new(ClientConfig::new("guest", "guest")).unwrap();
        client.state = ClientState::Ready;

        assert_eq!(client.disconnect().unwrap().len(), 1);
        assert!(client.disconnect().unwrap().is_empty());
    }
}
