//! MQTT client facade over a callback-driven native client library.
//!
//! The native library (the libmosquitto model) owns one socket per client and
//! exposes three non-blocking steps: read, write and miscellaneous housekeeping.
//! [`MqttClient`] hooks those steps into the host event loop and turns the
//! library's callbacks into observable state:
//!
//! - [`ConnectionState`]: `Disconnected → Connecting → Connected → Disconnecting`
//! - [`SubscriptionState`]: the aggregate of all subscribe and unsubscribe
//!   requests, backed by a [`SubscriptionRegistry`]
//! - `published`, `message_received` and `error` signals
//!
//! The native library is reached through two traits:
//!
//! - [`Backend`]: one native client instance
//! - [`Library`]: process-wide initialization, see [`MqttLib`]
//!
//! Callbacks the library makes while one of its steps runs are queued by the
//! backend and pulled through [`Backend::next_event`] once the step returned, so
//! the client never re-enters itself.
//!
//! # Example
//!
//! ```rust,no_run
//! # use netglue::network::mqtt::{Backend, Library, MqttClient, MqttLib, QoS};
//! # use netglue::network::EventLoop;
//! # fn demo<B: Backend, L: EventLoop, Lib: Library>(lib: &mut MqttLib<Lib>, backend: B, event_loop: L) {
//! lib.init().ok();
//! let mut client = MqttClient::new(lib, backend, event_loop, true);
//! client.message_received.connect(|message| {
//!     println!("{}: {} bytes", message.topic, message.payload.len());
//! });
//! client.connect("test.mosquitto.org", 1883, 60).ok();
//! // Later, once connected:
//! client.subscribe("sensors/+", QoS::AtLeastOnce).ok();
//! # }
//! ```

use core::fmt;
use std::path::Path;

use super::Descriptor;

/// The client facade
pub mod client;

/// Process-wide library initialization
pub mod library;

/// Subscription bookkeeping
pub mod registry;

/// Subscription topic validation
pub mod topic;


pub use client::MqttClient;
pub use library::{Library, MqttLib};
pub use registry::SubscriptionRegistry;

/// Default broker port.
pub const DEFAULT_PORT: u16 = 1883;

/// Default keep-alive interval in seconds.
pub const DEFAULT_KEEPALIVE: u16 = 60;

/// Granted QoS value with which a broker rejects a subscription.
pub const SUBSCRIPTION_REFUSED: u8 = 0x80;

/// Identifier the native library assigns to publish, subscribe and unsubscribe
/// requests. The matching acknowledgement callback carries the same id.
pub type MessageId = i32;

/// Quality of Service levels for MQTT messages.
///
/// ```rust
/// use netglue::network::mqtt::QoS;
///
/// assert_eq!(QoS::from_raw(1), Some(QoS::AtLeastOnce));
/// assert_eq!(QoS::from_raw(3), None);
/// assert_eq!(QoS::ExactlyOnce as u8, 2);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce = 0,
    /// Acknowledged delivery, duplicates possible.
    AtLeastOnce = 1,
    /// Assured single delivery.
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_raw(qos: i32) -> Option<Self> {
        match qos {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

/// Connection lifecycle of an [`MqttClient`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Aggregate state of all subscriptions of an [`MqttClient`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub enum SubscriptionState {
    #[default]
    Unsubscribed,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

/// A message received on a subscribed topic.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    pub mid: MessageId,
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Last will the broker publishes when the client vanishes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Severity of a native log line.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

/// A callback of the native library.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// CONNACK arrived. `0` means accepted, see [`connack_string`].
    Connected(i32),
    /// The connection ended. `0` means the client asked for it.
    Disconnected(i32),
    /// A publish request completed.
    Published(MessageId),
    /// A message arrived.
    Message(Message),
    /// SUBACK arrived with the granted QoS of each requested pattern.
    Subscribed(MessageId, Vec<u8>),
    /// UNSUBACK arrived.
    Unsubscribed(MessageId),
    /// Native log line.
    Log(LogLevel, String),
    /// The library reported an error outside of any request.
    Error,
}

/// Reason for a CONNACK code.
pub fn connack_string(code: i32) -> &'static str {
    match code {
        0 => "Connection Accepted.",
        1 => "Connection Refused: unacceptable protocol version.",
        2 => "Connection Refused: identifier rejected.",
        3 => "Connection Refused: broker unavailable.",
        4 => "Connection Refused: bad user name or password.",
        5 => "Connection Refused: not authorised.",
        _ => "Connection Refused: unknown reason.",
    }
}

/// Reason for a disconnect code.
pub fn disconnect_reason(code: i32) -> &'static str {
    match code {
        0 => "disconnect requested by client",
        _ => "unexpected disconnect",
    }
}

/// Error codes of the native library.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Error {
    NoMemory,
    Protocol,
    Invalid,
    NoConnection,
    ConnectionRefused,
    NotFound,
    ConnectionLost,
    Tls,
    PayloadSize,
    NotSupported,
    Auth,
    AclDenied,
    /// Also returned when a call is made on a client that cannot accept it.
    Unknown,
    Errno,
    Lookup,
    Proxy,
    MalformedUtf8,
    Keepalive,
    Other(i32),
}

impl Error {
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => Error::NoMemory,
            2 => Error::Protocol,
            3 => Error::Invalid,
            4 => Error::NoConnection,
            5 => Error::ConnectionRefused,
            6 => Error::NotFound,
            7 => Error::ConnectionLost,
            8 => Error::Tls,
            9 => Error::PayloadSize,
            10 => Error::NotSupported,
            11 => Error::Auth,
            12 => Error::AclDenied,
            13 => Error::Unknown,
            14 => Error::Errno,
            15 => Error::Lookup,
            16 => Error::Proxy,
            18 => Error::MalformedUtf8,
            19 => Error::Keepalive,
            other => Error::Other(other),
        }
    }

    /// Map a native return code, where `0` means success.
    pub fn check(code: i32) -> Result<(), Self> {
        match code {
            0 => Ok(()),
            code => Err(Self::from_raw(code)),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Error::NoMemory => "Out of memory.",
            Error::Protocol => {
                "A network protocol error occurred when communicating with the broker."
            }
            Error::Invalid => "Invalid function arguments provided.",
            Error::NoConnection => "The client is not currently connected.",
            Error::ConnectionRefused => "The connection was refused.",
            Error::NotFound => "Message not found (internal error).",
            Error::ConnectionLost => "The connection was lost.",
            Error::Tls => "A TLS error occurred.",
            Error::PayloadSize => "Payload too large.",
            Error::NotSupported => "This feature is not supported.",
            Error::Auth => "Authorisation failed.",
            Error::AclDenied => "Access denied by ACL.",
            Error::Unknown => "Unknown error.",
            Error::Errno => "Error defined by errno.",
            Error::Lookup => "Lookup error.",
            Error::Proxy => "Proxy error.",
            Error::MalformedUtf8 => "Malformed UTF-8",
            Error::Keepalive => "Keepalive exceeded",
            Error::Other(_) => "Unknown error.",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.description())
    }
}

/// One native client instance.
///
/// Every call is non-blocking except [`connect`](Self::connect). Callbacks the
/// library makes during a call are queued and returned by
/// [`next_event`](Self::next_event).
pub trait Backend {
    /// Enable TLS, verifying the broker against the CA certificates in `ca_file`.
    fn tls_set(&mut self, ca_file: &Path) -> Result<(), Error>;
    fn username_pw_set(&mut self, username: &str, password: &str) -> Result<(), Error>;
    fn will_set(&mut self, will: &Will) -> Result<(), Error>;
    /// Connect to the broker. Blocks until the TCP (and TLS) handshake is done.
    fn connect(&mut self, host: &str, port: u16, keepalive: u16) -> Result<(), Error>;
    fn disconnect(&mut self) -> Result<(), Error>;
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<MessageId, Error>;
    fn subscribe(&mut self, pattern: &str, qos: QoS) -> Result<MessageId, Error>;
    fn unsubscribe(&mut self, pattern: &str) -> Result<MessageId, Error>;

    fn loop_read(&mut self) -> Result<(), Error>;
    fn loop_write(&mut self) -> Result<(), Error>;
    fn loop_misc(&mut self) -> Result<(), Error>;
    /// Whether the library has outgoing data queued.
    fn want_write(&self) -> bool;
    /// The client socket, `None` while not connected.
    fn socket(&self) -> Option<Descriptor>;
    fn tls_active(&self) -> bool;

    /// Next queued callback.
    fn next_event(&mut self) -> Option<Event>;
}
