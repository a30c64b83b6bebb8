//! The MQTT client facade.

use std::path::Path;
use std::time::Instant;

use log::{debug, error, info, warn};

use super::library::{Library, MqttLib};
use super::registry::SubscriptionRegistry;
use super::{
    Backend, ConnectionState, Error, Event, LogLevel, Message, MessageId, QoS, SubscriptionState,
    Will, connack_string, disconnect_reason,
};
use crate::binding::{Property, Signal};
use crate::network::timer::{HOUSEKEEPING_INTERVAL, PeriodicTimer};
use crate::network::{Descriptor, Direction, Error as NetError, EventLoop, Wakeup};

/// Read and write watchers on the client socket plus the housekeeping tick.
struct EventLoopHook<L: EventLoop> {
    event_loop: L,
    watchers: Option<(L::Watcher, L::Watcher)>,
    housekeeping: PeriodicTimer<L::Timer>,
}

impl<L: EventLoop> EventLoopHook<L> {
    fn new(mut event_loop: L) -> Self {
        let housekeeping = PeriodicTimer::new(event_loop.timer(), HOUSEKEEPING_INTERVAL);
        Self {
            event_loop,
            watchers: None,
            housekeeping,
        }
    }

    fn engage(&mut self, socket: Option<Descriptor>) -> Result<(), NetError> {
        if self.is_engaged() {
            error!("event loop hook is already engaged");
            return Err(NetError::AlreadyWatched);
        }
        let Some(fd) = socket.filter(|fd| *fd >= 0) else {
            error!("cannot hook into the event loop without a client socket");
            return Err(NetError::InvalidDescriptor);
        };
        let read = self.event_loop.watch(fd, Direction::Read).inspect_err(|e| {
            error!("cannot watch MQTT socket {} for read: {}", fd, e);
        })?;
        let write = self.event_loop.watch(fd, Direction::Write).inspect_err(|e| {
            error!("cannot watch MQTT socket {} for write: {}", fd, e);
        })?;
        self.watchers = Some((read, write));
        self.housekeeping.start();
        debug!("event loop hook engaged on socket {}", fd);
        Ok(())
    }

    fn disengage(&mut self) {
        if !self.is_engaged() {
            debug!("event loop hook is not engaged");
            return;
        }
        self.housekeeping.stop();
        self.watchers = None;
        debug!("event loop hook disengaged");
    }

    fn is_engaged(&self) -> bool {
        self.watchers.is_some()
    }
}

/// An MQTT session driven from the host event loop.
///
/// Requests are refused with [`Error::Unknown`] when the connection state does not
/// allow them; nothing is sent to the native client in that case. Failures of the
/// native client are returned as they are and leave the state untouched.
///
/// | request | allowed while |
/// |---|---|
/// | [`set_tls`](Self::set_tls), [`set_username_and_password`](Self::set_username_and_password), [`set_will`](Self::set_will) | `Disconnected` |
/// | [`connect`](Self::connect) | `Disconnected` |
/// | [`disconnect`](Self::disconnect) | `Connecting`, `Connected` |
/// | [`subscribe`](Self::subscribe), [`unsubscribe`](Self::unsubscribe), [`publish`](Self::publish) | anything but `Disconnected` |
pub struct MqttClient<B: Backend, L: EventLoop> {
    backend: B,
    hook: EventLoopHook<L>,
    registry: SubscriptionRegistry,
    verbose: bool,

    pub connection_state: Property<ConnectionState>,
    pub subscription_state: Property<SubscriptionState>,
    /// Active subscriptions in ascending order.
    pub subscriptions: Property<Vec<String>>,

    /// A publish request completed.
    pub published: Signal<MessageId>,
    pub message_received: Signal<Message>,
    /// The native library reported an error.
    pub error: Signal<()>,
}

impl<B: Backend, L: EventLoop> MqttClient<B, L> {
    pub fn new<Lib: Library>(lib: &MqttLib<Lib>, backend: B, event_loop: L, verbose: bool) -> Self {
        if !lib.is_initialized() {
            warn!("creating an MQTT client before the library is initialized");
        }
        Self {
            backend,
            hook: EventLoopHook::new(event_loop),
            registry: SubscriptionRegistry::new(),
            verbose,
            connection_state: Property::new(ConnectionState::Disconnected),
            subscription_state: Property::new(SubscriptionState::Unsubscribed),
            subscriptions: Property::new(Vec::new()),
            published: Signal::new(),
            message_received: Signal::new(),
            error: Signal::new(),
        }
    }

    fn refuse(&self, request: &str) -> Error {
        error!(
            "refusing {} while {:?}",
            request,
            self.connection_state.get()
        );
        Error::Unknown
    }

    fn require_disconnected(&self, request: &str) -> Result<(), Error> {
        match self.connection_state.get() {
            ConnectionState::Disconnected => Ok(()),
            _ => Err(self.refuse(request)),
        }
    }

    fn require_session(&self, request: &str) -> Result<(), Error> {
        match self.connection_state.get() {
            ConnectionState::Disconnected => Err(self.refuse(request)),
            _ => Ok(()),
        }
    }

    fn native<T>(request: &str, result: Result<T, Error>) -> Result<T, Error> {
        result.inspect_err(|e| error!("{} failed: {}", request, e))
    }

    /// Enable TLS using the CA certificates in `ca_file`.
    pub fn set_tls(&mut self, ca_file: &Path) -> Result<(), Error> {
        self.require_disconnected("set_tls")?;
        if !ca_file.exists() {
            error!("CA file {} does not exist", ca_file.display());
            return Err(Error::Invalid);
        }
        Self::native("set_tls", self.backend.tls_set(ca_file))
    }

    pub fn set_username_and_password(&mut self, username: &str, password: &str) -> Result<(), Error> {
        self.require_disconnected("set_username_and_password")?;
        Self::native(
            "set_username_and_password",
            self.backend.username_pw_set(username, password),
        )
    }

    pub fn set_will(&mut self, will: &Will) -> Result<(), Error> {
        self.require_disconnected("set_will")?;
        Self::native("set_will", self.backend.will_set(will))
    }

    /// Connect to the broker.
    ///
    /// This blocks for the duration of the native connect call. On success the
    /// client socket is hooked into the event loop and the state stays
    /// `Connecting` until the broker acknowledges. If the native call fails the
    /// state also stays `Connecting`; a later [`disconnect`](Self::disconnect)
    /// resets it.
    ///
    /// A socket that cannot be hooked is disconnected again and reported as
    /// [`Error::NoConnection`], leaving the client `Disconnected`.
    pub fn connect(&mut self, host: &str, port: u16, keepalive: u16) -> Result<(), Error> {
        self.require_disconnected("connect")?;
        if self.hook.is_engaged() {
            // Left over from an attempt the broker refused.
            debug!("releasing the hook of the previous connection");
            self.hook.disengage();
        }
        self.connection_state.set(ConnectionState::Connecting);

        let started = Instant::now();
        let result = self.backend.connect(host, port, keepalive);
        info!(
            "connect to {}:{} took {} ms",
            host,
            port,
            started.elapsed().as_millis()
        );
        Self::native("connect", result)?;

        if self.verbose {
            info!(
                "TLS is {}",
                if self.backend.tls_active() { "active" } else { "inactive" }
            );
        }
        if let Err(e) = self.hook.engage(self.backend.socket()) {
            error!("dropping connection to {}:{}: {}", host, port, e);
            if let Err(e) = self.backend.disconnect() {
                debug!("disconnect after a failed hook returned: {}", e);
            }
            self.connection_state.set(ConnectionState::Disconnected);
            return Err(Error::NoConnection);
        }
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<(), Error> {
        match self.connection_state.get() {
            ConnectionState::Disconnecting | ConnectionState::Disconnected => {
                return Err(self.refuse("disconnect"));
            }
            ConnectionState::Connecting | ConnectionState::Connected => {}
        }
        match self.backend.disconnect() {
            Ok(()) => {
                self.connection_state.set(ConnectionState::Disconnecting);
                Ok(())
            }
            Err(Error::NoConnection) => {
                // Nothing will report the end of a connection that never existed.
                warn!("disconnect without a connection, resetting state");
                self.on_disconnected(0);
                Ok(())
            }
            Err(e) => Self::native("disconnect", Err(e)),
        }
    }

    pub fn subscribe(&mut self, pattern: &str, qos: QoS) -> Result<MessageId, Error> {
        self.require_session("subscribe")?;
        let mid = Self::native("subscribe", self.backend.subscribe(pattern, qos))?;
        debug!("subscribe to {} requested as message {}", pattern, mid);
        self.registry.subscribe_requested(mid, pattern);
        self.subscription_state.set(SubscriptionState::Subscribing);
        Ok(mid)
    }

    pub fn unsubscribe(&mut self, pattern: &str) -> Result<MessageId, Error> {
        self.require_session("unsubscribe")?;
        let mid = Self::native("unsubscribe", self.backend.unsubscribe(pattern))?;
        debug!("unsubscribe from {} requested as message {}", pattern, mid);
        self.registry.unsubscribe_requested(mid, pattern);
        self.subscription_state.set(SubscriptionState::Unsubscribing);
        Ok(mid)
    }

    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<MessageId, Error> {
        self.require_session("publish")?;
        Self::native("publish", self.backend.publish(topic, payload, qos, retain))
    }

    /// Entry point for the host event loop.
    pub fn wake(&mut self, wakeup: Wakeup) {
        let result = match wakeup {
            Wakeup::Ready(_, Direction::Read) => self.backend.loop_read(),
            Wakeup::Ready(_, Direction::Write) => {
                if self.backend.want_write() {
                    self.backend.loop_write()
                } else {
                    Ok(())
                }
            }
            Wakeup::Timeout => self.backend.loop_misc(),
        };
        if let Err(e) = result {
            debug!("loop step for {:?} returned: {}", wakeup, e);
        }
        self.dispatch_events();
    }

    fn dispatch_events(&mut self) {
        while let Some(event) = self.backend.next_event() {
            self.handle_event(event);
        }
    }

    /// Apply a callback of the native library.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected(code) => self.on_connected(code),
            Event::Disconnected(code) => self.on_disconnected(code),
            Event::Published(mid) => {
                debug!("message {} published", mid);
                self.published.emit(&mid);
            }
            Event::Message(message) => {
                debug!(
                    "message {} on {} with {} bytes",
                    message.mid,
                    message.topic,
                    message.payload.len()
                );
                self.message_received.emit(&message);
            }
            Event::Subscribed(mid, granted) => self.on_subscribed(mid, &granted),
            Event::Unsubscribed(mid) => self.on_unsubscribed(mid),
            Event::Log(level, line) => self.on_log(level, &line),
            Event::Error => {
                error!("MQTT client reported an error");
                self.error.emit(&());
            }
        }
    }

    fn on_connected(&mut self, code: i32) {
        if code == 0 {
            info!("connected: {}", connack_string(code));
            self.connection_state.set(ConnectionState::Connected);
        } else {
            error!("connection failed: {}", connack_string(code));
            self.connection_state.set(ConnectionState::Disconnected);
        }
    }

    fn on_disconnected(&mut self, code: i32) {
        if code == 0 {
            info!("disconnected: {}", disconnect_reason(code));
        } else {
            warn!("disconnected: {} ({})", disconnect_reason(code), code);
        }
        self.hook.disengage();
        self.connection_state.set(ConnectionState::Disconnected);

        if self.registry.pending_len() > 0 {
            debug!(
                "dropping {} unacknowledged subscription requests",
                self.registry.pending_len()
            );
            self.registry.clear_pending();
            self.subscription_state.set(self.registry.settled_state());
        }
    }

    fn on_subscribed(&mut self, mid: MessageId, granted: &[u8]) {
        if granted.len() != 1 {
            warn!(
                "subscription {} acknowledged with {} granted QoS values, using the first",
                mid,
                granted.len()
            );
        }
        let Some(&qos) = granted.first() else {
            return;
        };
        if let Some(topic) = self.registry.subscribe_acknowledged(mid, qos) {
            info!("subscribed to {} with QoS {}", topic, qos);
            self.publish_subscriptions();
        }
    }

    fn on_unsubscribed(&mut self, mid: MessageId) {
        if let Some(topic) = self.registry.unsubscribe_acknowledged(mid) {
            info!("unsubscribed from {}", topic);
            self.publish_subscriptions();
        }
    }

    fn publish_subscriptions(&mut self) {
        self.subscription_state.set(self.registry.settled_state());
        self.subscriptions.set(self.registry.subscribed_topics());
    }

    fn on_log(&self, level: LogLevel, line: &str) {
        if self.verbose {
            info!("mosquitto: {}", line);
        } else {
            match level {
                LogLevel::Error => error!("mosquitto: {}", line),
                LogLevel::Warning => warn!("mosquitto: {}", line),
                LogLevel::Notice | LogLevel::Info | LogLevel::Debug => {
                    debug!("mosquitto: {}", line)
                }
            }
        }
    }

    /// Whether the client socket is hooked into the event loop.
    pub fn is_hooked(&self) -> bool {
        self.hook.is_engaged()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend, L: EventLoop> Drop for MqttClient<B, L> {
    fn drop(&mut self) {
        self.hook.disengage();
    }
}

impl<B: Backend, L: EventLoop> core::fmt::Debug for MqttClient<B, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttClient")
            .field("connection_state", &self.connection_state.get())
            .field("subscription_state", &self.subscription_state.get())
            .field("hooked", &self.hook.is_engaged())
            .field("registry", &self.registry)
            .finish()
    }
}
