//! Demo wiring between UI pages and the network components.
//!
//! Each page is a bundle of [`Property`] values a UI binds to. The demos own the
//! components, react to the `request_*` handlers the UI calls, and mirror the
//! components' state back into their page.
//!
//! [`App`] bundles all pages. The host keeps routing event-loop wakeups to the
//! components through [`TransferDemo::manager_mut`] and [`MqttDemo::client_mut`].

#![allow(missing_docs)]

use core::fmt;
use std::fs::File;
use std::path::Path;

use base64ct::{Base64, Encoding};
use log::{error, info};
use url::Url;

use crate::binding::Property;
use crate::config::DemoConfig;
use crate::network::EventLoop;
use crate::network::mqtt::{
    self, Backend, ConnectionState, Library, Message, MessageId, MqttClient, MqttLib, QoS,
    SubscriptionState, Will,
};
use crate::network::transfer::ftp::{FtpDownload, FtpUpload};
use crate::network::transfer::http::HttpTransfer;
use crate::network::transfer::{Multi, RegisterError, Token, TransferManager};

/// Shown instead of the page content when a fetch fails.
pub const DOWNLOAD_FAILED: &str = "Download failed";

/// Why a transfer request could not be started.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RequestError {
    /// The URL on the page does not parse.
    InvalidUrl,
    /// The local file cannot be opened.
    Io(std::io::ErrorKind),
    /// The transfer manager refused the transfer.
    Register(RegisterError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidUrl => f.write_str("invalid URL"),
            RequestError::Io(kind) => write!(f, "cannot open local file: {}", kind),
            RequestError::Register(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<RegisterError> for RequestError {
    fn from(e: RegisterError) -> Self {
        RequestError::Register(e)
    }
}

impl From<std::io::Error> for RequestError {
    fn from(e: std::io::Error) -> Self {
        RequestError::Io(e.kind())
    }
}

fn parse_url(url: &str) -> Result<Url, RequestError> {
    Url::parse(url).map_err(|e| {
        error!("cannot parse URL {:?}: {}", url, e);
        RequestError::InvalidUrl
    })
}

/// A counter page, the smallest possible demo.
#[derive(Debug, Clone, Default)]
pub struct CounterPage {
    pub counter: Property<i32>,
}

impl CounterPage {
    pub fn request_increase_counter(&self) {
        self.counter.set(self.counter.get().saturating_add(1));
    }
}

/// The HTTP query page.
#[derive(Debug, Clone)]
pub struct HttpPage {
    pub url: Property<String>,
    pub fetched_content: Property<String>,
}

/// The FTP download and upload page.
#[derive(Debug, Clone)]
pub struct FtpPage {
    pub url_download: Property<String>,
    pub url_upload: Property<String>,
    pub local_file: Property<String>,
    pub is_downloading: Property<bool>,
    pub is_uploading: Property<bool>,
    pub progress_percent_download: Property<u8>,
    pub progress_percent_upload: Property<u8>,
}

/// HTTP and FTP pages driven by one [`TransferManager`].
pub struct TransferDemo<M: Multi, L: EventLoop> {
    manager: TransferManager<M, L>,
    http_verbose: bool,
    download_verbose: bool,
    upload_verbose: bool,
    pub http: HttpPage,
    pub ftp: FtpPage,
}

impl<M: Multi, L: EventLoop> TransferDemo<M, L>
where
    M::Easy: 'static,
{
    pub fn new(config: &DemoConfig, manager: TransferManager<M, L>) -> Self {
        Self {
            manager,
            http_verbose: config.http.verbose,
            download_verbose: config.ftp.verbose_download,
            upload_verbose: config.ftp.verbose_upload,
            http: HttpPage {
                url: Property::new(config.http.url.as_str().into()),
                fetched_content: Property::new(String::new()),
            },
            ftp: FtpPage {
                url_download: Property::new(config.ftp.download_url.as_str().into()),
                url_upload: Property::new(config.ftp.upload_url.as_str().into()),
                local_file: Property::new(config.ftp.local_file.as_str().into()),
                is_downloading: Property::new(false),
                is_uploading: Property::new(false),
                progress_percent_download: Property::new(0),
                progress_percent_upload: Property::new(0),
            },
        }
    }

    /// Fetch the page URL into `fetched_content`.
    pub fn request_http_query(&mut self) -> Result<Token, RequestError> {
        let url = parse_url(&self.http.url.get())?;
        let transfer = HttpTransfer::new(self.manager.easy(), url, self.http_verbose);

        let fetched_content = self.http.fetched_content.clone();
        transfer.finished.connect(move |reply| {
            let content = if reply.code.is_ok() {
                reply.content.clone()
            } else {
                DOWNLOAD_FAILED.to_owned()
            };
            fetched_content.set(content);
        });

        Ok(self.manager.register(transfer)?)
    }

    /// Download the FTP URL into the local file.
    pub fn request_ftp_download(&mut self) -> Result<Token, RequestError> {
        let url = parse_url(&self.ftp.url_download.get())?;
        let file = File::create(self.ftp.local_file.get()).inspect_err(|e| {
            error!("cannot create {}: {}", self.ftp.local_file.get(), e);
        })?;
        let transfer = FtpDownload::new(self.manager.easy(), file, url, self.download_verbose);

        let progress = self.ftp.progress_percent_download.clone();
        transfer
            .progress
            .percent
            .value_changed()
            .connect(move |percent| {
                progress.set(*percent);
            });
        let is_downloading = self.ftp.is_downloading.clone();
        transfer.finished.connect(move |report| {
            info!("downloaded {} bytes", report.bytes_transferred);
            is_downloading.set(false);
        });

        let token = self.manager.register(transfer)?;
        self.ftp.progress_percent_download.set(0);
        self.ftp.is_downloading.set(true);
        Ok(token)
    }

    /// Upload the local file to the FTP URL.
    pub fn request_ftp_upload(&mut self) -> Result<Token, RequestError> {
        let url = parse_url(&self.ftp.url_upload.get())?;
        let file = File::open(self.ftp.local_file.get()).inspect_err(|e| {
            error!("cannot open {}: {}", self.ftp.local_file.get(), e);
        })?;
        let transfer = FtpUpload::from_file(self.manager.easy(), file, url, self.upload_verbose)?;

        let progress = self.ftp.progress_percent_upload.clone();
        transfer
            .progress
            .percent
            .value_changed()
            .connect(move |percent| {
                progress.set(*percent);
            });
        let is_uploading = self.ftp.is_uploading.clone();
        transfer.finished.connect(move |report| {
            info!("uploaded {} bytes", report.bytes_transferred);
            is_uploading.set(false);
        });

        let token = self.manager.register(transfer)?;
        self.ftp.progress_percent_upload.set(0);
        self.ftp.is_uploading.set(true);
        Ok(token)
    }

    pub fn manager(&self) -> &TransferManager<M, L> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut TransferManager<M, L> {
        &mut self.manager
    }
}

impl<M: Multi, L: EventLoop> fmt::Debug for TransferDemo<M, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferDemo")
            .field("http", &self.http)
            .field("ftp", &self.ftp)
            .finish()
    }
}

/// The MQTT session page.
#[derive(Debug, Clone)]
pub struct MqttPage {
    pub host: Property<String>,
    pub port: Property<u16>,
    pub keepalive: Property<u16>,
    pub set_username_and_password_on_connect: Property<bool>,
    pub username: Property<String>,
    pub password: Property<String>,
    pub set_ca_file_path_on_connect: Property<bool>,
    pub ca_file_path: Property<String>,
    pub set_last_will_on_connect: Property<bool>,
    pub last_will_topic: Property<String>,
    pub last_will_payload: Property<String>,
    pub topic: Property<String>,
    pub payload: Property<String>,
    pub is_topic_valid: Property<bool>,
    pub connection_state: Property<ConnectionState>,
    pub subscription_state: Property<SubscriptionState>,
    pub subscribed_topics: Property<Vec<String>>,
    /// Last received message as `topic - payload`.
    pub message: Property<String>,
}

impl MqttPage {
    fn new(config: &DemoConfig) -> Self {
        let mqtt = &config.mqtt;
        Self {
            host: Property::new(mqtt.host.as_str().into()),
            port: Property::new(mqtt.port),
            keepalive: Property::new(mqtt.keepalive),
            set_username_and_password_on_connect: Property::new(mqtt.use_credentials),
            username: Property::new(mqtt.username.as_str().into()),
            password: Property::new(mqtt.password.as_str().into()),
            set_ca_file_path_on_connect: Property::new(mqtt.use_tls),
            ca_file_path: Property::new(mqtt.ca_file.as_str().into()),
            set_last_will_on_connect: Property::new(mqtt.use_will),
            last_will_topic: Property::new(mqtt.will_topic.as_str().into()),
            last_will_payload: Property::new(mqtt.will_payload.as_str().into()),
            topic: Property::new(mqtt.topic.as_str().into()),
            payload: Property::new(mqtt.payload.as_str().into()),
            is_topic_valid: Property::new(false),
            connection_state: Property::new(ConnectionState::Disconnected),
            subscription_state: Property::new(SubscriptionState::Unsubscribed),
            subscribed_topics: Property::new(Vec::new()),
            message: Property::new(String::new()),
        }
    }
}

/// Text shown for a received payload: UTF-8 as is, anything else base64-encoded.
pub fn payload_text(payload: &[u8]) -> String {
    match core::str::from_utf8(payload) {
        Ok(text) => text.to_owned(),
        Err(_) => Base64::encode_string(payload),
    }
}

fn message_text(message: &Message) -> String {
    format!("{} - {}", message.topic, payload_text(&message.payload))
}

/// The MQTT page driven by one [`MqttClient`].
///
/// Initializes the library on construction and cleans it up on drop.
pub struct MqttDemo<B: Backend, L: EventLoop, Lib: Library> {
    lib: MqttLib<Lib>,
    client: MqttClient<B, L>,
    pub page: MqttPage,
}

impl<B: Backend, L: EventLoop, Lib: Library> MqttDemo<B, L, Lib> {
    /// Initialize the library, then create the native client through
    /// `new_backend` with the configured client id and clean-session flag.
    pub fn new(
        config: &DemoConfig,
        mut lib: MqttLib<Lib>,
        new_backend: impl FnOnce(&str, bool) -> B,
        event_loop: L,
    ) -> Self {
        if let Err(e) = lib.init() {
            error!("cannot initialize MQTT library: {}", e);
        }
        let mqtt = &config.mqtt;
        info!(
            "creating MQTT client {} (clean session: {})",
            mqtt.client_id, mqtt.clean_session
        );
        let backend = new_backend(mqtt.client_id.as_str(), mqtt.clean_session);
        let client = MqttClient::new(&lib, backend, event_loop, config.mqtt.verbose);
        let page = MqttPage::new(config);

        let connection_state = page.connection_state.clone();
        client
            .connection_state
            .value_changed()
            .connect(move |state| {
                connection_state.set(*state);
            });
        let subscription_state = page.subscription_state.clone();
        client
            .subscription_state
            .value_changed()
            .connect(move |state| {
                subscription_state.set(*state);
            });
        let subscribed_topics = page.subscribed_topics.clone();
        client.subscriptions.value_changed().connect(move |topics| {
            subscribed_topics.set(topics.clone());
        });
        let message = page.message.clone();
        client.message_received.connect(move |received| {
            message.set(message_text(received));
        });

        let mut demo = Self { lib, client, page };
        demo.user_edited_topic();
        demo
    }

    /// Revalidate the topic field.
    pub fn user_edited_topic(&mut self) {
        let valid = self
            .lib
            .is_valid_topic_name_for_subscription(&self.page.topic.get());
        self.page.is_topic_valid.set(valid);
    }

    /// Apply the optional will, TLS and credentials settings of the page, then
    /// connect.
    pub fn request_mqtt_connect(&mut self) -> Result<(), mqtt::Error> {
        let page = &self.page;
        if page.set_last_will_on_connect.get() {
            self.client.set_will(&Will {
                topic: page.last_will_topic.get(),
                payload: page.last_will_payload.get().into_bytes(),
                qos: QoS::AtMostOnce,
                retain: false,
            })?;
        }
        if page.set_ca_file_path_on_connect.get() {
            self.client.set_tls(Path::new(&page.ca_file_path.get()))?;
        }
        if page.set_username_and_password_on_connect.get() {
            self.client
                .set_username_and_password(&page.username.get(), &page.password.get())?;
        }
        self.client
            .connect(&page.host.get(), page.port.get(), page.keepalive.get())
    }

    pub fn request_mqtt_disconnect(&mut self) -> Result<(), mqtt::Error> {
        self.client.disconnect()
    }

    /// Subscribe to the topic field.
    pub fn request_mqtt_subscribe(&mut self) -> Result<MessageId, mqtt::Error> {
        self.client.subscribe(&self.page.topic.get(), QoS::AtMostOnce)
    }

    /// Unsubscribe from one of the subscribed topics.
    pub fn request_mqtt_unsubscribe(&mut self, topic: &str) -> Result<MessageId, mqtt::Error> {
        self.client.unsubscribe(topic)
    }

    /// Publish the payload field to the topic field.
    pub fn request_mqtt_publish(&mut self) -> Result<MessageId, mqtt::Error> {
        let payload = self.page.payload.get();
        self.client.publish(
            &self.page.topic.get(),
            payload.as_bytes(),
            QoS::AtMostOnce,
            false,
        )
    }

    pub fn client(&self) -> &MqttClient<B, L> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut MqttClient<B, L> {
        &mut self.client
    }

    pub fn lib(&self) -> &MqttLib<Lib> {
        &self.lib
    }
}

impl<B: Backend, L: EventLoop, Lib: Library> Drop for MqttDemo<B, L, Lib> {
    fn drop(&mut self) {
        if let Err(e) = self.lib.cleanup() {
            error!("cannot clean up MQTT library: {}", e);
        }
    }
}

impl<B: Backend, L: EventLoop, Lib: Library> fmt::Debug for MqttDemo<B, L, Lib> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttDemo")
            .field("client", &self.client)
            .field("page", &self.page)
            .finish()
    }
}

/// Every demo page of the application.
///
/// Request handlers are forwarded to the demo owning the page. The two network
/// components get their own event-loop handles so the host can route wakeups.
pub struct App<M: Multi, TL: EventLoop, B: Backend, ML: EventLoop, Lib: Library> {
    pub counter: CounterPage,
    pub transfers: TransferDemo<M, TL>,
    pub mqtt: MqttDemo<B, ML, Lib>,
}

impl<M, TL, B, ML, Lib> App<M, TL, B, ML, Lib>
where
    M: Multi,
    M::Easy: 'static,
    TL: EventLoop,
    B: Backend,
    ML: EventLoop,
    Lib: Library,
{
    /// `new_backend` creates the native MQTT client, see [`MqttDemo::new`].
    pub fn new(
        config: &DemoConfig,
        multi: M,
        transfer_loop: TL,
        lib: MqttLib<Lib>,
        new_backend: impl FnOnce(&str, bool) -> B,
        mqtt_loop: ML,
    ) -> Self {
        Self {
            counter: CounterPage::default(),
            transfers: TransferDemo::new(config, TransferManager::new(multi, transfer_loop)),
            mqtt: MqttDemo::new(config, lib, new_backend, mqtt_loop),
        }
    }

    pub fn request_increase_counter(&self) {
        self.counter.request_increase_counter();
    }

    pub fn request_http_query(&mut self) -> Result<Token, RequestError> {
        self.transfers.request_http_query()
    }

    pub fn request_ftp_download(&mut self) -> Result<Token, RequestError> {
        self.transfers.request_ftp_download()
    }

    pub fn request_ftp_upload(&mut self) -> Result<Token, RequestError> {
        self.transfers.request_ftp_upload()
    }

    pub fn user_edited_topic(&mut self) {
        self.mqtt.user_edited_topic();
    }

    pub fn request_mqtt_connect(&mut self) -> Result<(), mqtt::Error> {
        self.mqtt.request_mqtt_connect()
    }

    pub fn request_mqtt_disconnect(&mut self) -> Result<(), mqtt::Error> {
        self.mqtt.request_mqtt_disconnect()
    }

    pub fn request_mqtt_subscribe(&mut self) -> Result<MessageId, mqtt::Error> {
        self.mqtt.request_mqtt_subscribe()
    }

    pub fn request_mqtt_unsubscribe(&mut self, topic: &str) -> Result<MessageId, mqtt::Error> {
        self.mqtt.request_mqtt_unsubscribe(topic)
    }

    pub fn request_mqtt_publish(&mut self) -> Result<MessageId, mqtt::Error> {
        self.mqtt.request_mqtt_publish()
    }
}

impl<M, TL, B, ML, Lib> fmt::Debug for App<M, TL, B, ML, Lib>
where
    M: Multi,
    TL: EventLoop,
    B: Backend,
    ML: EventLoop,
    Lib: Library,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("counter", &self.counter)
            .field("transfers", &self.transfers)
            .field("mqtt", &self.mqtt)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments() {
        let page = CounterPage::default();
        page.request_increase_counter();
        page.request_increase_counter();
        assert_eq!(page.counter.get(), 2);
    }

    #[test]
    fn test_payload_text() {
        assert_eq!(payload_text(b"DEADBEEF"), "DEADBEEF");
        assert_eq!(payload_text(&[0xde, 0xad, 0xbe, 0xef]), "3q2+7w==");
        assert_eq!(payload_text(b""), "");
    }
}
