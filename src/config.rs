//! Demo configuration.
//!
//! The demo reads its start values from a small JSON document. Every field is
//! optional; missing fields keep their defaults.
//!
//! ```rust
//! use netglue::config::DemoConfig;
//!
//! let config = DemoConfig::from_json(r#"{"mqtt": {"host": "broker.local", "port": 8883}}"#).unwrap();
//! assert_eq!(config.mqtt.host.as_str(), "broker.local");
//! assert_eq!(config.mqtt.port, 8883);
//! assert_eq!(config.http.url.as_str(), "https://example.com");
//! ```

use core::fmt;

use heapless::String;
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

/// Capacity of every text field.
pub const TEXT_CAPACITY: usize = 256;

/// Bounded text field.
pub type Text = String<TEXT_CAPACITY>;

/// Text for a built-in default. Every default is well below [`TEXT_CAPACITY`].
fn text(value: &str) -> Text {
    let mut text = Text::new();
    let pushed = text.push_str(value);
    debug_assert!(pushed.is_ok(), "default {:?} exceeds TEXT_CAPACITY", value);
    text
}

/// Error returned when a configuration cannot be used.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The document is not valid JSON for this configuration, or a text field is
    /// longer than [`TEXT_CAPACITY`].
    Malformed,
    /// A URL field does not parse.
    InvalidUrl,
    /// The MQTT port is zero.
    InvalidPort,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Malformed => f.write_str("malformed configuration"),
            Error::InvalidUrl => f.write_str("invalid URL in configuration"),
            Error::InvalidPort => f.write_str("invalid MQTT port in configuration"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Malformed => defmt::write!(f, "Malformed"),
            Error::InvalidUrl => defmt::write!(f, "InvalidUrl"),
            Error::InvalidPort => defmt::write!(f, "InvalidPort"),
        }
    }
}

/// HTTP page defaults.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Page fetched by the HTTP query.
    pub url: Text,
    /// Verbose native logging for the query.
    pub verbose: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: text("https://example.com"),
            verbose: true,
        }
    }
}

/// FTP page defaults.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    /// Source of the download.
    pub download_url: Text,
    /// Target of the upload.
    pub upload_url: Text,
    /// Local file the download writes and the upload reads.
    pub local_file: Text,
    /// Verbose native logging for downloads.
    pub verbose_download: bool,
    /// Verbose native logging for uploads.
    pub verbose_upload: bool,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            download_url: text("ftp://ftp-stud.hs-esslingen.de/debian/ls-lR.gz"),
            upload_url: text("ftp://ftp.cs.brown.edu/incoming/ls-lR.gz"),
            local_file: text("ls-lR.gz"),
            verbose_download: false,
            verbose_upload: true,
        }
    }
}

/// MQTT page defaults.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Client id the native client is created with.
    pub client_id: Text,
    /// Ask the broker to discard the previous session on connect.
    pub clean_session: bool,
    /// Log every native log line at info level.
    pub verbose: bool,
    /// Broker host.
    pub host: Text,
    /// Broker port, never zero.
    pub port: u16,
    /// Keepalive interval in seconds.
    pub keepalive: u16,
    /// Send `username` and `password` on connect.
    pub use_credentials: bool,
    /// Username sent when `use_credentials` is set.
    pub username: Text,
    /// Password sent when `use_credentials` is set.
    pub password: Text,
    /// Enable TLS with `ca_file` on connect.
    pub use_tls: bool,
    /// CA certificate file for TLS.
    pub ca_file: Text,
    /// Register the last will on connect.
    pub use_will: bool,
    /// Topic of the last will.
    pub will_topic: Text,
    /// Payload of the last will.
    pub will_payload: Text,
    /// Initial subscribe and publish topic.
    pub topic: Text,
    /// Initial publish payload.
    pub payload: Text,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: text("netglue-demo"),
            clean_session: true,
            verbose: true,
            host: text("test.mosquitto.org"),
            port: crate::network::mqtt::DEFAULT_PORT,
            keepalive: crate::network::mqtt::DEFAULT_KEEPALIVE,
            use_credentials: true,
            username: text("ro"),
            password: text("readonly"),
            use_tls: false,
            ca_file: text("mosquitto.org.crt"),
            use_will: true,
            will_topic: text("farewell"),
            will_payload: text("boot(m_incarnations[++i]);"),
            topic: text("my_test_topic"),
            payload: text("DEADBEEF"),
        }
    }
}

/// Start values of every demo page.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// HTTP page.
    pub http: HttpConfig,
    /// FTP page.
    pub ftp: FtpConfig,
    /// MQTT page.
    pub mqtt: MqttConfig,
}

impl DemoConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse and validate a JSON document given as bytes.
    pub fn from_slice(json: &[u8]) -> Result<Self, Error> {
        let (config, _) = serde_json_core::from_slice::<DemoConfig>(json).map_err(|e| {
            debug!("cannot parse configuration: {:?}", e);
            Error::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields a plain JSON parse cannot.
    pub fn validate(&self) -> Result<(), Error> {
        self.http_url()?;
        self.ftp_download_url()?;
        self.ftp_upload_url()?;
        if self.mqtt.port == 0 {
            return Err(Error::InvalidPort);
        }
        Ok(())
    }

    /// The HTTP page URL, parsed.
    pub fn http_url(&self) -> Result<Url, Error> {
        parse_url(&self.http.url)
    }

    /// The FTP download URL, parsed.
    pub fn ftp_download_url(&self) -> Result<Url, Error> {
        parse_url(&self.ftp.download_url)
    }

    /// The FTP upload URL, parsed.
    pub fn ftp_upload_url(&self) -> Result<Url, Error> {
        parse_url(&self.ftp.upload_url)
    }
}

fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| {
        debug!("cannot parse URL {:?}: {}", url, e);
        Error::InvalidUrl
    })
}
