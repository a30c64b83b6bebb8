//! Process-wide library initialization.

use log::{info, warn};

use super::{Error, topic};

/// Process-wide entry points of the native library.
pub trait Library {
    fn init(&mut self) -> Result<(), Error>;
    fn cleanup(&mut self) -> Result<(), Error>;
    /// `(major, minor, revision)`
    fn version(&self) -> (u32, u32, u32);

    /// Validate a subscription pattern.
    fn sub_topic_check(&self, topic: &str) -> Result<(), Error> {
        topic::check_subscription(topic)
    }
}

/// Tracks whether the native library is initialized.
///
/// Clients must only be created between [`init`](Self::init) and
/// [`cleanup`](Self::cleanup).
#[derive(Debug)]
pub struct MqttLib<L: Library> {
    library: L,
    initialized: bool,
}

impl<L: Library> MqttLib<L> {
    pub fn new(library: L) -> Self {
        Self {
            library,
            initialized: false,
        }
    }

    /// Initialize the native library. A second call only warns.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.initialized {
            warn!("MQTT library is already initialized");
            return Ok(());
        }
        self.library.init()?;
        self.initialized = true;
        let (major, minor, revision) = self.library.version();
        info!("MQTT library {}.{}.{} initialized", major, minor, revision);
        Ok(())
    }

    pub fn cleanup(&mut self) -> Result<(), Error> {
        if !self.initialized {
            warn!("MQTT library is not initialized");
            return Ok(());
        }
        self.library.cleanup()?;
        self.initialized = false;
        info!("MQTT library cleaned up");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_valid_topic_name_for_subscription(&self, topic: &str) -> bool {
        self.library.sub_topic_check(topic).is_ok()
    }

    pub fn library(&self) -> &L {
        &self.library
    }
}
