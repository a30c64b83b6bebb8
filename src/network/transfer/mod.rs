//! Multi-transfer manager and transfer handles.
//!
//! This module models a cooperative multi-transfer library (the libcurl "multi
//! socket" interface) behind two traits:
//!
//! - [`Multi`]: the multi handle that drives many transfers at once, and
//! - [`Easy`]: one native transfer handle carrying per-transfer options.
//!
//! While the manager calls into the multi handle, the library reports socket
//! interest, deadline requests and transfer data through [`MultiHooks`]. The hooks
//! are passed into every call that may trigger them, so nothing in this crate keeps
//! a pointer back into the manager.
//!
//! Transfers themselves implement [`Transfer`]. Three are provided:
//!
//! - [`http::HttpTransfer`]: collects a response body in memory
//! - [`ftp::FtpDownload`]: streams a remote file into a writer with progress
//! - [`ftp::FtpUpload`]: streams a reader to a remote file with progress

use core::fmt;
use std::sync::Once;

use log::{debug, error, warn};
use url::Url;

use super::Descriptor;
use super::Direction;
use super::notifier::PollEvent;

/// FTP download and upload handles
pub mod ftp;

/// In-memory HTTP handle
pub mod http;

/// The transfer manager
pub mod manager;

pub use manager::TransferManager;

/// Identifies a registered transfer towards the native library.
///
/// This plays the role of the native per-handle private pointer: the manager
/// hands it to [`Multi::add`] and receives it back in hooks and done messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Token(pub u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result code of a finished transfer or of setting a transfer option.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TransferCode {
    Ok,
    UnsupportedProtocol,
    FailedInit,
    UrlMalformat,
    CouldntResolveHost,
    CouldntConnect,
    RemoteAccessDenied,
    PartialFile,
    HttpReturnedError,
    WriteError,
    UploadFailed,
    ReadError,
    OutOfMemory,
    OperationTimedout,
    SslConnectError,
    AbortedByCallback,
    GotNothing,
    SendError,
    RecvError,
    LoginDenied,
    RemoteFileNotFound,
    /// Any code without a dedicated variant.
    Other(i32),
}

impl TransferCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => TransferCode::Ok,
            1 => TransferCode::UnsupportedProtocol,
            2 => TransferCode::FailedInit,
            3 => TransferCode::UrlMalformat,
            6 => TransferCode::CouldntResolveHost,
            7 => TransferCode::CouldntConnect,
            9 => TransferCode::RemoteAccessDenied,
            18 => TransferCode::PartialFile,
            22 => TransferCode::HttpReturnedError,
            23 => TransferCode::WriteError,
            25 => TransferCode::UploadFailed,
            26 => TransferCode::ReadError,
            27 => TransferCode::OutOfMemory,
            28 => TransferCode::OperationTimedout,
            35 => TransferCode::SslConnectError,
            42 => TransferCode::AbortedByCallback,
            52 => TransferCode::GotNothing,
            55 => TransferCode::SendError,
            56 => TransferCode::RecvError,
            67 => TransferCode::LoginDenied,
            78 => TransferCode::RemoteFileNotFound,
            other => TransferCode::Other(other),
        }
    }

    pub fn raw(&self) -> i32 {
        match self {
            TransferCode::Ok => 0,
            TransferCode::UnsupportedProtocol => 1,
            TransferCode::FailedInit => 2,
            TransferCode::UrlMalformat => 3,
            TransferCode::CouldntResolveHost => 6,
            TransferCode::CouldntConnect => 7,
            TransferCode::RemoteAccessDenied => 9,
            TransferCode::PartialFile => 18,
            TransferCode::HttpReturnedError => 22,
            TransferCode::WriteError => 23,
            TransferCode::UploadFailed => 25,
            TransferCode::ReadError => 26,
            TransferCode::OutOfMemory => 27,
            TransferCode::OperationTimedout => 28,
            TransferCode::SslConnectError => 35,
            TransferCode::AbortedByCallback => 42,
            TransferCode::GotNothing => 52,
            TransferCode::SendError => 55,
            TransferCode::RecvError => 56,
            TransferCode::LoginDenied => 67,
            TransferCode::RemoteFileNotFound => 78,
            TransferCode::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == TransferCode::Ok
    }

    /// Human-readable description of the code.
    pub fn description(&self) -> &'static str {
        match self {
            TransferCode::Ok => "No error",
            TransferCode::UnsupportedProtocol => "Unsupported protocol",
            TransferCode::FailedInit => "Failed initialization",
            TransferCode::UrlMalformat => "URL using bad/illegal format or missing URL",
            TransferCode::CouldntResolveHost => "Couldn't resolve host name",
            TransferCode::CouldntConnect => "Couldn't connect to server",
            TransferCode::RemoteAccessDenied => "Access denied to remote resource",
            TransferCode::PartialFile => "Transferred a partial file",
            TransferCode::HttpReturnedError => "HTTP response code said error",
            TransferCode::WriteError => "Failed writing received data to disk/application",
            TransferCode::UploadFailed => "Upload failed (at start/before it took off)",
            TransferCode::ReadError => "Failed to open/read local data from file/application",
            TransferCode::OutOfMemory => "Out of memory",
            TransferCode::OperationTimedout => "Timeout was reached",
            TransferCode::SslConnectError => "SSL connect error",
            TransferCode::AbortedByCallback => "Operation was aborted by an application callback",
            TransferCode::GotNothing => "Server returned nothing (no headers, no data)",
            TransferCode::SendError => "Failed sending data to the peer",
            TransferCode::RecvError => "Failure when receiving data from the peer",
            TransferCode::LoginDenied => "Login denied",
            TransferCode::RemoteFileNotFound => "Remote file not found",
            TransferCode::Other(_) => "Unknown error",
        }
    }
}

impl fmt::Display for TransferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.raw())
    }
}

impl std::error::Error for TransferCode {}

/// Error returned by the multi handle.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum MultiError {
    BadHandle,
    BadEasyHandle,
    OutOfMemory,
    InternalError,
    BadSocket,
    UnknownOption,
    AddedAlready,
    RecursiveApiCall,
    Other(i32),
}

impl MultiError {
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => MultiError::BadHandle,
            2 => MultiError::BadEasyHandle,
            3 => MultiError::OutOfMemory,
            4 => MultiError::InternalError,
            5 => MultiError::BadSocket,
            6 => MultiError::UnknownOption,
            7 => MultiError::AddedAlready,
            8 => MultiError::RecursiveApiCall,
            other => MultiError::Other(other),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MultiError::BadHandle => "Invalid multi handle",
            MultiError::BadEasyHandle => "Invalid easy handle",
            MultiError::OutOfMemory => "Out of memory",
            MultiError::InternalError => "Internal error",
            MultiError::BadSocket => "Invalid socket argument",
            MultiError::UnknownOption => "Unknown option",
            MultiError::AddedAlready => "The easy handle is already added to a multi handle",
            MultiError::RecursiveApiCall => "API function called from within callback",
            MultiError::Other(_) => "Unknown error",
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for MultiError {}

/// Why [`TransferManager::register`] refused a transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RegisterError {
    /// The transfer has no native handle.
    Inert,
    /// The multi handle rejected the native handle.
    Multi(MultiError),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Inert => f.write_str("transfer has no native handle"),
            RegisterError::Multi(e) => write!(f, "multi handle rejected transfer: {}", e),
        }
    }
}

impl std::error::Error for RegisterError {}

#[cfg(feature = "defmt")]
impl defmt::Format for RegisterError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            RegisterError::Inert => defmt::write!(f, "Inert"),
            RegisterError::Multi(_) => defmt::write!(f, "Multi"),
        }
    }
}

/// Progress counters reported by the native library, in bytes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct XferInfo {
    pub dltotal: i64,
    pub dlnow: i64,
    pub ultotal: i64,
    pub ulnow: i64,
}

/// What [`Multi::socket_action`] should act on.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ActionTarget {
    /// A descriptor became ready in a direction.
    Socket(Descriptor, Direction),
    /// The deadline expired.
    Timeout,
}

/// A "transfer done" message from [`Multi::info_read`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Done {
    pub token: Token,
    pub result: TransferCode,
}

/// Callbacks the native library makes while the manager is calling into it.
pub trait MultiHooks {
    /// Socket interest changed.
    fn socket(&mut self, fd: Descriptor, event: PollEvent);
    /// Deadline request in milliseconds; `-1` cancels, `0` means as soon as possible.
    fn timer(&mut self, timeout_ms: i64);
    /// Received data for a transfer. Returning less than `data.len()` aborts it.
    fn write(&mut self, token: Token, data: &[u8]) -> usize;
    /// Data to send for a transfer. Returning `0` signals end of data.
    fn read(&mut self, token: Token, buf: &mut [u8]) -> usize;
    /// Progress of a transfer.
    fn progress(&mut self, token: Token, info: XferInfo);
}

/// A native transfer handle. Dropping it releases the native handle.
pub trait Easy {
    fn set_url(&mut self, url: &str) -> Result<(), TransferCode>;
    fn set_verbose(&mut self, verbose: bool) -> Result<(), TransferCode>;
    /// Enable or disable progress reporting through [`MultiHooks::progress`].
    fn set_progress(&mut self, enabled: bool) -> Result<(), TransferCode>;
    /// Turn the handle into an upload of `size` bytes read through [`MultiHooks::read`].
    fn set_upload(&mut self, size: u64) -> Result<(), TransferCode>;
    /// The detailed error message of the last failure, if the library produced one.
    fn error_message(&self) -> Option<String>;
}

/// The native multi handle.
pub trait Multi {
    type Easy: Easy;

    /// Create a native transfer handle. `None` if the library is out of resources.
    fn easy(&mut self) -> Option<Self::Easy>;

    /// Start driving `easy`, identified by `token` from now on.
    fn add(
        &mut self,
        token: Token,
        easy: Self::Easy,
        hooks: &mut dyn MultiHooks,
    ) -> Result<(), MultiError>;

    /// Stop driving the handle of `token` and give it back.
    fn remove(&mut self, token: Token, hooks: &mut dyn MultiHooks)
    -> Result<Self::Easy, MultiError>;

    /// Let the library act on a ready descriptor or an expired deadline.
    ///
    /// Returns the number of transfers still running.
    fn socket_action(
        &mut self,
        target: ActionTarget,
        hooks: &mut dyn MultiHooks,
    ) -> Result<usize, MultiError>;

    /// Next pending "transfer done" message.
    fn info_read(&mut self) -> Option<Done>;
}

/// A unit of work driven by the [`TransferManager`].
///
/// `E` is the native handle type of the multi handle the transfer is meant for.
pub trait Transfer<E> {
    fn url(&self) -> &Url;

    /// Hand the native handle over to the manager. `None` for an inert transfer.
    fn take_handle(&mut self) -> Option<E>;

    /// Consume received data, returning the number of bytes taken.
    ///
    /// The default discards the data and warns once per process.
    fn write(&mut self, data: &[u8]) -> usize {
        static WARNED: Once = Once::new();
        WARNED.call_once(|| warn!("transfer discards {} received bytes", data.len()));
        data.len()
    }

    /// Fill `buf` with data to send, returning the number of bytes provided.
    /// Returning 0 ends the upload.
    ///
    /// The default has nothing to send and warns once per process.
    fn read(&mut self, buf: &mut [u8]) -> usize {
        static WARNED: Once = Once::new();
        WARNED.call_once(|| warn!("transfer has no data for a {} byte read", buf.len()));
        0
    }

    fn progress(&mut self, _info: XferInfo) {}

    /// The native library finished the transfer. Called exactly once.
    fn done(&mut self, result: TransferCode, error: Option<String>);
}

/// State shared by the provided transfers: the URL and the native handle
/// until the manager takes it over.
#[derive(Debug)]
pub(crate) struct TransferCore<E> {
    url: Url,
    easy: Option<E>,
}

impl<E: Easy> TransferCore<E> {
    pub(crate) fn new(easy: Option<E>, url: Url, verbose: bool) -> Self {
        let mut core = Self { url, easy };
        if core.easy.is_none() {
            error!(
                "no native handle for {}, the transfer will not run",
                core.url
            );
            return core;
        }
        let url = core.url.to_string();
        core.configure("url", |easy| easy.set_url(&url));
        core.configure("verbose", |easy| easy.set_verbose(verbose));
        core
    }

    /// Apply an option to the native handle, logging a failure.
    pub(crate) fn configure(
        &mut self,
        option: &str,
        apply: impl FnOnce(&mut E) -> Result<(), TransferCode>,
    ) {
        if let Some(easy) = self.easy.as_mut() {
            if let Err(code) = apply(easy) {
                error!("cannot set {} for {}: {}", option, self.url, code);
            }
        }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn take(&mut self) -> Option<E> {
        self.easy.take()
    }

    pub(crate) fn report(&self, result: TransferCode, error: Option<&str>) {
        if result.is_ok() {
            debug!("transfer of {} finished", self.url);
        } else {
            error!(
                "transfer of {} failed: {}{}",
                self.url,
                result,
                error.map(|e| format!(": {}", e)).unwrap_or_default()
            );
        }
    }
}
