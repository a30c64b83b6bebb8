//! In-memory HTTP transfer.
//!
//! ```rust,no_run
//! # use netglue::network::transfer::{Easy, http::HttpTransfer};
//! # fn demo<E: Easy>(easy: Option<E>) {
//! let url = url::Url::parse("https://example.com").unwrap();
//! let transfer = HttpTransfer::new(easy, url, false);
//! transfer.finished.connect(|reply| {
//!     if reply.code.is_ok() {
//!         println!("{}", reply.content);
//!     }
//! });
//! # }
//! ```

use url::Url;

use super::{Easy, Transfer, TransferCode, TransferCore};
use crate::binding::Signal;

/// Outcome of an [`HttpTransfer`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HttpReply {
    pub code: TransferCode,
    /// Received body, with invalid UTF-8 replaced.
    pub content: String,
}

/// Fetches a URL into memory.
#[derive(Debug)]
pub struct HttpTransfer<E> {
    core: TransferCore<E>,
    buffer: Vec<u8>,
    /// Emitted once when the transfer finished, successfully or not.
    pub finished: Signal<HttpReply>,
}

impl<E: Easy> HttpTransfer<E> {
    pub fn new(easy: Option<E>, url: Url, verbose: bool) -> Self {
        let mut core = TransferCore::new(easy, url, verbose);
        core.configure("progress", |easy| easy.set_progress(false));
        Self {
            core,
            buffer: Vec::new(),
            finished: Signal::new(),
        }
    }

    /// Everything received so far.
    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}

impl<E: Easy> Transfer<E> for HttpTransfer<E> {
    fn url(&self) -> &Url {
        self.core.url()
    }

    fn take_handle(&mut self) -> Option<E> {
        self.core.take()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        self.buffer.extend_from_slice(data);
        data.len()
    }

    fn done(&mut self, result: TransferCode, error: Option<String>) {
        self.core.report(result, error.as_deref());
        let content = self.content();
        self.buffer.clear();
        self.finished.emit(&HttpReply {
            code: result,
            content,
        });
    }
}
