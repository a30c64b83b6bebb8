//! FTP download and upload transfers.
//!
//! Both transfers stream through a local file (or any [`std::io::Write`] /
//! [`std::io::Read`]) and publish their progress as observable [`Progress`]
//! counters. The local file is released before `finished` is emitted, so a slot
//! may immediately reopen it.

use std::fs::File;
use std::io::{self, Read, Write};

use log::{error, info, warn};
use url::Url;

use super::{Easy, Transfer, TransferCode, TransferCore, XferInfo};
use crate::binding::{Property, Signal};

/// Percentage of `transferred` out of `total`, rounded and clamped to `0..=100`.
///
/// A non-positive total yields `0`.
///
/// ```rust
/// use netglue::network::transfer::ftp::progress_percent;
///
/// assert_eq!(progress_percent(1, 3), 33);
/// assert_eq!(progress_percent(2, 3), 67);
/// assert_eq!(progress_percent(5, 0), 0);
/// assert_eq!(progress_percent(12, 10), 100);
/// ```
pub fn progress_percent(transferred: i64, total: i64) -> u8 {
    if total <= 0 || transferred <= 0 {
        return 0;
    }
    let percent = (100.0 * transferred as f64 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Observable byte counters of a running transfer.
#[derive(Debug, Clone)]
pub struct Progress {
    pub transferred: Property<i64>,
    pub total: Property<i64>,
    /// Follows the two counters, see [`progress_percent`].
    pub percent: Property<u8>,
}

impl Progress {
    pub fn new() -> Self {
        let transferred = Property::new(0_i64);
        let total = Property::new(0_i64);
        let percent = Property::bound(&transferred, &total, |t, total| {
            progress_percent(*t, *total)
        });
        Self {
            transferred,
            total,
            percent,
        }
    }

    fn update(&self, transferred: i64, total: i64) {
        self.total.set(total);
        self.transferred.set(transferred);
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of an FTP transfer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FtpReport {
    pub code: TransferCode,
    pub bytes_transferred: i64,
}

/// Downloads a remote file into a writer.
#[derive(Debug)]
pub struct FtpDownload<E, W> {
    core: TransferCore<E>,
    file: Option<W>,
    pub progress: Progress,
    /// Emitted once when the transfer finished.
    pub finished: Signal<FtpReport>,
}

impl<E: Easy, W: Write> FtpDownload<E, W> {
    pub fn new(easy: Option<E>, file: W, url: Url, verbose: bool) -> Self {
        let mut core = TransferCore::new(easy, url, verbose);
        core.configure("progress", |easy| easy.set_progress(true));
        Self {
            core,
            file: Some(file),
            progress: Progress::new(),
            finished: Signal::new(),
        }
    }
}

impl<E: Easy, W: Write> Transfer<E> for FtpDownload<E, W> {
    fn url(&self) -> &Url {
        self.core.url()
    }

    fn take_handle(&mut self) -> Option<E> {
        self.core.take()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        match file.write_all(data) {
            Ok(()) => data.len(),
            Err(e) => {
                error!("cannot store data of {}: {}", self.core.url(), e);
                0
            }
        }
    }

    fn progress(&mut self, info: XferInfo) {
        self.progress.update(info.dlnow, info.dltotal);
    }

    fn done(&mut self, result: TransferCode, error: Option<String>) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                error!("cannot flush download of {}: {}", self.core.url(), e);
            }
        }
        self.core.report(result, error.as_deref());
        self.finished.emit(&FtpReport {
            code: result,
            bytes_transferred: self.progress.transferred.get(),
        });
    }
}

/// Uploads a reader to a remote file.
#[derive(Debug)]
pub struct FtpUpload<E, R> {
    core: TransferCore<E>,
    file: Option<R>,
    pub progress: Progress,
    /// Emitted once when the transfer finished.
    pub finished: Signal<FtpReport>,
}

impl<E: Easy, R: Read> FtpUpload<E, R> {
    /// Upload `size` bytes read from `file`.
    pub fn new(easy: Option<E>, file: R, size: u64, url: Url, verbose: bool) -> Self {
        let mut core = TransferCore::new(easy, url, verbose);
        core.configure("progress", |easy| easy.set_progress(true));
        core.configure("upload", |easy| easy.set_upload(size));
        if size == 0 {
            warn!("uploading an empty file to {}", core.url());
        } else {
            info!("uploading {} bytes to {}", size, core.url());
        }
        Self {
            core,
            file: Some(file),
            progress: Progress::new(),
            finished: Signal::new(),
        }
    }
}

impl<E: Easy> FtpUpload<E, File> {
    /// Upload a whole file, taking the size from its metadata.
    pub fn from_file(easy: Option<E>, file: File, url: Url, verbose: bool) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self::new(easy, file, size, url, verbose))
    }
}

impl<E: Easy, R: Read> Transfer<E> for FtpUpload<E, R> {
    fn url(&self) -> &Url {
        self.core.url()
    }

    fn take_handle(&mut self) -> Option<E> {
        self.core.take()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        match file.read(buf) {
            Ok(n) => n,
            Err(e) => {
                error!("cannot read upload data for {}: {}", self.core.url(), e);
                0
            }
        }
    }

    fn progress(&mut self, info: XferInfo) {
        self.progress.update(info.ulnow, info.ultotal);
    }

    fn done(&mut self, result: TransferCode, error: Option<String>) {
        self.file = None;
        self.core.report(result, error.as_deref());
        self.finished.emit(&FtpReport {
            code: result,
            bytes_transferred: self.progress.transferred.get(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_edges() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(10, -1), 0);
        assert_eq!(progress_percent(-3, 10), 0);
        assert_eq!(progress_percent(0, 10), 0);
        assert_eq!(progress_percent(10, 10), 100);
        assert_eq!(progress_percent(1, 200), 1);
        assert_eq!(progress_percent(1, 201), 0);
    }

    #[test]
    fn test_progress_recomputes_on_either_counter() {
        let progress = Progress::new();
        progress.total.set(400);
        assert_eq!(progress.percent.get(), 0);
        progress.transferred.set(100);
        assert_eq!(progress.percent.get(), 25);
        progress.total.set(200);
        assert_eq!(progress.percent.get(), 50);
        progress.total.set(0);
        assert_eq!(progress.percent.get(), 0);
    }
}
