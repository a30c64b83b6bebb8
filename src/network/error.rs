//! Common error types for event-loop operations

use core::fmt;

/// An error reported by the host event loop.
///
/// This enum defines the errors a host can report when a component asks it to
/// watch a descriptor. Hosts map their own failures onto these variants.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The descriptor is negative or otherwise unusable.
    InvalidDescriptor,
    /// The host refused to watch the descriptor.
    WatchRefused,
    /// The descriptor is already watched in this direction.
    AlreadyWatched,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDescriptor => f.write_str("invalid descriptor"),
            Error::WatchRefused => f.write_str("event loop refused to watch descriptor"),
            Error::AlreadyWatched => f.write_str("descriptor is already watched"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidDescriptor => defmt::write!(f, "InvalidDescriptor"),
            Error::WatchRefused => defmt::write!(f, "WatchRefused"),
            Error::AlreadyWatched => defmt::write!(f, "AlreadyWatched"),
        }
    }
}
