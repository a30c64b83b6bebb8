//! Host event-loop boundary
//!
//! The components of this crate never block and never own a thread. Instead they
//! ask the host event loop to watch descriptors and to run timers, and the host
//! reports back through a component's `wake` method whenever one of those fires.
//!
//! ```text
//!   native library ──(socket interest / timer request)──► component
//!   component ──(watch / start timer)──► EventLoop (host)
//!   EventLoop ──(Wakeup)──► component.wake(..) ──► native library step
//! ```
//!
//! Each component receives its own [`EventLoop`] value. How the host routes a
//! [`Wakeup`] to the component that created the watcher or timer is up to the host;
//! a GUI toolkit usually binds one closure per watcher.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::fmt;
use core::time::Duration;

/// Common error types for event-loop operations
pub mod error;

/// Descriptor notification registry
pub mod notifier;

/// Deadline and housekeeping timers
pub mod timer;

/// Multi-transfer manager and transfer handles
pub mod transfer;

/// MQTT client facade
pub mod mqtt;

pub use error::Error;

/// Re-exports of the event-loop boundary
pub mod prelude {
    pub use super::{Descriptor, Direction, EventLoop, Timer, TimerMode, Wakeup};
}

/// A raw OS-level I/O descriptor (a socket).
pub type Descriptor = i32;

/// The readiness a watcher is interested in.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Direction {
    /// The descriptor has data to read.
    Read,
    /// The descriptor accepts more data.
    Write,
}

impl Direction {
    /// Both directions, read first.
    pub const ALL: [Direction; 2] = [Direction::Read, Direction::Write];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a timer fires once or keeps firing at its interval.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TimerMode {
    /// Fire once after the interval, then stop.
    Once,
    /// Fire every interval until stopped.
    Repeating,
}

/// A timer owned by a component and run by the host event loop.
///
/// Starting a running timer restarts it with the new interval and mode.
pub trait Timer {
    /// Start (or restart) the timer.
    fn start(&mut self, interval: Duration, mode: TimerMode);
    /// Stop the timer. Stopping a stopped timer does nothing.
    fn stop(&mut self);
    /// Whether the timer will fire.
    fn is_running(&self) -> bool;
}

/// The host event loop as seen by a component.
pub trait EventLoop {
    /// Handle of a descriptor watcher. Dropping it stops the notifications.
    type Watcher;
    /// Timer type handed out by [`EventLoop::timer`].
    type Timer: Timer;

    /// Start watching `fd` for readiness in `direction`.
    ///
    /// While the returned watcher is alive the host delivers
    /// [`Wakeup::Ready`] with the same descriptor and direction to the component.
    fn watch(&mut self, fd: Descriptor, direction: Direction) -> Result<Self::Watcher, Error>;

    /// Create a stopped timer which delivers [`Wakeup::Timeout`] when it fires.
    fn timer(&mut self) -> Self::Timer;
}

/// What the host event loop reports back to a component.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Wakeup {
    /// A watched descriptor became ready.
    Ready(Descriptor, Direction),
    /// The component's timer fired.
    Timeout,
}
