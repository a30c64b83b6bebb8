//! Descriptor notification registry.
//!
//! The multi-transfer library tells its host which descriptors it wants to be
//! notified about through a socket callback carrying one of the [`PollEvent`]
//! codes. [`NotifierRegistry`] turns those requests into host watchers: at most one
//! watcher per descriptor and direction, created when interest appears and dropped
//! when it goes away.
//!
//! # Examples
//!
//! ```rust
//! use netglue::network::notifier::PollEvent;
//!
//! assert_eq!(PollEvent::from_raw(3), Some(PollEvent::InOut));
//! assert!(PollEvent::InOut.wants(netglue::network::Direction::Write));
//! assert_eq!(PollEvent::from_raw(9), None);
//! ```

use std::collections::HashMap;

use log::{debug, error, warn};

use super::{Descriptor, Direction, EventLoop};

/// Interest the native library declares for one descriptor.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PollEvent {
    /// No interest, keep the descriptor registered without watchers.
    None = 0,
    /// Wait for incoming data.
    In = 1,
    /// Wait until data can be sent.
    Out = 2,
    /// Wait for both.
    InOut = 3,
    /// The descriptor is going away.
    Remove = 4,
}

impl PollEvent {
    /// Map a raw code from the native socket callback. Unknown codes yield `None`.
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(PollEvent::None),
            1 => Some(PollEvent::In),
            2 => Some(PollEvent::Out),
            3 => Some(PollEvent::InOut),
            4 => Some(PollEvent::Remove),
            _ => None,
        }
    }

    /// Whether this event asks for notifications in `direction`.
    pub fn wants(self, direction: Direction) -> bool {
        match direction {
            Direction::Read => matches!(self, PollEvent::In | PollEvent::InOut),
            Direction::Write => matches!(self, PollEvent::Out | PollEvent::InOut),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PollEvent::None => "none",
            PollEvent::In => "in",
            PollEvent::Out => "out",
            PollEvent::InOut => "inout",
            PollEvent::Remove => "remove",
        }
    }
}

/// Keeps the set of host watchers in line with the native library's interest.
///
/// Invariant: for every descriptor and direction there is at most one live
/// watcher, and it exists exactly while the last event reported for that
/// descriptor asks for that direction.
pub struct NotifierRegistry<L: EventLoop> {
    event_loop: L,
    read: HashMap<Descriptor, L::Watcher>,
    write: HashMap<Descriptor, L::Watcher>,
}

impl<L: EventLoop> NotifierRegistry<L> {
    pub fn new(event_loop: L) -> Self {
        Self {
            event_loop,
            read: HashMap::new(),
            write: HashMap::new(),
        }
    }

    /// Reconcile the watchers of `fd` with `event`.
    ///
    /// Watchers that already exist are kept, so repeating an event is a no-op.
    pub fn manage(&mut self, fd: Descriptor, event: PollEvent) {
        debug!("socket {} interest changed to {}", fd, event.as_str());
        for direction in Direction::ALL {
            if event.wants(direction) {
                self.watch(fd, direction);
            } else {
                self.unwatch(fd, direction);
            }
        }
    }

    /// Like [`manage`](Self::manage) for a raw event code.
    ///
    /// Returns `false` and changes nothing when the code is unknown.
    pub fn manage_raw(&mut self, fd: Descriptor, code: i32) -> bool {
        match PollEvent::from_raw(code) {
            Some(event) => {
                self.manage(fd, event);
                true
            }
            None => {
                warn!("ignoring unknown poll event {} for socket {}", code, fd);
                false
            }
        }
    }

    fn watch(&mut self, fd: Descriptor, direction: Direction) {
        let (watchers, event_loop) = match direction {
            Direction::Read => (&mut self.read, &mut self.event_loop),
            Direction::Write => (&mut self.write, &mut self.event_loop),
        };
        if watchers.contains_key(&fd) {
            return;
        }
        match event_loop.watch(fd, direction) {
            Ok(watcher) => {
                debug!("watching socket {} for {}", fd, direction);
                watchers.insert(fd, watcher);
            }
            Err(e) => error!("cannot watch socket {} for {}: {}", fd, direction, e),
        }
    }

    fn unwatch(&mut self, fd: Descriptor, direction: Direction) {
        if self.watchers_mut(direction).remove(&fd).is_some() {
            debug!("stopped watching socket {} for {}", fd, direction);
        }
    }

    fn watchers(&self, direction: Direction) -> &HashMap<Descriptor, L::Watcher> {
        match direction {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        }
    }

    fn watchers_mut(&mut self, direction: Direction) -> &mut HashMap<Descriptor, L::Watcher> {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }

    pub fn is_watched(&self, fd: Descriptor, direction: Direction) -> bool {
        self.watchers(direction).contains_key(&fd)
    }

    /// Descriptors watched in `direction`, in ascending order.
    pub fn watched(&self, direction: Direction) -> Vec<Descriptor> {
        let mut fds: Vec<_> = self.watchers(direction).keys().copied().collect();
        fds.sort_unstable();
        fds
    }

    /// Number of live watchers across both directions.
    pub fn len(&self) -> usize {
        self.read.len() + self.write.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every watcher.
    pub fn clear(&mut self) {
        self.read.clear();
        self.write.clear();
    }

    pub fn event_loop(&self) -> &L {
        &self.event_loop
    }
}

impl<L: EventLoop> core::fmt::Debug for NotifierRegistry<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("read", &self.watched(Direction::Read))
            .field("write", &self.watched(Direction::Write))
            .finish()
    }
}
