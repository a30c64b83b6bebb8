//! The transfer manager.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use super::{ActionTarget, Easy, Multi, MultiHooks, RegisterError, Token, Transfer, XferInfo};
use crate::network::notifier::{NotifierRegistry, PollEvent};
use crate::network::timer::{DeadlineTimer, Timeout};
use crate::network::{Descriptor, Direction, EventLoop, Wakeup};

/// Everything the native library may touch from inside a multi call.
struct Bridge<L: EventLoop, E> {
    notifiers: NotifierRegistry<L>,
    deadline: DeadlineTimer<L::Timer>,
    transfers: HashMap<Token, Box<dyn Transfer<E>>>,
}

impl<L: EventLoop, E> MultiHooks for Bridge<L, E> {
    fn socket(&mut self, fd: Descriptor, event: PollEvent) {
        self.notifiers.manage(fd, event);
    }

    fn timer(&mut self, timeout_ms: i64) {
        self.deadline.request(Timeout::from_millis(timeout_ms));
    }

    fn write(&mut self, token: Token, data: &[u8]) -> usize {
        match self.transfers.get_mut(&token) {
            Some(transfer) => transfer.write(data),
            None => {
                error!("received data for unknown transfer {}", token);
                0
            }
        }
    }

    fn read(&mut self, token: Token, buf: &mut [u8]) -> usize {
        match self.transfers.get_mut(&token) {
            Some(transfer) => transfer.read(buf),
            None => {
                error!("data requested for unknown transfer {}", token);
                0
            }
        }
    }

    fn progress(&mut self, token: Token, info: XferInfo) {
        if let Some(transfer) = self.transfers.get_mut(&token) {
            transfer.progress(info);
        }
    }
}

/// Drives every registered transfer through one native multi handle.
///
/// The manager owns the multi handle, a [`NotifierRegistry`] for the descriptors the
/// library asks about, the deadline timer, and every transfer in flight. The host
/// event loop reports activity through [`wake`](Self::wake).
///
/// A transfer stays owned by the manager from [`register`](Self::register) until the
/// library reports it done. At that point its native handle is removed from the
/// multi handle, the transfer's `done` runs, and both are dropped.
pub struct TransferManager<M: Multi, L: EventLoop> {
    multi: M,
    bridge: Bridge<L, M::Easy>,
    next_token: u64,
    running: usize,
}

impl<M: Multi, L: EventLoop> TransferManager<M, L> {
    pub fn new(multi: M, mut event_loop: L) -> Self {
        let deadline = DeadlineTimer::new(event_loop.timer());
        Self {
            multi,
            bridge: Bridge {
                notifiers: NotifierRegistry::new(event_loop),
                deadline,
                transfers: HashMap::new(),
            },
            next_token: 0,
            running: 0,
        }
    }

    /// Create a native handle for a new transfer.
    pub fn easy(&mut self) -> Option<M::Easy> {
        let easy = self.multi.easy();
        if easy.is_none() {
            error!("native library could not create a transfer handle");
        }
        easy
    }

    /// Take ownership of `transfer` and start driving it.
    pub fn register<T>(&mut self, mut transfer: T) -> Result<Token, RegisterError>
    where
        T: Transfer<M::Easy> + 'static,
    {
        let Some(easy) = transfer.take_handle() else {
            error!("refusing to register {}: it has no native handle", transfer.url());
            return Err(RegisterError::Inert);
        };

        let token = Token(self.next_token);
        self.next_token += 1;
        let url = transfer.url().clone();
        self.bridge.transfers.insert(token, Box::new(transfer));

        if let Err(e) = self.multi.add(token, easy, &mut self.bridge) {
            error!("cannot add transfer of {}: {}", url, e);
            self.bridge.transfers.remove(&token);
            return Err(RegisterError::Multi(e));
        }
        info!("transfer {} of {} registered", token, url);
        Ok(token)
    }

    /// Native socket callback: `fd` changed its interest to `event`.
    pub fn socket_callback(&mut self, fd: Descriptor, event: PollEvent) {
        self.bridge.notifiers.manage(fd, event);
    }

    /// Native socket callback with a raw event code. Unknown codes are ignored.
    pub fn socket_callback_raw(&mut self, fd: Descriptor, code: i32) {
        self.bridge.notifiers.manage_raw(fd, code);
    }

    /// Native timer callback.
    pub fn timer_callback(&mut self, timeout_ms: i64) {
        self.bridge.deadline.request(Timeout::from_millis(timeout_ms));
    }

    /// A watched descriptor became ready.
    pub fn on_descriptor_ready(&mut self, fd: Descriptor, direction: Direction) {
        self.bridge.deadline.stop();
        self.act(ActionTarget::Socket(fd, direction));
    }

    /// The deadline expired.
    pub fn on_timeout(&mut self) {
        self.bridge.deadline.fired();
        self.act(ActionTarget::Timeout);
    }

    /// Entry point for the host event loop.
    pub fn wake(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Ready(fd, direction) => self.on_descriptor_ready(fd, direction),
            Wakeup::Timeout => self.on_timeout(),
        }
    }

    fn act(&mut self, target: ActionTarget) {
        match self.multi.socket_action(target, &mut self.bridge) {
            Ok(running) => {
                if running != self.running {
                    debug!("{} transfers running", running);
                }
                self.running = running;
            }
            Err(e) => error!("socket action on {:?} failed: {}", target, e),
        }
        self.process_done_messages();
    }

    fn process_done_messages(&mut self) {
        while let Some(done) = self.multi.info_read() {
            let Some(mut transfer) = self.bridge.transfers.remove(&done.token) else {
                error!("skipping done message for unknown transfer {}", done.token);
                continue;
            };
            let easy = match self.multi.remove(done.token, &mut self.bridge) {
                Ok(easy) => Some(easy),
                Err(e) => {
                    error!("cannot remove transfer {}: {}", done.token, e);
                    None
                }
            };
            let message = easy.as_ref().and_then(Easy::error_message);
            transfer.done(done.result, message);
            drop(easy);
        }
    }

    /// Number of transfers the library reported as running after its last step.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Number of registered transfers that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.bridge.transfers.len()
    }

    pub fn notifiers(&self) -> &NotifierRegistry<L> {
        &self.bridge.notifiers
    }

    pub fn deadline(&self) -> &DeadlineTimer<L::Timer> {
        &self.bridge.deadline
    }

    pub fn multi(&self) -> &M {
        &self.multi
    }
}

impl<M: Multi, L: EventLoop> Drop for TransferManager<M, L> {
    fn drop(&mut self) {
        if !self.bridge.transfers.is_empty() {
            warn!(
                "dropping transfer manager with {} unfinished transfers",
                self.bridge.transfers.len()
            );
        }
        self.bridge.deadline.stop();
        self.bridge.notifiers.clear();
    }
}

impl<M: Multi, L: EventLoop> core::fmt::Debug for TransferManager<M, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferManager")
            .field("running", &self.running)
            .field("in_flight", &self.bridge.transfers.len())
            .field("notifiers", &self.bridge.notifiers)
            .finish()
    }
}
