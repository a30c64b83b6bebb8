//! # netglue - event-loop glue for callback-driven network libraries
//!
//! `netglue` drives two families of native client libraries from a single-threaded
//! application event loop (typically the one of a GUI toolkit):
//!
//! - a cooperative **multi-transfer HTTP/FTP library** that asks its host to watch
//!   sockets and to arm a deadline timer (the libcurl "multi socket" model), and
//! - an **MQTT client library** that exposes one socket plus read, write and
//!   housekeeping steps (the libmosquitto model).
//!
//! Neither wire protocol is implemented here. The native libraries are reached
//! through small traits, which keeps every piece of bookkeeping testable with
//! hand-written doubles.
//!
//! ## Layout
//!
//! - [`network`]: the host event-loop boundary ([`network::EventLoop`],
//!   [`network::Timer`], [`network::Wakeup`]) and the components built on it:
//!   - [`network::notifier`]: which descriptors are watched in which direction
//!   - [`network::timer`]: deadline and housekeeping timers
//!   - [`network::transfer`]: transfer handles and the multi-transfer manager
//!   - [`network::mqtt`]: the MQTT client facade and its subscription registry
//! - [`binding`]: observable [`binding::Property`] and [`binding::Signal`] values the
//!   UI layer binds to
//! - [`config`]: the demo configuration, parsed from JSON
//! - [`app`]: the demo wiring between UI requests and the components above
//!
//! ## Driving a transfer
//!
//! ```rust,no_run
//! # use netglue::network::transfer::{Multi, TransferManager, http::HttpTransfer};
//! # use netglue::network::EventLoop;
//! # fn run<M: Multi + 'static, L: EventLoop>(multi: M, event_loop: L) {
//! let mut manager = TransferManager::new(multi, event_loop);
//!
//! let url = url::Url::parse("https://example.com").unwrap();
//! let transfer = HttpTransfer::new(manager.easy(), url, false);
//! transfer.finished.connect(|reply| println!("{} bytes", reply.content.len()));
//! manager.register(transfer).ok();
//!
//! // From here on the host event loop calls `manager.wake(..)` whenever one of
//! // the manager's watchers or its deadline timer fires.
//! # }
//! ```
//!
//! ## Threading
//!
//! Everything in this crate runs on the thread of the host event loop. Bindings are
//! `Rc`-based and therefore neither `Send` nor `Sync`.
//!
//! ## Optional Features
//!
//! - `defmt`: `defmt::Format` implementations for the error types

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Host event-loop boundary and the network components driven through it.
///
/// This module contains the descriptor registry, the timer bridge, the
/// multi-transfer manager with its transfer handles, and the MQTT client facade.
pub mod network;

/// Observable properties and signals used as the UI boundary.
pub mod binding;

/// Demo configuration with JSON parsing.
pub mod config;

/// Application wiring between UI requests and the network components.
pub mod app;
