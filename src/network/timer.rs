//! Deadline and housekeeping timers.
//!
//! The multi-transfer library asks for a single deadline through its timer
//! callback: `-1` cancels it, `0` asks to be called back as soon as possible and
//! any positive value is a one-shot delay in milliseconds. [`DeadlineTimer`]
//! applies those requests to a host [`Timer`].
//!
//! The MQTT client needs the opposite shape, a fixed repeating tick for the
//! library's housekeeping. That is [`PeriodicTimer`].

use core::time::Duration;

use log::debug;

use super::{Timer, TimerMode};

/// Delay used for "as soon as possible" requests.
///
/// A zero interval would make some hosts fire the timer before pending descriptor
/// notifications are delivered.
pub const MIN_DELAY: Duration = Duration::from_micros(1);

/// Interval of the MQTT housekeeping tick.
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(1000);

/// A deadline request from the native library.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Timeout {
    /// Cancel the pending deadline.
    Stop,
    /// Call back on the next loop iteration.
    Asap,
    /// Call back once after the delay.
    After(Duration),
}

impl Timeout {
    /// Decode the millisecond value of the native timer callback.
    ///
    /// ```rust
    /// use core::time::Duration;
    /// use netglue::network::timer::Timeout;
    ///
    /// assert_eq!(Timeout::from_millis(-1), Timeout::Stop);
    /// assert_eq!(Timeout::from_millis(0), Timeout::Asap);
    /// assert_eq!(Timeout::from_millis(250), Timeout::After(Duration::from_millis(250)));
    /// ```
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms < 0 => Timeout::Stop,
            0 => Timeout::Asap,
            ms => Timeout::After(Duration::from_millis(ms.unsigned_abs())),
        }
    }
}

/// One-shot deadline driven by [`Timeout`] requests.
#[derive(Debug)]
pub struct DeadlineTimer<T: Timer> {
    timer: T,
}

impl<T: Timer> DeadlineTimer<T> {
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    /// Apply a deadline request. A new request replaces the pending one.
    pub fn request(&mut self, timeout: Timeout) {
        match timeout {
            Timeout::Stop => {
                debug!("deadline cancelled");
                self.timer.stop();
            }
            Timeout::Asap => {
                debug!("deadline requested as soon as possible");
                self.timer.start(MIN_DELAY, TimerMode::Once);
            }
            Timeout::After(delay) => {
                debug!("deadline requested in {} ms", delay.as_millis());
                self.timer.start(delay, TimerMode::Once);
            }
        }
    }

    /// Cancel the pending deadline, if any.
    pub fn stop(&mut self) {
        if self.timer.is_running() {
            self.timer.stop();
        }
    }

    /// Record that the deadline fired.
    pub fn fired(&mut self) {
        self.stop();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_running()
    }
}

/// Fixed-interval repeating tick.
#[derive(Debug)]
pub struct PeriodicTimer<T: Timer> {
    timer: T,
    interval: Duration,
}

impl<T: Timer> PeriodicTimer<T> {
    pub fn new(timer: T, interval: Duration) -> Self {
        Self { timer, interval }
    }

    pub fn start(&mut self) {
        self.timer.start(self.interval, TimerMode::Repeating);
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
