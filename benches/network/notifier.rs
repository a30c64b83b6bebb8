use std::time::Duration;

use criterion::{Criterion, Throughput};
use netglue::network::error::Error;
use netglue::network::notifier::{NotifierRegistry, PollEvent};
use netglue::network::{Descriptor, Direction, EventLoop, Timer, TimerMode};

/// Event loop whose watchers and timers do nothing.
struct NullLoop;

struct NullTimer;

impl Timer for NullTimer {
    fn start(&mut self, _interval: Duration, _mode: TimerMode) {}
    fn stop(&mut self) {}
    fn is_running(&self) -> bool {
        false
    }
}

impl EventLoop for NullLoop {
    type Watcher = ();
    type Timer = NullTimer;

    fn watch(&mut self, _fd: Descriptor, _direction: Direction) -> Result<(), Error> {
        Ok(())
    }

    fn timer(&mut self) -> NullTimer {
        NullTimer
    }
}

const EVENTS: [PollEvent; 4] = [
    PollEvent::In,
    PollEvent::InOut,
    PollEvent::Out,
    PollEvent::Remove,
];

pub fn bench_manage_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("notifier");
    let sockets = 64;
    group.throughput(Throughput::Elements(sockets as u64 * EVENTS.len() as u64));
    group.bench_function("manage_churn", |b| {
        let mut registry = NotifierRegistry::new(NullLoop);
        b.iter(|| {
            for event in EVENTS {
                for fd in 0..sockets {
                    registry.manage(fd, event);
                }
            }
        })
    });
    group.finish();
}

pub fn bench_manage_repeated(c: &mut Criterion) {
    let mut group = c.benchmark_group("notifier");
    group.bench_function("manage_repeated", |b| {
        let mut registry = NotifierRegistry::new(NullLoop);
        registry.manage(5, PollEvent::InOut);
        b.iter(|| registry.manage(5, PollEvent::InOut))
    });
    group.finish();
}
