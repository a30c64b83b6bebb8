mod common;

use common::{FakeLoop, init_logging};
use netglue::network::Direction;
use netglue::network::notifier::{NotifierRegistry, PollEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALL_EVENTS: [PollEvent; 5] = [
    PollEvent::None,
    PollEvent::In,
    PollEvent::Out,
    PollEvent::InOut,
    PollEvent::Remove,
];

#[test]
fn test_in_then_inout_then_remove() {
    init_logging();
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    registry.manage(5, PollEvent::In);
    assert!(registry.is_watched(5, Direction::Read));
    assert!(!registry.is_watched(5, Direction::Write));
    assert_eq!(host.live_watchers(), 1);

    registry.manage(5, PollEvent::InOut);
    assert!(registry.is_watched(5, Direction::Read));
    assert!(registry.is_watched(5, Direction::Write));
    assert_eq!(host.watcher_count(5, Direction::Read), 1);
    assert_eq!(host.watcher_count(5, Direction::Write), 1);
    // The read watcher was kept, only the write watcher is new.
    assert_eq!(host.watch_calls(), 2);

    registry.manage(5, PollEvent::Remove);
    assert!(registry.is_empty());
    assert_eq!(host.live_watchers(), 0);
}

#[test]
fn test_repeated_event_is_a_no_op() {
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    registry.manage(3, PollEvent::InOut);
    registry.manage(3, PollEvent::InOut);
    assert_eq!(host.watch_calls(), 2);
    assert_eq!(host.live_watchers(), 2);
}

#[test]
fn test_none_drops_watchers() {
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    registry.manage(4, PollEvent::Out);
    registry.manage(4, PollEvent::None);
    assert!(registry.is_empty());
    assert_eq!(host.live_watchers(), 0);
}

#[test]
fn test_descriptors_are_independent() {
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    registry.manage(9, PollEvent::In);
    registry.manage(2, PollEvent::InOut);
    registry.manage(9, PollEvent::Remove);

    assert_eq!(registry.watched(Direction::Read), [2]);
    assert_eq!(registry.watched(Direction::Write), [2]);
    assert_eq!(host.live_watchers(), 2);
}

#[test]
fn test_unknown_raw_code_is_ignored() {
    init_logging();
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    assert!(registry.manage_raw(6, 1));
    assert!(!registry.manage_raw(6, 7));
    assert!(!registry.manage_raw(6, -1));
    assert!(registry.is_watched(6, Direction::Read));
    assert_eq!(host.live_watchers(), 1);
}

#[test]
fn test_refused_watch_leaves_no_entry() {
    init_logging();
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());

    host.refuse_watches(true);
    registry.manage(8, PollEvent::In);
    assert!(!registry.is_watched(8, Direction::Read));

    // A later request retries.
    host.refuse_watches(false);
    registry.manage(8, PollEvent::In);
    assert!(registry.is_watched(8, Direction::Read));
}

#[test]
fn test_clear_and_drop_release_watchers() {
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());
    registry.manage(1, PollEvent::InOut);
    registry.clear();
    assert_eq!(host.live_watchers(), 0);

    registry.manage(1, PollEvent::InOut);
    drop(registry);
    assert_eq!(host.live_watchers(), 0);
}

#[test]
fn test_random_event_sequences_follow_last_event() {
    let mut rng = StdRng::seed_from_u64(0x6e65_7467);
    let host = FakeLoop::new();
    let mut registry = NotifierRegistry::new(host.clone());
    let mut last = [PollEvent::Remove; 6];

    for _ in 0..2000 {
        let fd = rng.gen_range(0..last.len());
        let event = ALL_EVENTS[rng.gen_range(0..ALL_EVENTS.len())];
        registry.manage(fd as i32, event);
        last[fd] = event;

        for (fd, event) in last.iter().enumerate() {
            for direction in Direction::ALL {
                let expected = event.wants(direction);
                assert_eq!(registry.is_watched(fd as i32, direction), expected);
                assert_eq!(host.watcher_count(fd as i32, direction), usize::from(expected));
            }
        }
    }
}
