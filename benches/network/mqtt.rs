use criterion::{BatchSize, Criterion, Throughput};
use netglue::network::mqtt::SubscriptionRegistry;
use netglue::network::mqtt::topic::check_subscription;

pub fn bench_topic_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic_check");
    let topics = [
        "my_test_topic",
        "sensors/+/temperature",
        "building/floor-3/room-12/#",
        "a/b#",
    ];
    group.throughput(Throughput::Elements(topics.len() as u64));
    group.bench_function("check_subscription", |b| {
        b.iter(|| {
            for topic in topics {
                let _ = check_subscription(topic);
            }
        })
    });
    group.finish();
}

pub fn bench_registry_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription_registry");
    let topics: Vec<String> = (0..100).map(|i| format!("bench/topic-{i}")).collect();
    group.throughput(Throughput::Elements(topics.len() as u64));
    group.bench_function("subscribe_and_unsubscribe", |b| {
        b.iter_batched_ref(
            SubscriptionRegistry::new,
            |registry| {
                for (mid, topic) in topics.iter().enumerate() {
                    registry.subscribe_requested(mid as i32, topic);
                }
                for mid in 0..topics.len() {
                    registry.subscribe_acknowledged(mid as i32, 0);
                }
                for (mid, topic) in topics.iter().enumerate() {
                    let mid = (mid + topics.len()) as i32;
                    registry.unsubscribe_requested(mid, topic);
                    registry.unsubscribe_acknowledged(mid);
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
