use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::notifier::bench_manage_churn,
    network::notifier::bench_manage_repeated,
    network::mqtt::bench_topic_check,
    network::mqtt::bench_registry_round_trip
);
criterion_main!(benches);
