pub mod mqtt;
pub mod notifier;
