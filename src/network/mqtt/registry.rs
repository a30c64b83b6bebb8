//! Subscription bookkeeping.
//!
//! A subscribe or unsubscribe request is pending from the moment the native
//! library accepted it until the broker acknowledged it. Pending requests are
//! keyed by their message id; active subscriptions by topic pattern.

use std::collections::HashMap;

use log::warn;

use super::{MessageId, SubscriptionState};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Operation {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    pending: HashMap<MessageId, (Operation, String)>,
    active: HashMap<String, u8>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_requested(&mut self, mid: MessageId, topic: &str) {
        self.insert_pending(mid, Operation::Subscribe, topic);
    }

    pub fn unsubscribe_requested(&mut self, mid: MessageId, topic: &str) {
        self.insert_pending(mid, Operation::Unsubscribe, topic);
    }

    fn insert_pending(&mut self, mid: MessageId, operation: Operation, topic: &str) {
        if let Some((_, previous)) = self.pending.insert(mid, (operation, topic.to_owned())) {
            warn!(
                "message id {} reused while request for {} still pending",
                mid, previous
            );
        }
    }

    /// Move the pending subscription `mid` into the active set.
    ///
    /// Returns the topic, or `None` if `mid` is not a pending subscription. A topic
    /// the broker refused is dropped instead of activated.
    pub fn subscribe_acknowledged(&mut self, mid: MessageId, granted_qos: u8) -> Option<String> {
        let topic = self.take_pending(mid, Operation::Subscribe)?;
        if granted_qos == super::SUBSCRIPTION_REFUSED {
            warn!("broker refused subscription to {}", topic);
        } else {
            self.active.insert(topic.clone(), granted_qos);
        }
        Some(topic)
    }

    /// Remove the pending unsubscription `mid` and its topic from the active set.
    pub fn unsubscribe_acknowledged(&mut self, mid: MessageId) -> Option<String> {
        let topic = self.take_pending(mid, Operation::Unsubscribe)?;
        self.active.remove(&topic);
        Some(topic)
    }

    fn take_pending(&mut self, mid: MessageId, operation: Operation) -> Option<String> {
        match self.pending.get(&mid) {
            Some((pending, _)) if *pending == operation => {
                self.pending.remove(&mid).map(|(_, topic)| topic)
            }
            Some(_) => {
                warn!("acknowledgement for message id {} has the wrong kind", mid);
                None
            }
            None => {
                warn!("acknowledgement for unknown message id {}", mid);
                None
            }
        }
    }

    /// Forget every pending request, keeping the active subscriptions.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Active topic patterns in ascending order.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self.active.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    pub fn granted_qos(&self, topic: &str) -> Option<u8> {
        self.active.get(topic).copied()
    }

    pub fn is_pending(&self, mid: MessageId) -> bool {
        self.pending.contains_key(&mid)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Aggregate state after an acknowledgement: subscribed while any
    /// subscription is active.
    pub fn settled_state(&self) -> SubscriptionState {
        if self.active.is_empty() {
            SubscriptionState::Unsubscribed
        } else {
            SubscriptionState::Subscribed
        }
    }
}
