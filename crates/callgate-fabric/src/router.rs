use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::{EventKind, GateEvent};

/// Subscription identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscription {
    id: SubscriptionId,
    /// Filter by event kind (None = all kinds)
    kinds: Option<Vec<EventKind>>,
    sender: mpsc::Sender<GateEvent>,
}

impl Subscription {
    fn matches(&self, event: &GateEvent) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&event.kind()),
            None => true,
        }
    }
}

/// Fans published events out to subscribers.
///
/// Delivery never blocks the publisher: a subscriber whose channel is full
/// misses the event (logged), and closed subscribers are pruned on the next
/// delivery.
pub struct NotificationRouter {
    subscriptions: RwLock<Vec<Subscription>>,
    capacity: usize,
}

impl NotificationRouter {
    /// `capacity` must be non-zero; [`crate::AuditFabric::new`] validates it.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            capacity,
        }
    }

    /// Subscribe to events of the given kinds (None = all).
    pub fn subscribe(
        &self,
        kinds: Option<Vec<EventKind>>,
    ) -> (SubscriptionId, mpsc::Receiver<GateEvent>) {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriptionId::new();

        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id: id.clone(),
                kinds,
                sender,
            });
        debug!(subscription_id = %id.0, "New subscription registered");

        (id, receiver)
    }

    /// Route an event to all matching subscribers.
    /// Returns the number of subscribers that received it.
    pub fn route(&self, event: &GateEvent) -> usize {
        let mut delivered = 0;
        let mut closed_ids = Vec::new();

        {
            let subs = self
                .subscriptions
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            for sub in subs.iter().filter(|s| s.matches(event)) {
                match sub.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            subscription_id = %sub.id.0,
                            sequence = event.sequence,
                            "Subscriber channel full, dropping event"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        closed_ids.push(sub.id.clone());
                    }
                }
            }
        }

        if !closed_ids.is_empty() {
            let mut subs = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subs.retain(|s| !closed_ids.contains(&s.id));
            debug!(removed = closed_ids.len(), "Cleaned up closed subscriptions");
        }

        delivered
    }

    /// Remove a subscription by ID.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != *id);
        debug!(subscription_id = %id.0, "Subscription removed");
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, EventPayload};
    use callgate_types::{Address, Selector};
    use chrono::Utc;

    fn event(sequence: u64, payload: EventPayload) -> GateEvent {
        GateEvent::new(
            EventId::new(),
            sequence,
            Utc::now(),
            Address::derive("gate"),
            payload,
        )
    }

    fn allowlisted(sequence: u64) -> GateEvent {
        event(
            sequence,
            EventPayload::Allowlisted {
                target: Address::derive("delegate"),
                selector: Selector::from(1_u32),
            },
        )
    }

    #[test]
    fn subscribe_and_receive() {
        let router = NotificationRouter::new(16);
        let (_id, mut rx) = router.subscribe(None);

        let e = allowlisted(1);
        assert_eq!(router.route(&e), 1);
        assert_eq!(rx.try_recv().unwrap().id, e.id);
    }

    #[test]
    fn kind_filter() {
        let router = NotificationRouter::new(16);
        let (_id, mut rx) = router.subscribe(Some(vec![EventKind::Forward]));

        assert_eq!(router.route(&allowlisted(1)), 0);
        assert!(rx.try_recv().is_err());

        let forward = event(
            2,
            EventPayload::ForwardExecuted {
                success: true,
                target: Address::derive("delegate"),
                selector: Selector::from(1_u32),
            },
        );
        assert_eq!(router.route(&forward), 1);
        assert_eq!(rx.try_recv().unwrap().kind(), EventKind::Forward);
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let router = NotificationRouter::new(1);
        let (_id, mut rx) = router.subscribe(None);

        assert_eq!(router.route(&allowlisted(1)), 1);
        assert_eq!(router.route(&allowlisted(2)), 0);

        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let router = NotificationRouter::new(4);
        let (_id, rx) = router.subscribe(None);
        assert_eq!(router.subscription_count(), 1);

        drop(rx);
        router.route(&allowlisted(1));
        assert_eq!(router.subscription_count(), 0);
    }

    #[test]
    fn unsubscribe_removes() {
        let router = NotificationRouter::new(4);
        let (id, _rx) = router.subscribe(None);
        router.unsubscribe(&id);
        assert_eq!(router.subscription_count(), 0);
    }
}
