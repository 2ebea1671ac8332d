//! Audit Fabric: the notification side-channel of the callgate delegate gate.
//!
//! The gate reports allowlist changes, forwarded-call outcomes, ownership
//! changes and value movements here. The fabric provides:
//! - Sequenced, integrity-hashed events
//! - Fan-out to filtered subscribers over bounded channels
//! - An append-only in-memory journal for queries and replay
//!
//! The fabric holds no gate state. Publishing never fails and never blocks
//! the gate.

pub mod error;
pub mod event;
pub mod journal;
pub mod router;

use std::sync::{PoisonError, RwLock};

use callgate_types::Address;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub use error::FabricError;
pub use event::{EventId, EventKind, EventPayload, GateEvent, Hash};
pub use journal::{EventJournal, IntegrityReport, JournalFilter};
pub use router::{NotificationRouter, SubscriptionId};

/// Configuration for the Audit Fabric.
#[derive(Clone, Debug)]
pub struct FabricConfig {
    /// Per-subscriber channel capacity (must be non-zero)
    pub channel_capacity: usize,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// The Audit Fabric.
pub struct AuditFabric {
    journal: RwLock<EventJournal>,
    router: NotificationRouter,
}

impl AuditFabric {
    pub fn new(config: FabricConfig) -> Result<Self, FabricError> {
        if config.channel_capacity == 0 {
            return Err(FabricError::InvalidConfig(
                "channel_capacity must be greater than zero".into(),
            ));
        }

        info!(
            channel_capacity = config.channel_capacity,
            "Audit Fabric initialized"
        );

        Ok(Self::with_capacity(config.channel_capacity))
    }

    /// Fabric with default configuration.
    pub fn in_memory() -> Self {
        Self::with_capacity(FabricConfig::default().channel_capacity)
    }

    fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            journal: RwLock::new(EventJournal::new()),
            router: NotificationRouter::new(channel_capacity),
        }
    }

    /// Capacity of each subscriber channel.
    pub fn channel_capacity(&self) -> usize {
        self.router.capacity()
    }

    /// Publish an event emitted by `gate`.
    ///
    /// Assigns the next sequence number, computes the integrity hash,
    /// appends to the journal and routes to subscribers.
    pub fn publish(&self, gate: Address, payload: EventPayload) -> GateEvent {
        let event = {
            let mut journal = self.journal.write().unwrap_or_else(PoisonError::into_inner);
            let event = GateEvent::new(
                EventId::new(),
                journal.next_sequence(),
                Utc::now(),
                gate,
                payload,
            );
            journal.append(event.clone());
            event
        };

        let delivered = self.router.route(&event);
        debug!(
            sequence = event.sequence,
            kind = ?event.kind(),
            delivered,
            "Event published"
        );

        event
    }

    /// Subscribe to events of the given kinds (None = all kinds).
    pub fn subscribe(&self, kinds: Option<Vec<EventKind>>) -> mpsc::Receiver<GateEvent> {
        let (_id, rx) = self.router.subscribe(kinds);
        rx
    }

    /// Events matching a filter, in publication order.
    pub fn query(&self, filter: &JournalFilter) -> Vec<GateEvent> {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .query(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// All payloads published so far, in order.
    pub fn payloads(&self) -> Vec<EventPayload> {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.payload.clone())
            .collect()
    }

    pub fn event(&self, sequence: u64) -> Result<GateEvent, FabricError> {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sequence)
            .cloned()
            .ok_or(FabricError::EventNotFound(sequence))
    }

    /// Replay journaled events starting at `from_sequence`.
    /// Returns the number of events handed to `handler`.
    pub fn replay<F>(&self, from_sequence: u64, mut handler: F) -> Result<u64, FabricError>
    where
        F: FnMut(&GateEvent) -> Result<(), FabricError>,
    {
        let journal = self.journal.read().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0;
        for event in journal.iter().filter(|e| e.sequence >= from_sequence) {
            if !event.verify_integrity() {
                return Err(FabricError::IntegrityFailure {
                    sequence: event.sequence,
                });
            }
            handler(event)?;
            count += 1;
        }
        Ok(count)
    }

    /// Verify journal integrity.
    pub fn verify(&self) -> IntegrityReport {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .verify()
    }

    pub fn len(&self) -> usize {
        self.journal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.router.subscription_count()
    }
}

impl Default for AuditFabric {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callgate_types::Selector;
    use std::sync::Arc;

    fn gate() -> Address {
        Address::derive("gate")
    }

    fn allowlisted(n: u32) -> EventPayload {
        EventPayload::Allowlisted {
            target: Address::derive("delegate"),
            selector: Selector::from(n),
        }
    }

    #[test]
    fn zero_capacity_rejected() {
        let result = AuditFabric::new(FabricConfig {
            channel_capacity: 0,
        });
        assert!(matches!(result, Err(FabricError::InvalidConfig(_))));
    }

    #[test]
    fn in_memory_matches_default_config() {
        let default = AuditFabric::new(FabricConfig::default()).unwrap();
        let in_memory = AuditFabric::in_memory();

        assert_eq!(in_memory.channel_capacity(), 1024);
        assert_eq!(in_memory.channel_capacity(), default.channel_capacity());
        assert_eq!(in_memory.len(), 0);

        let custom = AuditFabric::new(FabricConfig {
            channel_capacity: 8,
        })
        .unwrap();
        assert_eq!(custom.channel_capacity(), 8);
    }

    #[tokio::test]
    async fn publish_and_subscribe() {
        let fabric = AuditFabric::in_memory();
        let mut rx = fabric.subscribe(None);

        let event = fabric.publish(gate(), allowlisted(1));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
        assert_eq!(received.sequence, 1);
        assert!(received.verify_integrity());
    }

    #[test]
    fn sequences_are_contiguous() {
        let fabric = AuditFabric::in_memory();
        for n in 0..5 {
            fabric.publish(gate(), allowlisted(n));
        }
        let sequences: Vec<u64> = fabric
            .query(&JournalFilter::new())
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(fabric.event(3).unwrap().sequence, 3);
        assert!(matches!(
            fabric.event(9),
            Err(FabricError::EventNotFound(9))
        ));
    }

    #[test]
    fn replay_from_sequence() {
        let fabric = AuditFabric::in_memory();
        for n in 0..4 {
            fabric.publish(gate(), allowlisted(n));
        }

        let mut seen = Vec::new();
        let count = fabric
            .replay(3, |event| {
                seen.push(event.sequence);
                Ok(())
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen, vec![3, 4]);
    }

    #[test]
    fn replay_stops_on_handler_error() {
        let fabric = AuditFabric::in_memory();
        fabric.publish(gate(), allowlisted(1));
        fabric.publish(gate(), allowlisted(2));

        let result = fabric.replay(1, |_| Err(FabricError::Handler("stop".into())));
        assert!(matches!(result, Err(FabricError::Handler(_))));
    }

    #[test]
    fn concurrent_publishers_keep_journal_clean() {
        let fabric = Arc::new(AuditFabric::in_memory());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let fabric = fabric.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        fabric.publish(Address::derive(&format!("gate-{i}")), allowlisted(j));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let report = fabric.verify();
        assert!(report.is_clean());
        assert_eq!(report.total_events, 200);
    }
}
