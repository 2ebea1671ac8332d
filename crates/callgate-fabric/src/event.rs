use std::fmt;

use callgate_types::{Address, Amount, Selector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a published event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt:{}", self.0)
    }
}

/// BLAKE3 hash wrapper for event integrity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", hex::encode(&self.0[..8]))
    }
}

/// Coarse classification of events, used for subscription filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Allowlist additions and removals
    Allowlist,
    /// Outcomes of forwarded calls
    Forward,
    /// Ownership changes
    Ownership,
    /// Value received or withdrawn
    Value,
    /// Logs emitted by delegate logic running in the gate's context
    Delegate,
}

/// Event-specific payload. Identifiers are carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    Allowlisted {
        target: Address,
        selector: Selector,
    },
    RemovedFromAllowlist {
        target: Address,
        selector: Selector,
    },
    ForwardExecuted {
        success: bool,
        target: Address,
        selector: Selector,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    ValueReceived {
        sender: Address,
        amount: Amount,
    },
    ValueWithdrawn {
        recipient: Address,
        amount: Amount,
    },
    DelegateLog {
        target: Address,
        data: Vec<u8>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Allowlisted { .. } | EventPayload::RemovedFromAllowlist { .. } => {
                EventKind::Allowlist
            }
            EventPayload::ForwardExecuted { .. } => EventKind::Forward,
            EventPayload::OwnershipTransferred { .. } => EventKind::Ownership,
            EventPayload::ValueReceived { .. } | EventPayload::ValueWithdrawn { .. } => {
                EventKind::Value
            }
            EventPayload::DelegateLog { .. } => EventKind::Delegate,
        }
    }
}

/// A published gate event.
///
/// Events are immutable once created. Every event carries a BLAKE3 integrity
/// hash over its identity, position and payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateEvent {
    pub id: EventId,
    /// Position in the fabric's journal, starting at 1
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    /// Gate that emitted the event
    pub gate: Address,
    pub payload: EventPayload,
    pub integrity_hash: Hash,
}

impl GateEvent {
    /// Create a new event and compute its integrity hash.
    pub fn new(
        id: EventId,
        sequence: u64,
        recorded_at: DateTime<Utc>,
        gate: Address,
        payload: EventPayload,
    ) -> Self {
        let integrity_hash = Self::compute_hash(&id, sequence, &recorded_at, &gate, &payload);
        Self {
            id,
            sequence,
            recorded_at,
            gate,
            payload,
            integrity_hash,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Verify the integrity hash of this event.
    pub fn verify_integrity(&self) -> bool {
        let expected = Self::compute_hash(
            &self.id,
            self.sequence,
            &self.recorded_at,
            &self.gate,
            &self.payload,
        );
        self.integrity_hash == expected
    }

    fn compute_hash(
        id: &EventId,
        sequence: u64,
        recorded_at: &DateTime<Utc>,
        gate: &Address,
        payload: &EventPayload,
    ) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"gate-event-v1:");
        hasher.update(id.0.as_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.update(&recorded_at.timestamp_micros().to_le_bytes());
        hasher.update(gate.as_bytes());

        // Payload (serialize to JSON for deterministic hashing)
        if let Ok(payload_bytes) = serde_json::to_vec(payload) {
            hasher.update(&payload_bytes);
        }

        Hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> GateEvent {
        GateEvent::new(
            EventId::new(),
            1,
            Utc::now(),
            Address::derive("gate"),
            EventPayload::Allowlisted {
                target: Address::derive("delegate"),
                selector: Selector::from(0x12345678_u32),
            },
        )
    }

    #[test]
    fn fresh_event_verifies() {
        assert!(sample_event().verify_integrity());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let mut event = sample_event();
        event.payload = EventPayload::RemovedFromAllowlist {
            target: Address::derive("delegate"),
            selector: Selector::from(0x12345678_u32),
        };
        assert!(!event.verify_integrity());
    }

    #[test]
    fn tampered_sequence_fails_verification() {
        let mut event = sample_event();
        event.sequence = 2;
        assert!(!event.verify_integrity());
    }

    #[test]
    fn kinds_classify_payloads() {
        let forward = EventPayload::ForwardExecuted {
            success: false,
            target: Address::derive("t"),
            selector: Selector::from(1_u32),
        };
        assert_eq!(forward.kind(), EventKind::Forward);

        let received = EventPayload::ValueReceived {
            sender: Address::derive("s"),
            amount: 10,
        };
        assert_eq!(received.kind(), EventKind::Value);
    }

    #[test]
    fn event_serialization_roundtrip_keeps_integrity() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let restored: GateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, event.id);
        assert!(restored.verify_integrity());
    }
}
