use callgate_types::Address;
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, GateEvent};

/// Filter for querying the journal.
#[derive(Clone, Debug, Default)]
pub struct JournalFilter {
    pub kind: Option<EventKind>,
    pub gate: Option<Address>,
    pub sequence_range: Option<(u64, u64)>,
}

impl JournalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_gate(mut self, gate: Address) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Inclusive range of sequence numbers.
    pub fn with_sequence_range(mut self, from: u64, to: u64) -> Self {
        self.sequence_range = Some((from, to));
        self
    }

    pub fn matches(&self, event: &GateEvent) -> bool {
        if let Some(kind) = self.kind {
            if event.kind() != kind {
                return false;
            }
        }

        if let Some(ref gate) = self.gate {
            if event.gate != *gate {
                return false;
            }
        }

        if let Some((from, to)) = self.sequence_range {
            if event.sequence < from || event.sequence > to {
                return false;
            }
        }

        true
    }
}

/// Journal integrity report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub total_events: u64,
    pub verified_events: u64,
    pub corrupted_events: u64,
    pub corrupted_sequences: Vec<u64>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted_events == 0
    }
}

/// Event Journal: append-only record of every published event.
///
/// No delete or modify operations exist. Sequence numbers are assigned by
/// the journal and are contiguous from 1.
#[derive(Default)]
pub struct EventJournal {
    events: Vec<GateEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next appended event must carry.
    pub fn next_sequence(&self) -> u64 {
        self.events.len() as u64 + 1
    }

    /// Append an event. APPEND-ONLY.
    ///
    /// Returns `false` (and drops the event) if its sequence is not the next
    /// expected one.
    pub fn append(&mut self, event: GateEvent) -> bool {
        if event.sequence != self.next_sequence() {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn get(&self, sequence: u64) -> Option<&GateEvent> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.events.get(index)
    }

    pub fn query(&self, filter: &JournalFilter) -> Vec<&GateEvent> {
        self.events.iter().filter(|e| filter.matches(e)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GateEvent> {
        self.events.iter()
    }

    pub fn verify(&self) -> IntegrityReport {
        let corrupted_sequences: Vec<u64> = self
            .events
            .iter()
            .filter(|e| !e.verify_integrity())
            .map(|e| e.sequence)
            .collect();

        let total = self.events.len() as u64;
        let corrupted = corrupted_sequences.len() as u64;
        IntegrityReport {
            total_events: total,
            verified_events: total - corrupted,
            corrupted_events: corrupted,
            corrupted_sequences,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, EventPayload};
    use callgate_types::Selector;
    use chrono::Utc;

    fn gate() -> Address {
        Address::derive("gate")
    }

    fn event(sequence: u64, payload: EventPayload) -> GateEvent {
        GateEvent::new(EventId::new(), sequence, Utc::now(), gate(), payload)
    }

    fn received(sequence: u64) -> GateEvent {
        event(
            sequence,
            EventPayload::ValueReceived {
                sender: Address::derive("sender"),
                amount: 5,
            },
        )
    }

    #[test]
    fn append_enforces_contiguous_sequence() {
        let mut journal = EventJournal::new();
        assert!(journal.append(received(1)));
        assert!(!journal.append(received(3)));
        assert!(!journal.append(received(1)));
        assert!(journal.append(received(2)));
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.next_sequence(), 3);
    }

    #[test]
    fn get_by_sequence() {
        let mut journal = EventJournal::new();
        journal.append(received(1));
        assert_eq!(journal.get(1).unwrap().sequence, 1);
        assert!(journal.get(0).is_none());
        assert!(journal.get(2).is_none());
    }

    #[test]
    fn query_by_kind_and_range() {
        let mut journal = EventJournal::new();
        journal.append(received(1));
        journal.append(event(
            2,
            EventPayload::Allowlisted {
                target: Address::derive("t"),
                selector: Selector::from(9_u32),
            },
        ));
        journal.append(received(3));

        let values = journal.query(&JournalFilter::new().with_kind(EventKind::Value));
        assert_eq!(values.len(), 2);

        let ranged = journal.query(
            &JournalFilter::new()
                .with_kind(EventKind::Value)
                .with_sequence_range(2, 3),
        );
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].sequence, 3);

        let other_gate = journal.query(&JournalFilter::new().with_gate(Address::derive("x")));
        assert!(other_gate.is_empty());
    }

    #[test]
    fn verify_reports_clean_journal() {
        let mut journal = EventJournal::new();
        for seq in 1..=5 {
            journal.append(received(seq));
        }
        let report = journal.verify();
        assert!(report.is_clean());
        assert_eq!(report.total_events, 5);
        assert_eq!(report.verified_events, 5);
    }
}
