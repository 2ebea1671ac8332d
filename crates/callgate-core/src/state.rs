use std::collections::BTreeMap;

use callgate_types::{Address, Amount, Slot, Word};

use crate::policy::PolicyStore;
use crate::value::Transfer;

/// Version of the reserved-region layout. Delegates may check it before
/// relying on the position of gate-owned data.
pub const STATE_LAYOUT_VERSION: u16 = 1;

/// Gate-owned data. Readable by delegates, writable only by the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedRegion {
    pub layout_version: u16,
    pub owner: Address,
    pub policy: PolicyStore,
}

impl ReservedRegion {
    fn new(owner: Address) -> Self {
        Self {
            layout_version: STATE_LAYOUT_VERSION,
            owner,
            policy: PolicyStore::new(),
        }
    }
}

/// General storage written by delegate logic. Unset slots read as zero;
/// writing zero clears the slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageRegion {
    slots: BTreeMap<Slot, Word>,
}

impl StorageRegion {
    pub fn load(&self, slot: &Slot) -> Word {
        self.slots.get(slot).copied().unwrap_or(Word::ZERO)
    }

    pub fn store(&mut self, slot: Slot, word: Word) {
        if word.is_zero() {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, word);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Slot, &Word)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The gate's persistent state region.
///
/// Cloned as a snapshot when a call frame opens and restored when the frame
/// fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateState {
    pub(crate) reserved: ReservedRegion,
    pub(crate) storage: StorageRegion,
    pub(crate) balance: Amount,
    /// Outgoing transfers debited during the current invocation, settled
    /// when the outermost frame commits.
    pub(crate) outbox: Vec<Transfer>,
}

impl GateState {
    pub fn new(owner: Address) -> Self {
        Self {
            reserved: ReservedRegion::new(owner),
            storage: StorageRegion::default(),
            balance: 0,
            outbox: Vec::new(),
        }
    }

    pub fn reserved(&self) -> &ReservedRegion {
        &self.reserved
    }

    pub fn owner(&self) -> Address {
        self.reserved.owner
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.reserved.policy
    }

    pub fn storage(&self) -> &StorageRegion {
        &self.storage
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn pending_transfers(&self) -> &[Transfer] {
        &self.outbox
    }
}
