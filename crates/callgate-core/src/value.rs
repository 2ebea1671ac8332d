use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use callgate_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::delegate::Revert;

/// An outgoing value movement from the gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    pub amount: Amount,
}

/// Value collaborator: moves value out of the gate.
///
/// `settle` is all-or-nothing. On refusal it returns the failure bytes,
/// which the gate surfaces as a forwarded-call failure.
pub trait ValueTransfer: Send + Sync {
    fn settle(&self, transfers: &[Transfer]) -> Result<(), Vec<u8>>;
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, Amount>,
    refusing: HashSet<Address>,
}

/// In-memory value sink. Credits recipients; can be told to refuse one.
#[derive(Default)]
pub struct ValueLedger {
    inner: Mutex<LedgerState>,
}

impl ValueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every future transfer to `recipient`.
    pub fn refuse(&self, recipient: Address) {
        self.lock().refusing.insert(recipient);
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.lock().balances.get(account).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ValueTransfer for ValueLedger {
    fn settle(&self, transfers: &[Transfer]) -> Result<(), Vec<u8>> {
        let mut state = self.lock();

        if let Some(refused) = transfers.iter().find(|t| state.refusing.contains(&t.to)) {
            warn!(recipient = %refused.to, amount = refused.amount, "Recipient refused value");
            return Err(Revert::with_reason(&format!("recipient {} refuses value", refused.to))
                .into_bytes());
        }

        let mut staged: HashMap<Address, Amount> = HashMap::new();
        for transfer in transfers {
            let current = staged
                .get(&transfer.to)
                .or_else(|| state.balances.get(&transfer.to))
                .copied()
                .unwrap_or(0);
            let next = current
                .checked_add(transfer.amount)
                .ok_or_else(|| Revert::with_reason("recipient balance overflow").into_bytes())?;
            staged.insert(transfer.to, next);
        }

        state.balances.extend(staged);
        debug!(transfers = transfers.len(), "Value settled");
        Ok(())
    }
}
