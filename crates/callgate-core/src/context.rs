use callgate_fabric::EventPayload;
use callgate_types::{Address, Amount, Selector, Slot, Word};

use crate::delegate::Revert;
use crate::error::GateError;
use crate::gate::DelegateGate;
use crate::policy::PolicyStore;

/// What delegate logic sees while it runs in the gate's context.
///
/// Storage reads and writes land in the gate's own general storage region.
/// The reserved region (owner, policy store) is readable but has no write
/// path here: the only way to change it is a re-entrant call through
/// [`ExecutionContext::call_gate`], which is admission- and owner-checked like
/// any other call.
pub struct ExecutionContext<'a> {
    gate: &'a mut DelegateGate,
    caller: Address,
    value: Amount,
    target: Address,
    selector: Selector,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        gate: &'a mut DelegateGate,
        caller: Address,
        value: Amount,
        target: Address,
        selector: Selector,
    ) -> Self {
        Self {
            gate,
            caller,
            value,
            target,
            selector,
        }
    }

    /// The original caller of the gate.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// The value attached to the original call.
    pub fn value(&self) -> Amount {
        self.value
    }

    /// The gate whose state this logic runs against.
    pub fn this(&self) -> Address {
        self.gate.address()
    }

    /// Address the running logic was loaded from.
    pub fn target(&self) -> Address {
        self.target
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    // --- Reserved region (read-only) ---

    pub fn layout_version(&self) -> u16 {
        self.gate.state.reserved().layout_version
    }

    pub fn owner(&self) -> Address {
        self.gate.owner()
    }

    pub fn default_target(&self) -> Address {
        self.gate.default_target()
    }

    pub fn policy(&self) -> &PolicyStore {
        self.gate.policy()
    }

    pub fn is_allowed(&self, target: &Address, selector: Selector) -> bool {
        self.gate.is_allowed(target, selector)
    }

    // --- General storage ---

    pub fn load(&self, slot: &Slot) -> Word {
        self.gate.state.storage.load(slot)
    }

    pub fn store(&mut self, slot: Slot, word: Word) {
        self.gate.state.storage.store(slot, word);
    }

    // --- Value ---

    /// The gate's balance, including the value attached to this call.
    pub fn balance(&self) -> Amount {
        self.gate.balance()
    }

    /// Send value from the gate's balance. Settles only if the whole
    /// invocation succeeds.
    pub fn transfer(&mut self, to: Address, amount: Amount) -> Result<(), Revert> {
        if to.is_zero() {
            return Err(GateError::InvalidTarget.into());
        }
        self.gate.debit(to, amount).map_err(Revert::from)
    }

    // --- Side effects ---

    /// Emit a log attributed to the running logic.
    pub fn emit(&mut self, data: Vec<u8>) {
        let target = self.target;
        self.gate.notify(EventPayload::DelegateLog { target, data });
    }

    /// Call back into the gate with the gate itself as caller.
    ///
    /// Goes through the full dispatcher: gate operations are owner-checked
    /// and anything else is admission-checked against the default target. A
    /// failure reverts only the re-entrant call.
    pub fn call_gate(&mut self, value: Amount, payload: &[u8]) -> Result<Vec<u8>, GateError> {
        self.gate.reenter(value, payload)
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("gate", &self.gate.address())
            .field("caller", &self.caller)
            .field("value", &self.value)
            .field("target", &self.target)
            .field("selector", &self.selector)
            .finish()
    }
}
