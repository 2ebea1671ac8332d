use std::sync::Arc;

use callgate_fabric::{AuditFabric, EventPayload};
use callgate_types::{Address, Amount, CallOutcome, Selector, Slot, Word};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::delegate::{CodeRegistry, Delegate};
use crate::error::GateError;
use crate::policy::PolicyStore;
use crate::state::GateState;
use crate::value::{Transfer, ValueLedger, ValueTransfer};

/// Default bound on nested call frames.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

/// Configuration for the delegate gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Identifier of the gate itself. Re-entrant calls made by delegates
    /// arrive with this address as the caller.
    pub address: Address,
    /// Initial owner
    pub owner: Address,
    /// Target of the fallback path. Fixed for the life of the gate.
    pub default_target: Address,
    /// Maximum nesting of call frames (default: 64)
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

impl GateConfig {
    pub fn new(address: Address, owner: Address, default_target: Address) -> Self {
        Self {
            address,
            owner,
            default_target,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    fn validate(&self) -> Result<(), GateError> {
        if self.address.is_zero() || self.owner.is_zero() || self.default_target.is_zero() {
            return Err(GateError::InvalidTarget);
        }
        Ok(())
    }
}

/// Builder for [`DelegateGate`].
pub struct GateBuilder {
    config: GateConfig,
    registry: CodeRegistry,
    fabric: Option<Arc<AuditFabric>>,
    value_sink: Option<Arc<dyn ValueTransfer>>,
    allowlist: Vec<(Address, Selector)>,
}

impl GateBuilder {
    /// Register delegate logic at `address`.
    pub fn delegate(self, address: Address, delegate: impl Delegate + 'static) -> Self {
        self.shared_delegate(address, Arc::new(delegate))
    }

    pub fn shared_delegate(mut self, address: Address, delegate: Arc<dyn Delegate>) -> Self {
        self.registry.register(address, delegate);
        self
    }

    /// Publish notifications to `fabric` (default: a private in-memory fabric).
    pub fn fabric(mut self, fabric: Arc<AuditFabric>) -> Self {
        self.fabric = Some(fabric);
        self
    }

    /// Settle outgoing value through `sink` (default: a [`ValueLedger`]).
    pub fn value_sink(mut self, sink: Arc<dyn ValueTransfer>) -> Self {
        self.value_sink = Some(sink);
        self
    }

    /// Allowlist a pair at construction. Reported like an owner addition.
    pub fn allow(mut self, target: Address, selector: Selector) -> Self {
        self.allowlist.push((target, selector));
        self
    }

    pub fn build(self) -> Result<DelegateGate, GateError> {
        self.config.validate()?;
        if self.allowlist.iter().any(|(target, _)| target.is_zero()) {
            return Err(GateError::InvalidTarget);
        }

        let fabric = self
            .fabric
            .unwrap_or_else(|| Arc::new(AuditFabric::in_memory()));
        let value_sink = self
            .value_sink
            .unwrap_or_else(|| Arc::new(ValueLedger::new()));

        let mut state = GateState::new(self.config.owner);
        let mut pending = vec![EventPayload::OwnershipTransferred {
            previous_owner: Address::ZERO,
            new_owner: self.config.owner,
        }];
        for (target, selector) in &self.allowlist {
            state.reserved.policy.set(*target, *selector, true);
            pending.push(EventPayload::Allowlisted {
                target: *target,
                selector: *selector,
            });
        }

        info!(
            gate = %self.config.address,
            owner = %self.config.owner,
            default_target = %self.config.default_target,
            allowlisted = self.allowlist.len(),
            delegates = self.registry.len(),
            "Delegate gate constructed"
        );

        let mut gate = DelegateGate {
            config: self.config,
            state,
            registry: self.registry,
            fabric,
            value_sink,
            pending,
            depth: 0,
        };
        gate.flush_notifications();
        Ok(gate)
    }
}

/// The delegate gate.
///
/// Forwards allowlisted operations to delegate logic that runs against the
/// gate's own state, caller and attached value. Administration is limited to
/// the single owner.
///
/// Every entry point runs inside a call frame: on error the gate's state is
/// exactly as it was before the call, and notifications are published only
/// once the outermost frame settles.
pub struct DelegateGate {
    config: GateConfig,
    pub(crate) state: GateState,
    registry: CodeRegistry,
    fabric: Arc<AuditFabric>,
    value_sink: Arc<dyn ValueTransfer>,
    pending: Vec<EventPayload>,
    depth: usize,
}

impl DelegateGate {
    pub fn builder(config: GateConfig) -> GateBuilder {
        GateBuilder {
            config,
            registry: CodeRegistry::new(),
            fabric: None,
            value_sink: None,
            allowlist: Vec::new(),
        }
    }

    // --- Boundary ---

    /// Invoke the gate with a raw payload.
    ///
    /// An empty payload is a bare value transfer. A payload naming a gate
    /// operation is handled by the gate; anything else is forwarded to the
    /// default target. Returns the encoded result.
    pub fn call(
        &mut self,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<Vec<u8>, GateError> {
        self.in_frame(|gate| {
            gate.credit(value)?;
            gate.dispatch(caller, value, payload)
        })
    }

    /// Bare value transfer into the gate.
    pub fn receive(&mut self, caller: Address, value: Amount) -> Result<(), GateError> {
        self.call(caller, value, &[]).map(|_| ())
    }

    /// Forward `payload` to `target` if the pair is allowlisted.
    pub fn execute_delegatecall(
        &mut self,
        caller: Address,
        value: Amount,
        target: Address,
        payload: &[u8],
    ) -> Result<CallOutcome, GateError> {
        self.in_frame(|gate| {
            gate.credit(value)?;
            gate.forward(caller, value, target, payload)
        })
    }

    // --- Administration (owner only) ---

    pub fn add_to_allowlist(
        &mut self,
        caller: Address,
        target: Address,
        selector: Selector,
    ) -> Result<(), GateError> {
        self.in_frame(|gate| gate.admin_add(caller, target, selector))
    }

    pub fn add_batch_to_allowlist(
        &mut self,
        caller: Address,
        target: Address,
        selectors: &[Selector],
    ) -> Result<(), GateError> {
        self.in_frame(|gate| gate.admin_add_batch(caller, target, selectors))
    }

    pub fn remove_from_allowlist(
        &mut self,
        caller: Address,
        target: Address,
        selector: Selector,
    ) -> Result<(), GateError> {
        self.in_frame(|gate| gate.admin_remove(caller, target, selector))
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), GateError> {
        self.in_frame(|gate| gate.admin_transfer_ownership(caller, new_owner))
    }

    pub fn withdraw_ether(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), GateError> {
        self.in_frame(|gate| gate.admin_withdraw(caller, to, amount))
    }

    /// Register delegate logic after construction. Registering code does not
    /// allowlist anything.
    pub fn deploy(&mut self, address: Address, delegate: Arc<dyn Delegate>) {
        debug!(%address, "Delegate logic deployed");
        self.registry.register(address, delegate);
    }

    // --- Queries ---

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn owner(&self) -> Address {
        self.state.owner()
    }

    pub fn default_target(&self) -> Address {
        self.config.default_target
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Raw policy entry.
    pub fn allowlist(&self, target: &Address, selector: Selector) -> bool {
        self.state.policy().get(target, selector)
    }

    /// Admission decision for a pair.
    pub fn is_allowed(&self, target: &Address, selector: Selector) -> bool {
        crate::admission::is_allowed(self.state.policy(), target, selector)
    }

    pub fn get_allowlist_status(&self, target: &Address, selectors: &[Selector]) -> Vec<bool> {
        self.state.policy().get_batch(target, selectors)
    }

    pub fn policy(&self) -> &PolicyStore {
        self.state.policy()
    }

    pub fn balance(&self) -> Amount {
        self.state.balance
    }

    pub fn storage_at(&self, slot: &Slot) -> Word {
        self.state.storage.load(slot)
    }

    /// The full state region.
    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn fabric(&self) -> &Arc<AuditFabric> {
        &self.fabric
    }

    /// Current frame nesting; zero between invocations.
    pub fn depth(&self) -> usize {
        self.depth
    }

    // --- Frame machinery ---

    /// Run `op` in a new call frame.
    ///
    /// A failing frame restores the state snapshot taken on entry and drops
    /// its buffered notifications, keeping forwarded-call outcomes. The
    /// outermost frame settles outgoing value and then publishes.
    pub(crate) fn in_frame<T, F>(&mut self, op: F) -> Result<T, GateError>
    where
        F: FnOnce(&mut Self) -> Result<T, GateError>,
    {
        if self.depth >= self.config.max_call_depth {
            warn!(
                depth = self.depth,
                limit = self.config.max_call_depth,
                "Call depth limit reached"
            );
            return Err(GateError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        let snapshot = self.state.clone();
        let mark = self.pending.len();

        self.depth += 1;
        let mut result = op(self);
        self.depth -= 1;

        let mut settlement_refused = false;
        if self.depth == 0 && result.is_ok() {
            if let Err(e) = self.settle_outbox() {
                settlement_refused = true;
                result = Err(e);
            }
        }

        if let Err(ref e) = result {
            debug!(depth = self.depth, error = %e, "Call frame reverted");
            self.state = snapshot;
            self.discard_reverted(mark);
            if settlement_refused {
                self.fail_outcomes(mark);
            }
        }

        if self.depth == 0 {
            self.flush_notifications();
        }

        result
    }

    /// Re-entrant call made by delegate logic. The gate is the caller and the
    /// value moves from the gate to itself.
    pub(crate) fn reenter(&mut self, value: Amount, payload: &[u8]) -> Result<Vec<u8>, GateError> {
        self.in_frame(|gate| {
            if value > gate.state.balance {
                return Err(GateError::InsufficientBalance {
                    requested: value,
                    available: gate.state.balance,
                });
            }
            let caller = gate.config.address;
            gate.dispatch(caller, value, payload)
        })
    }

    pub(crate) fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    pub(crate) fn notify(&mut self, payload: EventPayload) {
        self.pending.push(payload);
    }

    pub(crate) fn credit(&mut self, value: Amount) -> Result<(), GateError> {
        self.state.balance = self
            .state
            .balance
            .checked_add(value)
            .ok_or(GateError::BalanceOverflow)?;
        Ok(())
    }

    /// Debit the balance now; the transfer settles with the outermost frame.
    pub(crate) fn debit(&mut self, to: Address, amount: Amount) -> Result<(), GateError> {
        let available = self.state.balance;
        if amount > available {
            return Err(GateError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.state.balance = available - amount;
        self.state.outbox.push(Transfer { to, amount });
        Ok(())
    }

    fn settle_outbox(&mut self) -> Result<(), GateError> {
        let transfers = std::mem::take(&mut self.state.outbox);
        if transfers.is_empty() {
            return Ok(());
        }

        self.value_sink.settle(&transfers).map_err(|data| {
            warn!(transfers = transfers.len(), "Value settlement refused");
            GateError::ForwardedCallFailed(data)
        })
    }

    fn discard_reverted(&mut self, mark: usize) {
        let outcomes: Vec<EventPayload> = self
            .pending
            .drain(mark..)
            .filter(|p| matches!(p, EventPayload::ForwardExecuted { .. }))
            .collect();
        self.pending.extend(outcomes);
    }

    /// Mark every outcome retained since `mark` as failed. Used when the
    /// whole invocation is rolled back after its forwards returned.
    fn fail_outcomes(&mut self, mark: usize) {
        for payload in &mut self.pending[mark..] {
            if let EventPayload::ForwardExecuted { success, .. } = payload {
                *success = false;
            }
        }
    }

    fn flush_notifications(&mut self) {
        let gate = self.config.address;
        for payload in self.pending.drain(..) {
            self.fabric.publish(gate, payload);
        }
    }
}
