use callgate_fabric::EventPayload;
use callgate_types::{Address, Amount, Selector};
use tracing::{info, warn};

use crate::error::GateError;
use crate::gate::DelegateGate;

/// Owner-only mutations. Each checks the caller before anything else and
/// validates every argument before the first write.
impl DelegateGate {
    fn only_owner(&self, caller: &Address) -> Result<(), GateError> {
        if *caller != self.state.owner() {
            warn!(%caller, owner = %self.state.owner(), "Unauthorized administrative call");
            return Err(GateError::Unauthorized);
        }
        Ok(())
    }

    pub(crate) fn admin_add(
        &mut self,
        caller: Address,
        target: Address,
        selector: Selector,
    ) -> Result<(), GateError> {
        self.only_owner(&caller)?;
        if target.is_zero() {
            return Err(GateError::InvalidTarget);
        }

        self.state.reserved.policy.set(target, selector, true);
        info!(%target, %selector, "Selector allowlisted");
        self.notify(EventPayload::Allowlisted { target, selector });
        Ok(())
    }

    pub(crate) fn admin_add_batch(
        &mut self,
        caller: Address,
        target: Address,
        selectors: &[Selector],
    ) -> Result<(), GateError> {
        self.only_owner(&caller)?;
        if target.is_zero() {
            return Err(GateError::InvalidTarget);
        }

        for selector in selectors {
            self.state.reserved.policy.set(target, *selector, true);
            self.notify(EventPayload::Allowlisted {
                target,
                selector: *selector,
            });
        }
        info!(%target, count = selectors.len(), "Selector batch allowlisted");
        Ok(())
    }

    /// Removing an absent pair is not an error and still reports the removal.
    pub(crate) fn admin_remove(
        &mut self,
        caller: Address,
        target: Address,
        selector: Selector,
    ) -> Result<(), GateError> {
        self.only_owner(&caller)?;

        self.state.reserved.policy.set(target, selector, false);
        info!(%target, %selector, "Selector removed from allowlist");
        self.notify(EventPayload::RemovedFromAllowlist { target, selector });
        Ok(())
    }

    pub(crate) fn admin_transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), GateError> {
        self.only_owner(&caller)?;
        if new_owner.is_zero() {
            return Err(GateError::InvalidTarget);
        }

        let previous_owner = self.state.owner();
        self.state.reserved.owner = new_owner;
        info!(%previous_owner, %new_owner, "Ownership transferred");
        self.notify(EventPayload::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    /// A transfer that cannot be made surfaces as a forwarded-call failure
    /// carrying the encoded cause.
    pub(crate) fn admin_withdraw(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), GateError> {
        self.only_owner(&caller)?;
        if to.is_zero() {
            return Err(GateError::InvalidTarget);
        }

        self.debit(to, amount)
            .map_err(|e| GateError::ForwardedCallFailed(e.revert_data()))?;
        info!(recipient = %to, amount, "Value withdrawn");
        self.notify(EventPayload::ValueWithdrawn {
            recipient: to,
            amount,
        });
        Ok(())
    }
}
