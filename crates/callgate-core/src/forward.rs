use callgate_fabric::EventPayload;
use callgate_types::{Address, Amount, CallOutcome};
use tracing::{debug, warn};

use crate::admission;
use crate::context::ExecutionContext;
use crate::delegate::Revert;
use crate::error::GateError;
use crate::gate::DelegateGate;

impl DelegateGate {
    /// Call-forwarding engine.
    ///
    /// Admits the payload's selector against `target`, runs the target's
    /// logic in the gate's context and reports exactly one outcome per
    /// admitted call. A denied call touches nothing and reports nothing.
    ///
    /// Must run inside a call frame: the frame reverts the delegate's writes
    /// when this returns an error.
    pub(crate) fn forward(
        &mut self,
        caller: Address,
        value: Amount,
        target: Address,
        payload: &[u8],
    ) -> Result<CallOutcome, GateError> {
        let selector = admission::admit(self.state.policy(), &target, payload)?;

        debug!(
            %caller,
            %target,
            %selector,
            value,
            depth = self.depth(),
            "Forwarding call"
        );

        let delegate = self.registry().resolve(&target);
        let result = match delegate {
            Some(delegate) => {
                let mut ctx = ExecutionContext::new(self, caller, value, target, selector);
                delegate.execute(&mut ctx, payload)
            }
            None => {
                warn!(%target, "No logic registered at target");
                Err(Revert::empty())
            }
        };

        self.notify(EventPayload::ForwardExecuted {
            success: result.is_ok(),
            target,
            selector,
        });

        match result {
            Ok(return_data) => {
                debug!(%target, %selector, returned = return_data.len(), "Forwarded call succeeded");
                Ok(CallOutcome::succeeded(return_data))
            }
            Err(revert) => {
                warn!(%target, %selector, %revert, "Forwarded call failed");
                Err(GateError::ForwardedCallFailed(revert.into_bytes()))
            }
        }
    }
}
