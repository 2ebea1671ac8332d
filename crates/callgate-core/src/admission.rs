//! Admission check: the single decision point for forwarded calls.
//!
//! Pure reads of the [`PolicyStore`]. Exposed on its own so callers can
//! simulate admission before submitting a call.

use callgate_types::{Address, Selector};
use tracing::warn;

use crate::error::GateError;
use crate::policy::PolicyStore;

/// Whether `selector` may be forwarded to `target`.
pub fn is_allowed(policy: &PolicyStore, target: &Address, selector: Selector) -> bool {
    policy.get(target, selector)
}

/// Extract the selector of `payload` and admit it against `target`.
///
/// Returns the selector on success.
pub fn admit(
    policy: &PolicyStore,
    target: &Address,
    payload: &[u8],
) -> Result<Selector, GateError> {
    let selector = Selector::from_payload(payload).ok_or(GateError::PayloadTooShort {
        len: payload.len(),
    })?;

    if !is_allowed(policy, target, selector) {
        warn!(%target, %selector, "Admission denied");
        return Err(GateError::OperationNotAllowed {
            target: *target,
            selector,
        });
    }

    Ok(selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_allowed_selector() {
        let target = Address::derive("delegate");
        let mut policy = PolicyStore::new();
        policy.set(target, Selector::from(0x12345678_u32), true);

        let payload = [0x12, 0x34, 0x56, 0x78, 0xff, 0xff];
        assert_eq!(
            admit(&policy, &target, &payload),
            Ok(Selector::from(0x12345678_u32))
        );
    }

    #[test]
    fn denies_unknown_selector() {
        let target = Address::derive("delegate");
        let policy = PolicyStore::new();

        let err = admit(&policy, &target, &[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert_eq!(
            err,
            GateError::OperationNotAllowed {
                target,
                selector: Selector::from(0xdeadbeef_u32),
            }
        );
    }

    #[test]
    fn allowed_selector_on_other_target_is_denied() {
        let target = Address::derive("delegate");
        let other = Address::derive("other");
        let mut policy = PolicyStore::new();
        policy.set(target, Selector::from(1_u32), true);

        assert!(!is_allowed(&policy, &other, Selector::from(1_u32)));
    }

    #[test]
    fn short_payload_rejected() {
        let policy = PolicyStore::new();
        let err = admit(&policy, &Address::derive("t"), &[1, 2, 3]).unwrap_err();
        assert_eq!(err, GateError::PayloadTooShort { len: 3 });
    }
}
