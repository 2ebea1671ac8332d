//! Property tests for the gate's access-control guarantees.

use callgate_core::*;
use callgate_types::{Address, Selector};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn owner() -> Address {
    Address::derive("owner")
}

fn logic() -> Address {
    Address::derive("logic")
}

fn new_gate() -> DelegateGate {
    DelegateGate::builder(GateConfig::new(Address::derive("gate"), owner(), logic()))
        .delegate(logic(), CounterDelegate)
        .build()
        .unwrap()
}

fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::new)
}

fn arb_selector() -> impl Strategy<Value = Selector> {
    any::<[u8; 4]>().prop_map(Selector::new)
}

fn arb_pairs(max: usize) -> impl Strategy<Value = Vec<(Address, Selector)>> {
    prop::collection::vec(
        (
            prop_oneof![Just(logic()), arb_address().prop_filter("non-null", |a| !a.is_zero())],
            arb_selector(),
        ),
        0..max,
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Only pairs that were added are allowed.
    #[test]
    fn default_deny(added in arb_pairs(16), probe_target in arb_address(), probe in arb_selector()) {
        let mut gate = new_gate();
        for (target, selector) in &added {
            gate.add_to_allowlist(owner(), *target, *selector).unwrap();
        }

        let expected = added.contains(&(probe_target, probe));
        prop_assert_eq!(gate.is_allowed(&probe_target, probe), expected);
    }

    /// A denied forward changes nothing and reports nothing.
    #[test]
    fn denied_forward_is_isolated(
        added in arb_pairs(8),
        selector in arb_selector(),
        tail in prop::collection::vec(any::<u8>(), 0..64),
        value in 0u128..1_000_000,
    ) {
        let mut gate = new_gate();
        for (target, s) in &added {
            gate.add_to_allowlist(owner(), *target, *s).unwrap();
        }
        prop_assume!(!gate.is_allowed(&logic(), selector));
        prop_assume!(GateOp::from_selector(selector).is_none());

        let before = gate.state().clone();
        let published = gate.fabric().len();

        let mut payload = selector.as_bytes().to_vec();
        payload.extend_from_slice(&tail);
        let result = gate.call(Address::derive("caller"), value, &payload);

        prop_assert_eq!(
            result,
            Err(GateError::OperationNotAllowed { target: logic(), selector })
        );
        prop_assert_eq!(gate.state(), &before);
        prop_assert_eq!(gate.fabric().len(), published);
    }

    /// A batch naming the null target mutates nothing, whatever it contains.
    #[test]
    fn batch_with_null_target_is_rejected_whole(
        selectors in prop::collection::vec(arb_selector(), 0..16),
    ) {
        let mut gate = new_gate();
        let before = gate.state().clone();

        prop_assert_eq!(
            gate.add_batch_to_allowlist(owner(), Address::ZERO, &selectors),
            Err(GateError::InvalidTarget)
        );
        prop_assert_eq!(gate.state(), &before);
    }

    /// Nobody but the owner can administer, and failed attempts change nothing.
    #[test]
    fn owner_exclusivity(
        caller in arb_address(),
        target in arb_address(),
        selector in arb_selector(),
    ) {
        prop_assume!(caller != owner());
        let mut gate = new_gate();
        let before = gate.state().clone();

        prop_assert_eq!(
            gate.add_to_allowlist(caller, target, selector),
            Err(GateError::Unauthorized)
        );
        prop_assert_eq!(
            gate.add_batch_to_allowlist(caller, target, &[selector]),
            Err(GateError::Unauthorized)
        );
        prop_assert_eq!(
            gate.remove_from_allowlist(caller, target, selector),
            Err(GateError::Unauthorized)
        );
        prop_assert_eq!(
            gate.transfer_ownership(caller, caller),
            Err(GateError::Unauthorized)
        );
        prop_assert_eq!(
            gate.withdraw_ether(caller, caller, 0),
            Err(GateError::Unauthorized)
        );
        prop_assert_eq!(gate.state(), &before);
    }

    /// Batch status answers one result per selector, in order.
    #[test]
    fn status_matches_single_lookups(
        added in prop::collection::vec(arb_selector(), 0..8),
        probes in prop::collection::vec(arb_selector(), 0..16),
    ) {
        let mut gate = new_gate();
        gate.add_batch_to_allowlist(owner(), logic(), &added).unwrap();

        let statuses = gate.get_allowlist_status(&logic(), &probes);
        prop_assert_eq!(statuses.len(), probes.len());
        for (status, probe) in statuses.iter().zip(&probes) {
            prop_assert_eq!(*status, gate.is_allowed(&logic(), *probe));
        }
    }
}
