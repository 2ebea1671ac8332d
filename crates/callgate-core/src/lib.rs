//! Delegate gate: operation-level access control for context-preserving
//! call forwarding.
//!
//! The gate forwards a call to delegate logic only if the (target, selector)
//! pair is on its allowlist. Admitted logic runs against the gate's own state
//! region with the original caller and attached value, so every check
//! happens before forwarding and every failure reverts the whole invocation.
//!
//! ## Guarantees
//!
//! - **Default deny**: a pair that was never allowlisted is never forwarded.
//! - **Single owner**: only the owner mutates the allowlist or ownership, and
//!   delegate logic has no write path to either.
//! - **All-or-nothing**: a failed invocation leaves no state change, moves no
//!   value and publishes no notification except forwarded-call outcomes.
//! - **No bypass**: re-entrant calls from delegate logic go through the same
//!   dispatcher and admission check as external calls.
//!
//! ## Components
//!
//! 1. **Policy Store** ([`PolicyStore`]): keyed allow/deny map
//! 2. **Admission Check** ([`admission`]): pure allow/deny decision
//! 3. **Call-Forwarding Engine**: runs admitted logic in an [`ExecutionContext`]
//! 4. **Administration Surface**: owner-only mutations
//! 5. **Boundary Dispatcher** ([`GateOp`]): routes raw payloads

pub mod admission;
pub mod context;
pub mod delegate;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod mocks;
pub mod policy;
pub mod state;
pub mod value;

mod admin;
mod forward;

pub use context::ExecutionContext;
pub use delegate::{CodeRegistry, Delegate, Revert};
pub use dispatch::GateOp;
pub use error::GateError;
pub use gate::{DelegateGate, GateBuilder, GateConfig, DEFAULT_MAX_CALL_DEPTH};
pub use mocks::{CounterDelegate, FnDelegate};
pub use policy::PolicyStore;
pub use state::{GateState, ReservedRegion, StorageRegion, STATE_LAYOUT_VERSION};
pub use value::{Transfer, ValueLedger, ValueTransfer};
