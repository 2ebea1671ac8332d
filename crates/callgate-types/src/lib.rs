//! Core type definitions for the callgate delegate gate.
//!
//! This crate holds the shared vocabulary of the gate: identifiers, operation
//! selectors, storage words, call outcomes and the head/tail wire codec used
//! for gate-operation arguments. No gate logic lives here.

pub mod abi;
pub mod address;
pub mod error;
pub mod outcome;
pub mod selector;
pub mod storage;

pub use abi::{ParamType, Token};
pub use address::Address;
pub use error::{AbiError, ParseError};
pub use outcome::CallOutcome;
pub use selector::Selector;
pub use storage::{Slot, Word};

/// Native value amount carried by a call.
///
/// The wire codec carries amounts as `uint256`; values above `u128::MAX` are
/// rejected when decoded.
pub type Amount = u128;
