use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use callgate_types::abi::{self, ParamType, Token};
use callgate_types::{Address, Selector};

use crate::context::ExecutionContext;
use crate::error::GateError;

const ERROR_STRING: &str = "Error(string)";

/// Failure of delegate logic, carrying the raw failure bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Revert(pub Vec<u8>);

impl Revert {
    /// Failure with no data.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Failure carrying a human-readable reason, encoded as `Error(string)`.
    pub fn with_reason(reason: &str) -> Self {
        Self(abi::encode_call(
            Selector::from_signature(ERROR_STRING),
            &[Token::String(reason.to_string())],
        ))
    }

    /// The reason, if the data is an `Error(string)` encoding.
    pub fn reason(&self) -> Option<String> {
        if Selector::from_payload(&self.0)? != Selector::from_signature(ERROR_STRING) {
            return None;
        }
        abi::decode(&[ParamType::String], &self.0[Selector::LEN..])
            .ok()?
            .into_iter()
            .next()?
            .into_string()
            .ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<GateError> for Revert {
    fn from(err: GateError) -> Self {
        Self(err.revert_data())
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "revert: {reason}"),
            None => write!(f, "revert: 0x{}", hex::encode(&self.0[..self.0.len().min(8)])),
        }
    }
}

/// Logic executed in the gate's context.
///
/// A delegate reads and writes the gate's state through `ctx` and observes
/// the original caller and attached value. Returning `Err` fails the
/// forwarded call and reverts everything the delegate did.
pub trait Delegate: Send + Sync {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, payload: &[u8]) -> Result<Vec<u8>, Revert>;
}

/// Addressable units of logic the gate can forward to.
#[derive(Clone, Default)]
pub struct CodeRegistry {
    code: HashMap<Address, Arc<dyn Delegate>>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register logic at `address`, replacing whatever was there.
    pub fn register(&mut self, address: Address, delegate: Arc<dyn Delegate>) {
        self.code.insert(address, delegate);
    }

    pub fn resolve(&self, address: &Address) -> Option<Arc<dyn Delegate>> {
        self.code.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.code.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.code.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FnDelegate;

    #[test]
    fn reason_roundtrip() {
        let revert = Revert::with_reason("counter overflow");
        assert_eq!(revert.reason().as_deref(), Some("counter overflow"));
        assert_eq!(revert.to_string(), "revert: counter overflow");
    }

    #[test]
    fn raw_bytes_have_no_reason() {
        let revert = Revert(vec![0xde, 0xad]);
        assert_eq!(revert.reason(), None);
        assert_eq!(revert.to_string(), "revert: 0xdead");
    }

    #[test]
    fn gate_error_converts_to_canonical_bytes() {
        let revert = Revert::from(GateError::Unauthorized);
        assert_eq!(
            GateError::from_revert_data(revert.as_bytes()),
            Some(GateError::Unauthorized)
        );
    }

    #[test]
    fn registry_resolves_registered_code() {
        let mut registry = CodeRegistry::new();
        let address = Address::derive("logic");
        registry.register(address, Arc::new(FnDelegate::new(|_, _| Ok(vec![]))));

        assert!(registry.contains(&address));
        assert!(registry.resolve(&address).is_some());
        assert!(registry.resolve(&Address::derive("missing")).is_none());
        assert_eq!(registry.len(), 1);
    }
}
