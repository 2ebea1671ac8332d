use callgate_types::abi::{self, ParamType, Token};
use callgate_types::{AbiError, Address, Amount, Selector};
use thiserror::Error;

/// Errors from the delegate gate.
///
/// Every error is fatal to the current invocation and leaves the gate's
/// state as it was before the invocation. [`GateError::revert_data`] gives
/// the canonical byte encoding used when an error crosses a delegate
/// boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("caller is not the owner")]
    Unauthorized,

    #[error("operation {selector} is not allowed on target {target}")]
    OperationNotAllowed { target: Address, selector: Selector },

    #[error("invalid target: null identifier")]
    InvalidTarget,

    #[error("forwarded call failed with {} bytes of return data", .0.len())]
    ForwardedCallFailed(Vec<u8>),

    #[error("payload of {len} bytes is too short to carry a selector")]
    PayloadTooShort { len: usize },

    #[error("operation {operation} does not accept value")]
    ValueNotAccepted { operation: String },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("gate balance overflow")]
    BalanceOverflow,

    #[error("malformed arguments: {0}")]
    Abi(#[from] AbiError),
}

const UNAUTHORIZED: &str = "Unauthorized()";
const OPERATION_NOT_ALLOWED: &str = "OperationNotAllowed(address,bytes4)";
const INVALID_TARGET: &str = "InvalidTarget()";
const FORWARDED_CALL_FAILED: &str = "ForwardedCallFailed(bytes)";
const PAYLOAD_TOO_SHORT: &str = "PayloadTooShort(uint256)";
const VALUE_NOT_ACCEPTED: &str = "ValueNotAccepted(string)";
const INSUFFICIENT_BALANCE: &str = "InsufficientBalance(uint256,uint256)";
const CALL_DEPTH_EXCEEDED: &str = "CallDepthExceeded(uint256)";
const BALANCE_OVERFLOW: &str = "BalanceOverflow()";
const MALFORMED_ARGUMENTS: &str = "MalformedArguments(string)";

impl GateError {
    /// Canonical signature of the error's byte encoding.
    pub fn signature(&self) -> &'static str {
        match self {
            GateError::Unauthorized => UNAUTHORIZED,
            GateError::OperationNotAllowed { .. } => OPERATION_NOT_ALLOWED,
            GateError::InvalidTarget => INVALID_TARGET,
            GateError::ForwardedCallFailed(_) => FORWARDED_CALL_FAILED,
            GateError::PayloadTooShort { .. } => PAYLOAD_TOO_SHORT,
            GateError::ValueNotAccepted { .. } => VALUE_NOT_ACCEPTED,
            GateError::InsufficientBalance { .. } => INSUFFICIENT_BALANCE,
            GateError::CallDepthExceeded { .. } => CALL_DEPTH_EXCEEDED,
            GateError::BalanceOverflow => BALANCE_OVERFLOW,
            GateError::Abi(_) => MALFORMED_ARGUMENTS,
        }
    }

    /// Error selector followed by the encoded error arguments.
    pub fn revert_data(&self) -> Vec<u8> {
        let args = match self {
            GateError::Unauthorized | GateError::InvalidTarget | GateError::BalanceOverflow => {
                vec![]
            }
            GateError::OperationNotAllowed { target, selector } => {
                vec![Token::Address(*target), Token::Bytes4(*selector)]
            }
            GateError::ForwardedCallFailed(data) => vec![Token::Bytes(data.clone())],
            GateError::PayloadTooShort { len } => vec![Token::Uint(*len as u128)],
            GateError::ValueNotAccepted { operation } => vec![Token::String(operation.clone())],
            GateError::InsufficientBalance {
                requested,
                available,
            } => vec![Token::Uint(*requested), Token::Uint(*available)],
            GateError::CallDepthExceeded { limit } => vec![Token::Uint(*limit as u128)],
            GateError::Abi(e) => vec![Token::String(e.to_string())],
        };
        abi::encode_call(Selector::from_signature(self.signature()), &args)
    }

    /// Recover a gate error from its byte encoding.
    ///
    /// Returns `None` for data that is not a gate error (for example a
    /// delegate's own failure payload).
    pub fn from_revert_data(data: &[u8]) -> Option<GateError> {
        let selector = Selector::from_payload(data)?;
        let args = &data[Selector::LEN..];
        let is = |signature: &str| selector == Selector::from_signature(signature);

        let decode = |types: &[ParamType]| abi::decode(types, args).ok();

        if is(UNAUTHORIZED) {
            Some(GateError::Unauthorized)
        } else if is(INVALID_TARGET) {
            Some(GateError::InvalidTarget)
        } else if is(BALANCE_OVERFLOW) {
            Some(GateError::BalanceOverflow)
        } else if is(OPERATION_NOT_ALLOWED) {
            let mut tokens = decode(&[ParamType::Address, ParamType::Bytes4])?.into_iter();
            Some(GateError::OperationNotAllowed {
                target: tokens.next()?.into_address().ok()?,
                selector: tokens.next()?.into_bytes4().ok()?,
            })
        } else if is(FORWARDED_CALL_FAILED) {
            let mut tokens = decode(&[ParamType::Bytes])?.into_iter();
            Some(GateError::ForwardedCallFailed(
                tokens.next()?.into_bytes().ok()?,
            ))
        } else if is(PAYLOAD_TOO_SHORT) {
            let mut tokens = decode(&[ParamType::Uint])?.into_iter();
            let len = usize::try_from(tokens.next()?.into_uint().ok()?).ok()?;
            Some(GateError::PayloadTooShort { len })
        } else if is(VALUE_NOT_ACCEPTED) {
            let mut tokens = decode(&[ParamType::String])?.into_iter();
            Some(GateError::ValueNotAccepted {
                operation: tokens.next()?.into_string().ok()?,
            })
        } else if is(INSUFFICIENT_BALANCE) {
            let mut tokens = decode(&[ParamType::Uint, ParamType::Uint])?.into_iter();
            Some(GateError::InsufficientBalance {
                requested: tokens.next()?.into_uint().ok()?,
                available: tokens.next()?.into_uint().ok()?,
            })
        } else if is(CALL_DEPTH_EXCEEDED) {
            let mut tokens = decode(&[ParamType::Uint])?.into_iter();
            let limit = usize::try_from(tokens.next()?.into_uint().ok()?).ok()?;
            Some(GateError::CallDepthExceeded { limit })
        } else {
            // MalformedArguments carries only a rendered message; the
            // structured codec error is not recoverable.
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_not_allowed_roundtrips_through_bytes() {
        let err = GateError::OperationNotAllowed {
            target: Address::derive("delegate"),
            selector: Selector::from(0xdeadbeef_u32),
        };
        let data = err.revert_data();
        assert_eq!(
            Selector::from_payload(&data),
            Some(Selector::from_signature(OPERATION_NOT_ALLOWED))
        );
        assert_eq!(GateError::from_revert_data(&data), Some(err));
    }

    #[test]
    fn forwarded_failure_preserves_nested_payload() {
        let inner = GateError::Unauthorized.revert_data();
        let outer = GateError::ForwardedCallFailed(inner.clone());

        let recovered = GateError::from_revert_data(&outer.revert_data()).unwrap();
        match recovered {
            GateError::ForwardedCallFailed(data) => {
                assert_eq!(data, inner);
                assert_eq!(
                    GateError::from_revert_data(&data),
                    Some(GateError::Unauthorized)
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn foreign_payload_is_not_a_gate_error() {
        assert_eq!(GateError::from_revert_data(&[1, 2, 3, 4, 5]), None);
        assert_eq!(GateError::from_revert_data(&[]), None);
    }

    #[test]
    fn display_mentions_identifiers() {
        let err = GateError::OperationNotAllowed {
            target: Address::new([0x11; 20]),
            selector: Selector::from(0x12345678_u32),
        };
        let s = err.to_string();
        assert!(s.contains("0x12345678"));
        assert!(s.contains("0x1111"));
    }
}
