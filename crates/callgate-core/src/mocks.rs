use callgate_types::abi::{self, ParamType, Token};
use callgate_types::{Selector, Slot, Word};

use crate::context::ExecutionContext;
use crate::delegate::{Delegate, Revert};

/// Delegate backed by a closure.
pub struct FnDelegate<F> {
    f: F,
}

impl<F> FnDelegate<F> {
    pub fn new(f: F) -> Self
    where
        F: Fn(&mut ExecutionContext<'_>, &[u8]) -> Result<Vec<u8>, Revert> + Send + Sync,
    {
        Self { f }
    }
}

impl<F> Delegate for FnDelegate<F>
where
    F: Fn(&mut ExecutionContext<'_>, &[u8]) -> Result<Vec<u8>, Revert> + Send + Sync,
{
    fn execute(&self, ctx: &mut ExecutionContext<'_>, payload: &[u8]) -> Result<Vec<u8>, Revert> {
        (self.f)(ctx, payload)
    }
}

/// Counter logic for exercising the gate.
///
/// Keeps a counter in the gate's general storage and exposes hooks for
/// context inspection, failure, re-entrancy, value transfer and logging.
#[derive(Clone, Copy, Debug, Default)]
pub struct CounterDelegate;

impl CounterDelegate {
    /// `increment()` → new counter value
    pub const INCREMENT: &'static str = "increment()";
    /// `counter()` → current counter value
    pub const COUNTER: &'static str = "counter()";
    /// `incrementThenFail()` → increments, then fails with a reason
    pub const INCREMENT_THEN_FAIL: &'static str = "incrementThenFail()";
    /// `whoami()` → (caller, value, gate)
    pub const WHOAMI: &'static str = "whoami()";
    /// `callGate(bytes)` → result of the re-entrant call; failures bubble up
    pub const CALL_GATE: &'static str = "callGate(bytes)";
    /// `tryCallGate(bytes)` → (success, data); failures are swallowed
    pub const TRY_CALL_GATE: &'static str = "tryCallGate(bytes)";
    /// `pay(address,uint256)` → sends value out of the gate
    pub const PAY: &'static str = "pay(address,uint256)";
    /// `log(bytes)` → emits a delegate log
    pub const LOG: &'static str = "log(bytes)";

    pub const FAILURE_REASON: &'static str = "forced failure";

    /// Every operation the counter understands.
    pub const SIGNATURES: [&'static str; 8] = [
        Self::INCREMENT,
        Self::COUNTER,
        Self::INCREMENT_THEN_FAIL,
        Self::WHOAMI,
        Self::CALL_GATE,
        Self::TRY_CALL_GATE,
        Self::PAY,
        Self::LOG,
    ];

    pub fn counter_slot() -> Slot {
        Slot::named("counter")
    }

    pub fn selector(signature: &str) -> Selector {
        Selector::from_signature(signature)
    }

    /// Encode a call to one of the counter's operations.
    pub fn call(signature: &str, args: &[Token]) -> Vec<u8> {
        abi::encode_call(Selector::from_signature(signature), args)
    }

    fn bump(ctx: &mut ExecutionContext<'_>) -> Result<u128, Revert> {
        let slot = Self::counter_slot();
        let next = ctx
            .load(&slot)
            .to_u128()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| Revert::with_reason("counter overflow"))?;
        ctx.store(slot, Word::from_u128(next));
        Ok(next)
    }

    fn single_arg(ty: ParamType, args: &[u8]) -> Result<Token, Revert> {
        abi::decode(&[ty], args)
            .ok()
            .and_then(|tokens| tokens.into_iter().next())
            .ok_or_else(|| Revert::with_reason("bad arguments"))
    }
}

impl Delegate for CounterDelegate {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, payload: &[u8]) -> Result<Vec<u8>, Revert> {
        let selector = Selector::from_payload(payload).ok_or_else(Revert::empty)?;
        let args = &payload[Selector::LEN..];
        let is = |signature: &str| selector == Self::selector(signature);

        if is(Self::INCREMENT) {
            let next = Self::bump(ctx)?;
            Ok(abi::encode(&[Token::Uint(next)]))
        } else if is(Self::COUNTER) {
            let current = ctx.load(&Self::counter_slot()).to_u128().unwrap_or_default();
            Ok(abi::encode(&[Token::Uint(current)]))
        } else if is(Self::INCREMENT_THEN_FAIL) {
            Self::bump(ctx)?;
            Err(Revert::with_reason(Self::FAILURE_REASON))
        } else if is(Self::WHOAMI) {
            Ok(abi::encode(&[
                Token::Address(ctx.caller()),
                Token::Uint(ctx.value()),
                Token::Address(ctx.this()),
            ]))
        } else if is(Self::CALL_GATE) {
            let inner = Self::single_arg(ParamType::Bytes, args)?
                .into_bytes()
                .map_err(|_| Revert::with_reason("bad arguments"))?;
            let result = ctx.call_gate(0, &inner)?;
            Ok(abi::encode(&[Token::Bytes(result)]))
        } else if is(Self::TRY_CALL_GATE) {
            let inner = Self::single_arg(ParamType::Bytes, args)?
                .into_bytes()
                .map_err(|_| Revert::with_reason("bad arguments"))?;
            let (success, data) = match ctx.call_gate(0, &inner) {
                Ok(data) => (true, data),
                Err(err) => (false, err.revert_data()),
            };
            Ok(abi::encode(&[Token::Bool(success), Token::Bytes(data)]))
        } else if is(Self::PAY) {
            let mut tokens = abi::decode(&[ParamType::Address, ParamType::Uint], args)
                .map_err(|_| Revert::with_reason("bad arguments"))?
                .into_iter();
            let to = tokens
                .next()
                .and_then(|t| t.into_address().ok())
                .ok_or_else(|| Revert::with_reason("bad arguments"))?;
            let amount = tokens
                .next()
                .and_then(|t| t.into_uint().ok())
                .ok_or_else(|| Revert::with_reason("bad arguments"))?;
            ctx.transfer(to, amount)?;
            Ok(Vec::new())
        } else if is(Self::LOG) {
            let data = Self::single_arg(ParamType::Bytes, args)?
                .into_bytes()
                .map_err(|_| Revert::with_reason("bad arguments"))?;
            ctx.emit(data);
            Ok(Vec::new())
        } else {
            Err(Revert::with_reason("unknown operation"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_have_distinct_selectors() {
        let mut selectors: Vec<Selector> = CounterDelegate::SIGNATURES
            .iter()
            .map(|s| CounterDelegate::selector(s))
            .collect();
        selectors.sort();
        selectors.dedup();
        assert_eq!(selectors.len(), CounterDelegate::SIGNATURES.len());
    }

    #[test]
    fn call_encodes_selector_prefix() {
        let payload = CounterDelegate::call(CounterDelegate::INCREMENT, &[]);
        assert_eq!(payload, CounterDelegate::selector(CounterDelegate::INCREMENT).as_bytes().to_vec());
    }
}
