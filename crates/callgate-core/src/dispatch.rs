use std::collections::HashMap;
use std::sync::OnceLock;

use callgate_fabric::EventPayload;
use callgate_types::abi::{self, ParamType, Token};
use callgate_types::{AbiError, Address, Amount, Selector};
use tracing::debug;

use crate::error::GateError;
use crate::gate::DelegateGate;

/// Operations the gate handles itself. Their selectors are never forwarded
/// through the fallback path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOp {
    Owner,
    DefaultTarget,
    Balance,
    Allowlist,
    IsAllowed,
    GetAllowlistStatus,
    AddToAllowlist,
    AddBatchToAllowlist,
    RemoveFromAllowlist,
    TransferOwnership,
    WithdrawEther,
    ExecuteDelegatecall,
}

impl GateOp {
    pub const ALL: [GateOp; 12] = [
        GateOp::Owner,
        GateOp::DefaultTarget,
        GateOp::Balance,
        GateOp::Allowlist,
        GateOp::IsAllowed,
        GateOp::GetAllowlistStatus,
        GateOp::AddToAllowlist,
        GateOp::AddBatchToAllowlist,
        GateOp::RemoveFromAllowlist,
        GateOp::TransferOwnership,
        GateOp::WithdrawEther,
        GateOp::ExecuteDelegatecall,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            GateOp::Owner => "owner()",
            GateOp::DefaultTarget => "defaultTarget()",
            GateOp::Balance => "balance()",
            GateOp::Allowlist => "allowlist(address,bytes4)",
            GateOp::IsAllowed => "isAllowed(address,bytes4)",
            GateOp::GetAllowlistStatus => "getAllowlistStatus(address,bytes4[])",
            GateOp::AddToAllowlist => "addToAllowlist(address,bytes4)",
            GateOp::AddBatchToAllowlist => "addBatchToAllowlist(address,bytes4[])",
            GateOp::RemoveFromAllowlist => "removeFromAllowlist(address,bytes4)",
            GateOp::TransferOwnership => "transferOwnership(address)",
            GateOp::WithdrawEther => "withdrawEther(address,uint256)",
            GateOp::ExecuteDelegatecall => "executeDelegatecall(address,bytes)",
        }
    }

    pub fn name(self) -> &'static str {
        let signature = self.signature();
        signature
            .split_once('(')
            .map_or(signature, |(name, _)| name)
    }

    pub fn selector(self) -> Selector {
        Selector::from_signature(self.signature())
    }

    pub fn inputs(self) -> Vec<ParamType> {
        let selectors = || ParamType::Array(Box::new(ParamType::Bytes4));
        match self {
            GateOp::Owner | GateOp::DefaultTarget | GateOp::Balance => vec![],
            GateOp::Allowlist
            | GateOp::IsAllowed
            | GateOp::AddToAllowlist
            | GateOp::RemoveFromAllowlist => vec![ParamType::Address, ParamType::Bytes4],
            GateOp::GetAllowlistStatus | GateOp::AddBatchToAllowlist => {
                vec![ParamType::Address, selectors()]
            }
            GateOp::TransferOwnership => vec![ParamType::Address],
            GateOp::WithdrawEther => vec![ParamType::Address, ParamType::Uint],
            GateOp::ExecuteDelegatecall => vec![ParamType::Address, ParamType::Bytes],
        }
    }

    pub fn outputs(self) -> Vec<ParamType> {
        match self {
            GateOp::Owner | GateOp::DefaultTarget => vec![ParamType::Address],
            GateOp::Balance => vec![ParamType::Uint],
            GateOp::Allowlist | GateOp::IsAllowed => vec![ParamType::Bool],
            GateOp::GetAllowlistStatus => vec![ParamType::Array(Box::new(ParamType::Bool))],
            GateOp::ExecuteDelegatecall => vec![ParamType::Bool, ParamType::Bytes],
            GateOp::AddToAllowlist
            | GateOp::AddBatchToAllowlist
            | GateOp::RemoveFromAllowlist
            | GateOp::TransferOwnership
            | GateOp::WithdrawEther => vec![],
        }
    }

    /// Only `executeDelegatecall` carries value to a delegate.
    pub fn is_payable(self) -> bool {
        matches!(self, GateOp::ExecuteDelegatecall)
    }

    pub fn from_selector(selector: Selector) -> Option<GateOp> {
        static TABLE: OnceLock<HashMap<Selector, GateOp>> = OnceLock::new();
        TABLE
            .get_or_init(|| GateOp::ALL.iter().map(|op| (op.selector(), *op)).collect())
            .get(&selector)
            .copied()
    }

    /// Encode a call to this operation.
    pub fn encode_call(self, args: &[Token]) -> Vec<u8> {
        abi::encode_call(self.selector(), args)
    }

    /// Decode this operation's encoded result.
    pub fn decode_output(self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        abi::decode(&self.outputs(), data)
    }
}

fn next_arg(args: &mut impl Iterator<Item = Token>) -> Result<Token, GateError> {
    args.next().ok_or_else(|| {
        GateError::Abi(AbiError::TypeMismatch {
            expected: "argument".into(),
        })
    })
}

fn selector_list(token: Token) -> Result<Vec<Selector>, GateError> {
    token
        .into_array()?
        .into_iter()
        .map(|t| t.into_bytes4().map_err(GateError::from))
        .collect()
}

impl DelegateGate {
    /// Boundary dispatcher.
    ///
    /// Routes an incoming payload to value receipt, a gate operation or the
    /// fallback forward to the default target.
    pub(crate) fn dispatch(
        &mut self,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<Vec<u8>, GateError> {
        if payload.is_empty() {
            debug!(sender = %caller, amount = value, "Value received");
            self.notify(EventPayload::ValueReceived {
                sender: caller,
                amount: value,
            });
            return Ok(Vec::new());
        }

        let selector = Selector::from_payload(payload).ok_or(GateError::PayloadTooShort {
            len: payload.len(),
        })?;

        match GateOp::from_selector(selector) {
            Some(op) => {
                debug!(%caller, op = op.name(), "Dispatching gate operation");
                self.handle_op(op, caller, value, &payload[Selector::LEN..])
            }
            None => {
                let target = self.default_target();
                debug!(%caller, %selector, %target, "Falling back to default target");
                self.forward(caller, value, target, payload)
                    .map(|outcome| outcome.return_data)
            }
        }
    }

    fn handle_op(
        &mut self,
        op: GateOp,
        caller: Address,
        value: Amount,
        args: &[u8],
    ) -> Result<Vec<u8>, GateError> {
        if value > 0 && !op.is_payable() {
            return Err(GateError::ValueNotAccepted {
                operation: op.name().to_string(),
            });
        }

        let mut args = abi::decode(&op.inputs(), args)?.into_iter();

        let output = match op {
            GateOp::Owner => abi::encode(&[Token::Address(self.owner())]),
            GateOp::DefaultTarget => abi::encode(&[Token::Address(self.default_target())]),
            GateOp::Balance => abi::encode(&[Token::Uint(self.balance())]),
            GateOp::Allowlist => {
                let target = next_arg(&mut args)?.into_address()?;
                let selector = next_arg(&mut args)?.into_bytes4()?;
                abi::encode(&[Token::Bool(self.allowlist(&target, selector))])
            }
            GateOp::IsAllowed => {
                let target = next_arg(&mut args)?.into_address()?;
                let selector = next_arg(&mut args)?.into_bytes4()?;
                abi::encode(&[Token::Bool(self.is_allowed(&target, selector))])
            }
            GateOp::GetAllowlistStatus => {
                let target = next_arg(&mut args)?.into_address()?;
                let selectors = selector_list(next_arg(&mut args)?)?;
                let statuses = self
                    .get_allowlist_status(&target, &selectors)
                    .into_iter()
                    .map(Token::Bool)
                    .collect();
                abi::encode(&[Token::Array(statuses)])
            }
            GateOp::AddToAllowlist => {
                let target = next_arg(&mut args)?.into_address()?;
                let selector = next_arg(&mut args)?.into_bytes4()?;
                self.admin_add(caller, target, selector)?;
                Vec::new()
            }
            GateOp::AddBatchToAllowlist => {
                let target = next_arg(&mut args)?.into_address()?;
                let selectors = selector_list(next_arg(&mut args)?)?;
                self.admin_add_batch(caller, target, &selectors)?;
                Vec::new()
            }
            GateOp::RemoveFromAllowlist => {
                let target = next_arg(&mut args)?.into_address()?;
                let selector = next_arg(&mut args)?.into_bytes4()?;
                self.admin_remove(caller, target, selector)?;
                Vec::new()
            }
            GateOp::TransferOwnership => {
                let new_owner = next_arg(&mut args)?.into_address()?;
                self.admin_transfer_ownership(caller, new_owner)?;
                Vec::new()
            }
            GateOp::WithdrawEther => {
                let to = next_arg(&mut args)?.into_address()?;
                let amount = next_arg(&mut args)?.into_uint()?;
                self.admin_withdraw(caller, to, amount)?;
                Vec::new()
            }
            GateOp::ExecuteDelegatecall => {
                let target = next_arg(&mut args)?.into_address()?;
                let data = next_arg(&mut args)?.into_bytes()?;
                let outcome = self.forward(caller, value, target, &data)?;
                abi::encode(&[
                    Token::Bool(outcome.success),
                    Token::Bytes(outcome.return_data),
                ])
            }
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn selectors_are_distinct_and_resolvable() {
        let selectors: HashSet<Selector> = GateOp::ALL.iter().map(|op| op.selector()).collect();
        assert_eq!(selectors.len(), GateOp::ALL.len());

        for op in GateOp::ALL {
            assert_eq!(GateOp::from_selector(op.selector()), Some(op));
        }
        assert_eq!(GateOp::from_selector(Selector::from(0x12345678_u32)), None);
    }

    #[test]
    fn names_strip_arguments() {
        assert_eq!(GateOp::ExecuteDelegatecall.name(), "executeDelegatecall");
        assert_eq!(GateOp::Owner.name(), "owner");
    }

    #[test]
    fn only_execute_is_payable() {
        let payable: Vec<GateOp> = GateOp::ALL.into_iter().filter(|op| op.is_payable()).collect();
        assert_eq!(payable, vec![GateOp::ExecuteDelegatecall]);
    }

    #[test]
    fn encode_call_prefixes_selector() {
        let payload = GateOp::TransferOwnership.encode_call(&[Token::Address(Address::derive("c"))]);
        assert_eq!(
            Selector::from_payload(&payload),
            Some(GateOp::TransferOwnership.selector())
        );
        assert_eq!(payload.len(), Selector::LEN + abi::WORD);
    }
}
