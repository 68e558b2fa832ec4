//! Custom Solidity errors (`error Name(...)`), as found in revert data.

use std::fmt;

use alloy_primitives::B256;

use crate::argument::{Argument, Arguments};
use crate::error::{AbiError, Result};
use crate::event::{keccak256, Signature};
use crate::value::Value;

const SELECTOR_LEN: usize = 4;

/// A custom error declared in a contract ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub name: String,
    pub inputs: Arguments,
    pub sig: String,
    pub id: B256,
    str: String,
}

impl ContractError {
    pub fn new(name: impl Into<String>, inputs: Vec<Argument>) -> Self {
        let name = name.into();
        let signature = Signature::build(&name, inputs);
        Self {
            str: format!("error {name}({})", signature.described),
            name,
            inputs: signature.inputs,
            id: keccak256(&signature.sig),
            sig: signature.sig,
        }
    }

    /// First four bytes of the id; prefixes the revert data.
    pub fn selector(&self) -> [u8; 4] {
        let mut selector = [0u8; SELECTOR_LEN];
        selector.copy_from_slice(&self.id[..SELECTOR_LEN]);
        selector
    }

    /// Decodes revert data, checking its selector first.
    pub fn unpack(&self, data: &[u8]) -> Result<Vec<Value>> {
        if data.len() < SELECTOR_LEN {
            return Err(AbiError::InsufficientLength {
                have: data.len(),
                want: format!("at least {SELECTOR_LEN}"),
            });
        }
        let (selector, body) = data.split_at(SELECTOR_LEN);
        if selector != self.selector() {
            return Err(AbiError::InvalidSelector {
                have: hex::encode(selector),
                want: hex::encode(self.selector()),
            });
        }
        self.inputs.unpack(body)
    }

    /// Encodes revert data: selector followed by the packed inputs.
    pub fn pack(&self, values: &[Value]) -> Result<Vec<u8>> {
        let body = self.inputs.pack(values)?;
        let mut out = Vec::with_capacity(SELECTOR_LEN + body.len());
        out.extend_from_slice(&self.selector());
        out.extend(body);
        Ok(out)
    }
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn revert_reason() -> ContractError {
        ContractError::new(
            "Error",
            vec![Argument::new("", Type::new("string").unwrap(), false)],
        )
    }

    #[test]
    fn revert_reason_selector() {
        let err = revert_reason();
        assert_eq!(err.sig, "Error(string)");
        assert_eq!(err.selector(), [0x08, 0xc3, 0x79, 0xa0]);
        assert_eq!(err.to_string(), "error Error(string arg0)");
    }

    #[test]
    fn pack_then_unpack_reason() {
        let err = revert_reason();
        let data = err.pack(&[Value::from("not owner")]).unwrap();
        assert_eq!(&data[..4], &err.selector());
        assert_eq!(data.len(), 4 + 32 * 3);
        assert_eq!(err.unpack(&data).unwrap(), vec![Value::from("not owner")]);
    }

    #[test]
    fn unpack_short_data_fails() {
        let err = revert_reason().unpack(&[0x08, 0xc3]).unwrap_err();
        assert!(matches!(err, AbiError::InsufficientLength { have: 2, .. }));
    }

    #[test]
    fn unpack_wrong_selector_fails() {
        let err = revert_reason().unpack(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid identifier: have 0xdeadbeef, want 0x08c379a0"
        );
    }

    #[test]
    fn unpack_selector_only_without_inputs() {
        let err = ContractError::new("Unauthorized", vec![]);
        let data = err.pack(&[]).unwrap();
        assert_eq!(data.len(), 4);
        assert!(err.unpack(&data).unwrap().is_empty());
    }
}
