//! Contract events.

use std::fmt;

use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

use crate::argument::{Argument, Arguments};
use crate::error::Result;
use crate::value::Value;

/// An event declared in a contract ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Binding name; overloaded events get a numeric suffix.
    pub name: String,
    /// Name as declared in the ABI.
    pub raw_name: String,
    pub anonymous: bool,
    pub inputs: Arguments,
    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub sig: String,
    /// Keccak-256 of [`Event::sig`]; the first log topic of non-anonymous events.
    pub id: B256,
    str: String,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        raw_name: impl Into<String>,
        anonymous: bool,
        inputs: Vec<Argument>,
    ) -> Self {
        let raw_name = raw_name.into();
        let signature = Signature::build(&raw_name, inputs);
        Self {
            name: name.into(),
            str: format!("event {raw_name}({})", signature.described),
            raw_name,
            anonymous,
            inputs: signature.inputs,
            id: keccak256(&signature.sig),
            sig: signature.sig,
        }
    }

    /// Unpacks the non-indexed fields from a log's data section.
    pub fn unpack_data(&self, data: &[u8]) -> Result<Vec<Value>> {
        self.inputs.unpack(data)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str)
    }
}

/// Named inputs plus their two textual forms.
pub(crate) struct Signature {
    pub inputs: Arguments,
    /// `Name(type1,type2)`.
    pub sig: String,
    /// `type1 name1, type2 indexed name2`.
    pub described: String,
}

impl Signature {
    /// Unnamed inputs are called `arg{i}` after their position.
    pub fn build(name: &str, inputs: Vec<Argument>) -> Self {
        let mut described = Vec::with_capacity(inputs.len());
        let mut types = Vec::with_capacity(inputs.len());

        let inputs: Arguments = inputs
            .into_iter()
            .enumerate()
            .map(|(i, mut input)| {
                if input.name.is_empty() {
                    input.name = format!("arg{i}");
                }
                described.push(if input.indexed {
                    format!("{} indexed {}", input.ty, input.name)
                } else {
                    format!("{} {}", input.ty, input.name)
                });
                types.push(input.ty.canonical().to_string());
                input
            })
            .collect();

        Self {
            inputs,
            sig: format!("{name}({})", types.join(",")),
            described: described.join(", "),
        }
    }
}

pub(crate) fn keccak256(input: &str) -> B256 {
    B256::from_slice(&Keccak256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use alloy_primitives::U256;

    fn transfer() -> Event {
        Event::new(
            "Transfer",
            "Transfer",
            false,
            vec![
                Argument::new("from", Type::new("address").unwrap(), true),
                Argument::new("to", Type::new("address").unwrap(), true),
                Argument::new("value", Type::new("uint256").unwrap(), false),
            ],
        )
    }

    #[test]
    fn transfer_signature_and_id() {
        let event = transfer();
        assert_eq!(event.sig, "Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(event.id),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn transfer_display() {
        assert_eq!(
            transfer().to_string(),
            "event Transfer(address indexed from, address indexed to, uint256 value)"
        );
    }

    #[test]
    fn unnamed_inputs_get_positional_names() {
        let event = Event::new(
            "Ping",
            "Ping",
            true,
            vec![
                Argument::new("", Type::new("uint8").unwrap(), false),
                Argument::new("who", Type::new("address").unwrap(), false),
                Argument::new("", Type::new("bytes").unwrap(), false),
            ],
        );
        let names: Vec<&str> = event.inputs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["arg0", "who", "arg2"]);
        assert_eq!(event.to_string(), "event Ping(uint8 arg0, address who, bytes arg2)");
    }

    #[test]
    fn overloaded_binding_name_keeps_raw_signature() {
        let event = Event::new("Ping0", "Ping", false, vec![]);
        assert_eq!(event.sig, "Ping()");
        assert_eq!(event.name, "Ping0");
    }

    #[test]
    fn unpack_data_skips_indexed_fields() {
        let data = U256::from(1_000u64).to_be_bytes::<32>();
        let values = transfer().unpack_data(&data).unwrap();
        assert_eq!(values, vec![Value::from(1_000u64)]);
    }
}
