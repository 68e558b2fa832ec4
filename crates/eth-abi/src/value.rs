//! Self-describing value tree that the codec packs from and unpacks into.

use alloy_primitives::{Address, I256, U256};

use crate::error::{AbiError, Result};

/// A single ABI value.
///
/// Fixed arrays and slices both use [`Value::Array`]; the declared
/// [`Type`](crate::Type) decides whether a length prefix is written. Tuple
/// fields are keyed by their raw ABI component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(U256),
    Int(I256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Address(Address),
    /// 20-byte address followed by a 4-byte selector.
    Function([u8; 24]),
    Array(Vec<Value>),
    Tuple(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the variant, used in type mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Uint(_) => "uint",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Address(_) => "address",
            Value::Function(_) => "function",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Looks up a tuple field by its raw ABI name.
    pub fn field(&self, name: &str) -> Result<&Value> {
        match self {
            Value::Tuple(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value)
                .ok_or_else(|| AbiError::FieldNotFound(name.to_string())),
            other => Err(AbiError::TypeMismatch {
                expected: "tuple".into(),
                got: other.kind_name().into(),
            }),
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Contents of `bytes` or `bytesN` values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Value::Uint(v)
    }
}

impl From<I256> for Value {
    fn from(v: I256) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(U256::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(I256::from_raw(U256::from_be_bytes(sign_extend(v))))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Address> for Value {
    fn from(v: Address) -> Self {
        Value::Address(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Big-endian 256-bit two's-complement image of an `i64`.
fn sign_extend(v: i64) -> [u8; 32] {
    let mut word = if v < 0 { [0xff; 32] } else { [0u8; 32] };
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}
