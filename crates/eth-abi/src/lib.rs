//! Ethereum contract ABI codec.
//!
//! This crate provides:
//! - Type signature parsing (`uint256[2][]`, `tuple` with JSON components, ...)
//! - Head/tail encoding of typed values (pack)
//! - Bounds-checked decoding of ABI payloads (unpack)
//! - Argument lists for function parameters and event fields
//! - Event and custom error signatures, ids and selectors

pub mod argument;
pub mod contract_error;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod naming;
pub mod types;
pub mod value;

pub use argument::{Argument, ArgumentMarshaling, Arguments};
pub use contract_error::ContractError;
pub use error::{AbiError, Result};
pub use event::Event;
pub use types::{TupleField, TupleType, Type, TypeKind, WORD_SIZE};
pub use value::Value;
