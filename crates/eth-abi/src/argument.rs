//! Argument lists: the parameters of a function or the fields of an event.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::trace;

use crate::decoder::slot_index;
use crate::encoder::pack_head_tail;
use crate::error::{AbiError, Result};
use crate::types::Type;
use crate::value::Value;

/// A single entry of a JSON ABI `inputs`/`outputs`/`components` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentMarshaling {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub components: Vec<ArgumentMarshaling>,
    #[serde(default)]
    pub indexed: bool,
}

impl ArgumentMarshaling {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            ..Self::default()
        }
    }

    /// Sets the tuple components.
    pub fn with_components(mut self, components: Vec<ArgumentMarshaling>) -> Self {
        self.components = components;
        self
    }

    pub fn with_internal_type(mut self, internal_type: impl Into<String>) -> Self {
        self.internal_type = Some(internal_type.into());
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// A named, typed argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ArgumentMarshaling")]
pub struct Argument {
    pub name: String,
    pub ty: Type,
    /// Event fields only; indexed arguments live in log topics, not in data.
    pub indexed: bool,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: Type, indexed: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed,
        }
    }
}

impl TryFrom<ArgumentMarshaling> for Argument {
    type Error = AbiError;

    fn try_from(raw: ArgumentMarshaling) -> Result<Self> {
        let ty = Type::parse(
            &raw.ty,
            raw.internal_type.as_deref().unwrap_or(""),
            &raw.components,
        )?;
        Ok(Self {
            name: raw.name,
            ty,
            indexed: raw.indexed,
        })
    }
}

/// An ordered argument list. Order defines both the head layout and the
/// position of each value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Arguments(pub Vec<Argument>);

impl Arguments {
    pub fn new(args: Vec<Argument>) -> Self {
        Self(args)
    }

    /// Parses a JSON array of argument descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }

    /// Arguments that are part of the ABI payload.
    pub fn non_indexed(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter().filter(|arg| !arg.indexed)
    }

    /// Packs one value per argument.
    pub fn pack(&self, values: &[Value]) -> Result<Vec<u8>> {
        if values.len() != self.0.len() {
            return Err(AbiError::ArityMismatch {
                expected: self.0.len(),
                got: values.len(),
            });
        }
        trace!(arguments = self.0.len(), "packing arguments");
        pack_head_tail(self.0.iter().map(|arg| &arg.ty).zip(values).collect())
    }

    /// Unpacks the non-indexed arguments from `data`.
    ///
    /// Empty input is accepted only when there is nothing to decode.
    pub fn unpack(&self, data: &[u8]) -> Result<Vec<Value>> {
        if data.is_empty() {
            if self.non_indexed().next().is_some() {
                return Err(AbiError::EmptyInputExpectedArguments);
            }
            return Ok(Vec::new());
        }
        self.unpack_values(data)
    }

    /// Unpacks the non-indexed arguments without the empty-input shortcut.
    pub fn unpack_values(&self, data: &[u8]) -> Result<Vec<Value>> {
        trace!(arguments = self.0.len(), len = data.len(), "unpacking arguments");

        let mut slot = 0usize;
        let mut values = Vec::new();
        for arg in self.non_indexed() {
            values.push(arg.ty.unpack(slot_index(slot)?, data)?);
            // Static arrays and tuples are inlined and take several slots.
            slot = slot.saturating_add(arg.ty.head_slots());
        }
        Ok(values)
    }

    /// Unpacks into `out`, keyed by argument name.
    pub fn unpack_into_map(&self, out: &mut HashMap<String, Value>, data: &[u8]) -> Result<()> {
        let values = self.unpack(data)?;
        for (arg, value) in self.non_indexed().zip(values) {
            out.insert(arg.name.clone(), value);
        }
        Ok(())
    }

    /// Pairs decoded values with the non-indexed argument names, so fields can
    /// be read back with [`Value::field`].
    pub fn bind(&self, values: Vec<Value>) -> Result<Value> {
        let expected = self.non_indexed().count();
        if values.len() != expected {
            return Err(AbiError::ArityMismatch {
                expected,
                got: values.len(),
            });
        }
        let fields = self
            .non_indexed()
            .map(|arg| arg.name.clone())
            .zip(values)
            .collect();
        Ok(Value::Tuple(fields))
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
