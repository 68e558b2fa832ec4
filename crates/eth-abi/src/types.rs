//! The ABI type model and its signature parser.
//!
//! A [`Type`] is built once from a textual signature such as
//! `"(uint256,string)[3]"` (plus JSON component descriptors for tuples) and is
//! immutable afterwards. Both the encoder and the decoder walk the same tree
//! and share [`Type::head_size`] for their offset bookkeeping.

use std::collections::HashSet;
use std::fmt;

use tracing::trace;

use crate::argument::ArgumentMarshaling;
use crate::error::{AbiError, Result};
use crate::naming::{is_valid_field_name, resolve_name_conflict, to_camel_case};

/// Size in bytes of one ABI word.
pub const WORD_SIZE: usize = 32;

const STRUCT_PREFIX: &str = "struct ";
const CONTRACT_PREFIX: &str = "contract ";

/// Deepest nesting of array groups and tuples accepted by the parser.
pub const MAX_TYPE_DEPTH: usize = 64;

/// The shape of an ABI type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Signed integer with the given bit width.
    Int(usize),
    /// Unsigned integer with the given bit width.
    Uint(usize),
    Bool,
    String,
    /// Dynamically sized `T[]`.
    Slice(Box<Type>),
    /// Fixed size `T[k]`.
    Array(Box<Type>, usize),
    Tuple(TupleType),
    Address,
    /// `bytesN` with `N` in `1..=32`.
    FixedBytes(usize),
    /// Dynamically sized `bytes`.
    Bytes,
    /// 20-byte address followed by a 4-byte selector.
    Function,
}

/// Component list of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleType {
    raw_name: String,
    fields: Vec<TupleField>,
}

/// A single named tuple component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    /// Name exactly as declared in the ABI descriptor.
    pub raw_name: String,
    /// Identifier-safe UpperCamelCase binding name, unique within the tuple.
    pub name: String,
    pub ty: Type,
}

/// A parsed ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    kind: TypeKind,
    canonical: String,
}

impl Type {
    /// Parses a type signature that carries no tuple components.
    pub fn new(signature: &str) -> Result<Self> {
        Self::parse(signature, "", &[])
    }

    /// Parses a type signature.
    ///
    /// `internal_type` is the optional Solidity-level type name (`struct Foo`,
    /// `contract Bar`, ...) and may be empty. `components` describe the fields
    /// when the base type is `tuple`.
    pub fn parse(
        signature: &str,
        internal_type: &str,
        components: &[ArgumentMarshaling],
    ) -> Result<Self> {
        trace!(signature, internal_type, components = components.len(), "parsing abi type");
        Self::parse_inner(signature.trim(), internal_type, components, 0)
    }

    /// `depth` counts the array groups and tuples enclosing `signature`.
    fn parse_inner(
        signature: &str,
        internal_type: &str,
        components: &[ArgumentMarshaling],
        depth: usize,
    ) -> Result<Self> {
        if signature.matches('[').count() != signature.matches(']').count() {
            return Err(AbiError::InvalidType(format!(
                "unbalanced brackets in {signature}"
            )));
        }

        // Peel bracket groups off the right; `None` marks a slice.
        let mut base = signature;
        let mut base_internal = internal_type;
        let mut lengths = Vec::new();
        while let Some(open) = base.rfind('[') {
            if depth + lengths.len() >= MAX_TYPE_DEPTH {
                return Err(too_deep(signature));
            }
            lengths.push(parse_array_group(signature, &base[open..])?);
            base = base[..open].trim_end();
            if let Some(i) = base_internal.rfind('[') {
                base_internal = &base_internal[..i];
            }
        }

        let mut ty = Self::parse_elementary(base, base_internal, components, depth + lengths.len())?;
        for len in lengths.into_iter().rev() {
            let elem = Box::new(ty);
            ty = Self::from_kind(match len {
                None => TypeKind::Slice(elem),
                Some(len) => TypeKind::Array(elem, len),
            });
        }
        Ok(ty)
    }

    fn parse_elementary(
        signature: &str,
        internal_type: &str,
        components: &[ArgumentMarshaling],
        depth: usize,
    ) -> Result<Self> {
        let (base, size) = split_base_and_size(signature)?;

        let kind = match base {
            "int" | "uint" => {
                let bits = size.ok_or_else(|| AbiError::UnsupportedType(signature.to_string()))?;
                if bits == 0 || bits > 256 || bits % 8 != 0 {
                    return Err(AbiError::InvalidType(format!(
                        "invalid integer width in {signature}"
                    )));
                }
                if base == "int" {
                    TypeKind::Int(bits)
                } else {
                    TypeKind::Uint(bits)
                }
            }
            "bytes" => match size {
                None => TypeKind::Bytes,
                Some(n) if n > 32 => return Err(AbiError::UnsupportedType(signature.to_string())),
                Some(0) => {
                    return Err(AbiError::InvalidType(format!(
                        "fixed bytes length must be positive: {signature}"
                    )))
                }
                Some(n) => TypeKind::FixedBytes(n),
            },
            "bool" | "string" | "address" | "function" | "tuple" if size.is_some() => {
                return Err(AbiError::InvalidType(format!(
                    "{base} does not take a size: {signature}"
                )));
            }
            "bool" => TypeKind::Bool,
            "string" => TypeKind::String,
            "address" => TypeKind::Address,
            "function" => TypeKind::Function,
            "tuple" if depth >= MAX_TYPE_DEPTH => return Err(too_deep(signature)),
            "tuple" => TypeKind::Tuple(TupleType::parse(internal_type, components, depth + 1)?),
            _ if internal_type.starts_with(CONTRACT_PREFIX) => TypeKind::Address,
            _ => return Err(AbiError::UnsupportedType(signature.to_string())),
        };

        Ok(Self::from_kind(kind))
    }

    fn from_kind(kind: TypeKind) -> Self {
        let canonical = match &kind {
            TypeKind::Int(bits) => format!("int{bits}"),
            TypeKind::Uint(bits) => format!("uint{bits}"),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Slice(elem) => format!("{}[]", elem.canonical),
            TypeKind::Array(elem, len) => format!("{}[{len}]", elem.canonical),
            TypeKind::Tuple(tuple) => {
                let parts: Vec<&str> = tuple.fields.iter().map(|f| f.ty.canonical()).collect();
                format!("({})", parts.join(","))
            }
            TypeKind::Address => "address".to_string(),
            TypeKind::FixedBytes(len) => format!("bytes{len}"),
            TypeKind::Bytes => "bytes".to_string(),
            TypeKind::Function => "function".to_string(),
        };
        Self { kind, canonical }
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The canonical signature, e.g. `uint256[2][]` or `(address,bytes)`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Bit width for integers, byte length for fixed bytes, addresses and
    /// function types, element count for fixed arrays; zero otherwise.
    pub fn size(&self) -> usize {
        match &self.kind {
            TypeKind::Int(bits) | TypeKind::Uint(bits) => *bits,
            TypeKind::FixedBytes(len) | TypeKind::Array(_, len) => *len,
            TypeKind::Address => 20,
            TypeKind::Function => 24,
            _ => 0,
        }
    }

    /// Element type of a slice or fixed array.
    pub fn elem(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Slice(elem) | TypeKind::Array(elem, _) => Some(elem),
            _ => None,
        }
    }

    /// Tuple components, empty for non-tuple types.
    pub fn tuple_fields(&self) -> &[TupleField] {
        match &self.kind {
            TypeKind::Tuple(tuple) => &tuple.fields,
            _ => &[],
        }
    }

    /// Declared struct name of a tuple (`struct Foo.Bar` gives `FooBar`).
    pub fn tuple_raw_name(&self) -> &str {
        match &self.kind {
            TypeKind::Tuple(tuple) => &tuple.raw_name,
            _ => "",
        }
    }

    /// `string`, `bytes` and `T[]` carry a length word in front of their data.
    pub fn requires_length_prefix(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::String | TypeKind::Bytes | TypeKind::Slice(_)
        )
    }

    /// Whether values of this type live in the tail behind an offset word.
    ///
    /// Dynamic types are `bytes`, `string`, any `T[]`, `T[k]` for dynamic `T`,
    /// and tuples with at least one dynamic component.
    pub fn is_dynamic(&self) -> bool {
        match &self.kind {
            TypeKind::String | TypeKind::Bytes | TypeKind::Slice(_) => true,
            TypeKind::Array(elem, _) => elem.is_dynamic(),
            TypeKind::Tuple(tuple) => tuple.fields.iter().any(|f| f.ty.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in an enclosing head section.
    ///
    /// Static arrays and tuples are laid out in place, so their size is the
    /// product/sum of their children. Everything else, including every
    /// dynamic type (which only leaves an offset word behind), is one word.
    pub fn head_size(&self) -> usize {
        match &self.kind {
            TypeKind::Array(elem, len) if !elem.is_dynamic() => len.saturating_mul(elem.head_size()),
            TypeKind::Tuple(tuple) if !self.is_dynamic() => tuple
                .fields
                .iter()
                .fold(0usize, |acc, f| acc.saturating_add(f.ty.head_size())),
            _ => WORD_SIZE,
        }
    }

    /// [`Type::head_size`] counted in words.
    pub fn head_slots(&self) -> usize {
        self.head_size() / WORD_SIZE
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn too_deep(signature: &str) -> AbiError {
    AbiError::InvalidType(format!(
        "type nested deeper than {MAX_TYPE_DEPTH} levels: {signature}"
    ))
}

/// Parses one `[]` or `[N]` group; `None` is a slice.
fn parse_array_group(signature: &str, group: &str) -> Result<Option<usize>> {
    let inner = group
        .strip_prefix('[')
        .and_then(|g| g.strip_suffix(']'))
        .map(str::trim)
        .ok_or_else(|| {
            AbiError::InvalidType(format!("invalid formatting of array type: {signature}"))
        })?;

    if inner.is_empty() {
        return Ok(None);
    }
    if !inner.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::InvalidType(format!(
            "invalid formatting of array type: {signature}"
        )));
    }
    let len: usize = inner
        .parse()
        .map_err(|e| AbiError::InvalidType(format!("error parsing array size: {e}")))?;
    if len == 0 {
        return Err(AbiError::InvalidType(format!(
            "array length must be positive: {signature}"
        )));
    }
    Ok(Some(len))
}

impl TupleType {
    fn parse(internal_type: &str, components: &[ArgumentMarshaling], depth: usize) -> Result<Self> {
        let mut used = HashSet::new();
        let mut fields = Vec::with_capacity(components.len());

        for (idx, component) in components.iter().enumerate() {
            let ty = Type::parse_inner(
                component.ty.trim(),
                component.internal_type.as_deref().unwrap_or(""),
                &component.components,
                depth,
            )?;

            let camel = to_camel_case(&component.name);
            if camel.is_empty() {
                return Err(AbiError::InvalidFieldName(
                    "purely anonymous or underscored field is not supported".into(),
                ));
            }
            let name = resolve_name_conflict(&camel, |s| used.contains(s));
            if !is_valid_field_name(&name) {
                return Err(AbiError::InvalidFieldName(format!(
                    "field {idx} has invalid name {:?}",
                    component.name
                )));
            }
            used.insert(name.clone());

            fields.push(TupleField {
                raw_name: component.name.clone(),
                name,
                ty,
            });
        }

        let raw_name = internal_type
            .strip_prefix(STRUCT_PREFIX)
            .map(|name| name.replace('.', ""))
            .unwrap_or_default();

        Ok(Self { raw_name, fields })
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn fields(&self) -> &[TupleField] {
        &self.fields
    }
}

/// Splits `letters[digits[x digits]]` into the base name and optional size.
fn split_base_and_size(signature: &str) -> Result<(&str, Option<usize>)> {
    let letters_end = signature
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(signature.len());
    if letters_end == 0 {
        return Err(AbiError::InvalidType(format!("invalid type '{signature}'")));
    }

    let (base, rest) = signature.split_at(letters_end);
    if rest.is_empty() {
        return Ok((base, None));
    }

    if let Some((m, n)) = rest.split_once('x') {
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        return if digits(m) && digits(n) {
            // fixedMxN / ufixedMxN
            Err(AbiError::UnsupportedType(signature.to_string()))
        } else {
            Err(AbiError::InvalidType(format!("invalid type '{signature}'")))
        };
    }

    if !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::InvalidType(format!("invalid type '{signature}'")));
    }
    let size = rest
        .parse()
        .map_err(|e| AbiError::InvalidType(format!("error parsing variable size: {e}")))?;
    Ok((base, Some(size)))
}
