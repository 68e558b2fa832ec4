//! ABI encoder (pack).
//!
//! Every value is emitted as a sequence of 32-byte words. Composite values
//! follow the head/tail rule
//! `enc(X) = head(X1) .. head(Xk) tail(X1) .. tail(Xk)`, where a static
//! component is written in place and a dynamic one leaves an offset word in
//! the head and its encoding in the tail.

use alloy_primitives::U256;

use crate::error::{AbiError, Result};
use crate::types::{Type, TypeKind, WORD_SIZE};
use crate::value::Value;

impl Type {
    /// Encodes `value` according to this type.
    pub fn pack(&self, value: &Value) -> Result<Vec<u8>> {
        match (self.kind(), value) {
            (TypeKind::Slice(elem), Value::Array(items)) => {
                let mut out = pack_offset(items.len()).to_vec();
                out.extend(pack_sequence(elem, items)?);
                Ok(out)
            }
            (TypeKind::Array(elem, len), Value::Array(items)) => {
                if items.len() != *len {
                    return Err(AbiError::TypeMismatch {
                        expected: self.canonical().to_string(),
                        got: format!("array of length {}", items.len()),
                    });
                }
                pack_sequence(elem, items)
            }
            (TypeKind::Tuple(tuple), Value::Tuple(values)) => {
                let fields = tuple.fields();
                let mut ordered = Vec::with_capacity(fields.len());
                for field in fields {
                    let value = values
                        .iter()
                        .find(|(name, _)| *name == field.raw_name)
                        .map(|(_, value)| value)
                        .ok_or_else(|| AbiError::FieldNotFound(field.raw_name.clone()))?;
                    ordered.push((&field.ty, value));
                }
                pack_head_tail(ordered)
            }
            _ => pack_element(self, value).map(Element::into_bytes),
        }
    }
}

/// Packs the elements of an array or slice body (without length prefix).
fn pack_sequence(elem: &Type, items: &[Value]) -> Result<Vec<u8>> {
    pack_head_tail(items.iter().map(|item| (elem, item)).collect())
}

/// Lays out `(type, value)` pairs as a head section followed by a tail of
/// dynamic payloads. Offsets are relative to the start of the head.
///
/// Every value is packed before any buffer is sized, so the layout follows
/// the bytes actually produced rather than [`Type::head_size`].
pub(crate) fn pack_head_tail(parts: Vec<(&Type, &Value)>) -> Result<Vec<u8>> {
    let packed = parts
        .into_iter()
        .map(|(ty, value)| -> Result<(bool, Vec<u8>)> { Ok((ty.is_dynamic(), ty.pack(value)?)) })
        .collect::<Result<Vec<_>>>()?;

    // Static values sit in the head; dynamic ones leave an offset word there.
    let head_len = packed
        .iter()
        .try_fold(0usize, |acc, (dynamic, bytes)| {
            acc.checked_add(if *dynamic { WORD_SIZE } else { bytes.len() })
        })
        .ok_or_else(|| AbiError::OffsetOverflow("head section exceeds usize".into()))?;
    let total_len = packed
        .iter()
        .filter(|(dynamic, _)| *dynamic)
        .try_fold(head_len, |acc, (_, bytes)| acc.checked_add(bytes.len()))
        .ok_or_else(|| AbiError::OffsetOverflow("encoding exceeds usize".into()))?;

    let mut head = Vec::with_capacity(total_len);
    let mut tail = Vec::with_capacity(total_len - head_len);
    let mut offset = head_len;

    for (dynamic, bytes) in packed {
        if dynamic {
            head.extend_from_slice(&pack_offset(offset));
            offset += bytes.len();
            tail.extend(bytes);
        } else {
            head.extend(bytes);
        }
    }

    head.extend(tail);
    Ok(head)
}

/// Encodes an elementary (non-composite) value.
///
/// Numbers, booleans and addresses are left-padded into one big-endian word.
/// `bytesN` and function values are right-padded. Dynamic `string`/`bytes`
/// produce a length word plus content right-padded to a word boundary.
///
/// # Parameters
///
/// - `ty`: The declared type; its width bounds integer values.
/// - `value`: The value to encode. Integers may cross signedness when the
///   value fits the declared width.
///
/// # Errors
///
/// `InvalidSign` for a negative value into `uintN`, `ValueOutOfRange` when an
/// integer exceeds the width, `TypeMismatch` for any other shape mismatch.
fn pack_element(ty: &Type, value: &Value) -> Result<Element> {
    match (ty.kind(), value) {
        // Already a 256-bit big-endian integer; only the width is checked.
        (TypeKind::Uint(bits), Value::Uint(v)) => {
            check_unsigned(ty, *v, *bits)?;
            Ok(Element::Word(v.to_be_bytes::<32>()))
        }
        (TypeKind::Uint(bits), Value::Int(v)) => {
            if v.is_negative() {
                return Err(AbiError::InvalidSign);
            }
            check_unsigned(ty, v.into_raw(), *bits)?;
            Ok(Element::Word(v.into_raw().to_be_bytes::<32>()))
        }
        // Two's complement: negative values are left-padded with 0xff.
        (TypeKind::Int(bits), Value::Int(v)) => {
            if !fits_signed(v.into_raw(), *bits) {
                return Err(out_of_range(ty, v));
            }
            Ok(Element::Word(v.into_raw().to_be_bytes::<32>()))
        }
        // The sign bit of the declared width must stay clear.
        (TypeKind::Int(bits), Value::Uint(v)) => {
            if v.bit_len() >= *bits {
                return Err(out_of_range(ty, v));
            }
            Ok(Element::Word(v.to_be_bytes::<32>()))
        }
        (TypeKind::Bool, Value::Bool(b)) => Ok(Element::Word(pack_offset(usize::from(*b)))),
        (TypeKind::String, Value::String(s)) => Ok(Element::Dynamic(pack_bytes_slice(s.as_bytes()))),
        (TypeKind::Bytes, Value::Bytes(b) | Value::FixedBytes(b)) => {
            Ok(Element::Dynamic(pack_bytes_slice(b)))
        }
        // Right-pad: data + trailing zero bytes.
        (TypeKind::FixedBytes(len), Value::FixedBytes(b) | Value::Bytes(b)) => {
            if b.len() != *len {
                return Err(AbiError::TypeMismatch {
                    expected: ty.canonical().to_string(),
                    got: format!("{} bytes", b.len()),
                });
            }
            Ok(Element::Word(right_pad_word(b)))
        }
        // Left-pad: 12 zero bytes + 20 address bytes.
        (TypeKind::Address, Value::Address(addr)) => {
            let mut word = [0u8; WORD_SIZE];
            word[12..].copy_from_slice(addr.as_slice());
            Ok(Element::Word(word))
        }
        // Address and selector fill 24 bytes; the last 8 stay zero.
        (TypeKind::Function, Value::Function(func)) => Ok(Element::Word(right_pad_word(func))),
        _ => Err(AbiError::TypeMismatch {
            expected: ty.canonical().to_string(),
            got: value.kind_name().to_string(),
        }),
    }
}

/// Output of [`pack_element`]: a single word or a length-prefixed payload.
enum Element {
    Word([u8; WORD_SIZE]),
    Dynamic(Vec<u8>),
}

impl Element {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Element::Word(word) => word.to_vec(),
            Element::Dynamic(bytes) => bytes,
        }
    }
}

/// Encodes `bytes` as `[len, content right-padded to a word boundary]`.
fn pack_bytes_slice(bytes: &[u8]) -> Vec<u8> {
    let padded_len = bytes.len().div_ceil(WORD_SIZE) * WORD_SIZE;
    let mut out = Vec::with_capacity(WORD_SIZE + padded_len);
    out.extend_from_slice(&pack_offset(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD_SIZE + padded_len, 0);
    out
}

/// Encodes a length or offset as a big-endian uint256 word.
pub(crate) fn pack_offset(n: usize) -> [u8; WORD_SIZE] {
    U256::from(n as u64).to_be_bytes::<32>()
}

/// Copies at most 32 bytes into the front of a zeroed word.
fn right_pad_word(bytes: &[u8]) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    let len = bytes.len().min(WORD_SIZE);
    word[..len].copy_from_slice(&bytes[..len]);
    word
}

fn check_unsigned(ty: &Type, v: U256, bits: usize) -> Result<()> {
    if !fits_unsigned(v, bits) {
        return Err(out_of_range(ty, v));
    }
    Ok(())
}

fn out_of_range(ty: &Type, value: impl ToString) -> AbiError {
    AbiError::ValueOutOfRange {
        ty: ty.canonical().to_string(),
        value: value.to_string(),
    }
}

/// Whether the two's-complement word `raw` is a valid `int<bits>`.
pub(crate) fn fits_signed(raw: U256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    // For negative values !raw == -v - 1, which must fit in bits - 1 as well.
    let magnitude = if raw.bit(255) { !raw } else { raw };
    magnitude.bit_len() < bits
}

/// Whether `raw` is a valid `uint<bits>`.
pub(crate) fn fits_unsigned(raw: U256, bits: usize) -> bool {
    raw.bit_len() <= bits
}
