//! ABI decoder (unpack).
//!
//! Offsets and lengths read from the input are never used as indices before
//! being checked against the input length, so malformed data yields an error
//! instead of a panic or an out-of-bounds read.

use alloy_primitives::{Address, I256, U256};

use crate::encoder::{fits_signed, fits_unsigned};
use crate::error::{AbiError, Result};
use crate::types::{TupleType, Type, TypeKind, WORD_SIZE};
use crate::value::Value;

/// Offsets and lengths must stay representable as a signed 64-bit integer.
const MAX_OFFSET_BITS: usize = 63;

impl Type {
    /// Decodes the value whose head word starts at byte `index` of `data`.
    ///
    /// Static values are read in place. Dynamic values hold an offset word at
    /// `index`, relative to the start of `data`, pointing at their payload.
    ///
    /// # Parameters
    ///
    /// - `index`: Byte position of the head word. Argument lists pass
    ///   `32 * slot`, where earlier static arrays and tuples may take several
    ///   slots each.
    /// - `data`: The enclosing head/tail block, e.g. call data without its
    ///   selector, or the body a dynamic tuple's offset points to.
    ///
    /// # Errors
    ///
    /// `InsufficientLength` or `OffsetOverflow` when a word, offset or length
    /// reaches past `data`; `ImproperlyEncoded*` or `InvalidUtf8` when a word
    /// is not a valid value of this type.
    pub fn unpack(&self, index: usize, data: &[u8]) -> Result<Value> {
        if let TypeKind::Tuple(tuple) = self.kind() {
            if !self.is_dynamic() {
                // Static tuples are laid out in place.
                let body = data.get(index..).ok_or_else(|| insufficient(data, index))?;
                return unpack_tuple(tuple, body);
            }
        }

        let word = read_word(data, index)?;

        match self.kind() {
            // Dynamic tuple: fields are laid out from the offset onwards.
            TypeKind::Tuple(tuple) => {
                let begin = tuple_points_to(index, data)?;
                unpack_tuple(tuple, &data[begin..])
            }
            // Offset to a length word followed by the elements.
            TypeKind::Slice(elem) => {
                let (begin, length) = length_prefix_points_to(index, data)?;
                unpack_sequence(elem, &data[begin..], length)
            }
            // Static elements are inline; dynamic ones sit behind an offset.
            TypeKind::Array(elem, len) => {
                if elem.is_dynamic() {
                    let begin = tuple_points_to(index, data)?;
                    unpack_sequence(elem, &data[begin..], *len)
                } else {
                    unpack_sequence(elem, &data[index..], *len)
                }
            }
            TypeKind::String => {
                let (begin, length) = length_prefix_points_to(index, data)?;
                let s = std::str::from_utf8(&data[begin..begin + length])
                    .map_err(|_| AbiError::InvalidUtf8)?;
                Ok(Value::String(s.to_string()))
            }
            TypeKind::Bytes => {
                let (begin, length) = length_prefix_points_to(index, data)?;
                Ok(Value::Bytes(data[begin..begin + length].to_vec()))
            }
            TypeKind::Int(_) | TypeKind::Uint(_) => read_integer(self, word),
            TypeKind::Bool => read_bool(word).map(Value::Bool),
            // Left-padded: the address is the last 20 bytes.
            TypeKind::Address => Ok(Value::Address(Address::from_slice(&word[12..]))),
            // Right-padded: the value is the first `len` bytes.
            TypeKind::FixedBytes(len) => Ok(Value::FixedBytes(word[..*len].to_vec())),
            TypeKind::Function => read_function_type(word).map(Value::Function),
        }
    }
}

/// Decodes `size` consecutive elements starting at the front of `data`.
///
/// Static elements are packed back to back, each taking
/// [`Type::head_size`] bytes; dynamic elements take one offset word each.
fn unpack_sequence(elem: &Type, data: &[u8], size: usize) -> Result<Value> {
    let fits = size
        .checked_mul(WORD_SIZE)
        .is_some_and(|required| required <= data.len());
    if !fits {
        return Err(AbiError::InsufficientLength {
            have: data.len(),
            want: format!("{size} words"),
        });
    }

    let elem_size = elem.head_size();
    let mut items = Vec::with_capacity(size);
    for i in 0..size {
        let index = i
            .checked_mul(elem_size)
            .ok_or_else(|| AbiError::OffsetOverflow(format!("element {i} of {elem}")))?;
        items.push(elem.unpack(index, data)?);
    }
    Ok(Value::Array(items))
}

/// Decodes tuple fields laid out from the front of `data`.
///
/// A static array or tuple field occupies [`Type::head_slots`] words in
/// place, so every following field's slot moves past all of them.
fn unpack_tuple(tuple: &TupleType, data: &[u8]) -> Result<Value> {
    let mut slot = 0usize;
    let mut fields = Vec::with_capacity(tuple.fields().len());
    for field in tuple.fields() {
        let value = field.ty.unpack(slot_index(slot)?, data)?;
        slot = slot.saturating_add(field.ty.head_slots());
        fields.push((field.raw_name.clone(), value));
    }
    Ok(Value::Tuple(fields))
}

/// Byte index of head slot `slot`.
pub(crate) fn slot_index(slot: usize) -> Result<usize> {
    slot.checked_mul(WORD_SIZE)
        .ok_or_else(|| AbiError::OffsetOverflow(format!("head slot {slot}")))
}

fn read_word(data: &[u8], index: usize) -> Result<&[u8]> {
    index
        .checked_add(WORD_SIZE)
        .and_then(|end| data.get(index..end))
        .ok_or_else(|| insufficient(data, index))
}

fn insufficient(data: &[u8], index: usize) -> AbiError {
    AbiError::InsufficientLength {
        have: data.len(),
        want: (index as u128 + WORD_SIZE as u128).to_string(),
    }
}

/// Reads the offset word at `index` and resolves the length-prefixed payload
/// it points to. Returns the payload start and its length in bytes.
fn length_prefix_points_to(index: usize, data: &[u8]) -> Result<(usize, usize)> {
    let data_len = U256::from(data.len() as u64);
    let offset = U256::from_be_slice(read_word(data, index)?);

    let offset_end = offset
        .checked_add(U256::from(WORD_SIZE as u64))
        .ok_or_else(|| AbiError::OffsetOverflow(format!("offset {offset} overflows")))?;
    if offset_end > data_len {
        return Err(AbiError::InsufficientLength {
            have: data.len(),
            want: offset_end.to_string(),
        });
    }
    if offset_end.bit_len() > MAX_OFFSET_BITS {
        return Err(AbiError::OffsetOverflow(format!(
            "offset {offset_end} larger than int64"
        )));
    }

    let start = to_usize(offset_end);
    let length = U256::from_be_slice(&data[start - WORD_SIZE..start]);

    let total = offset_end
        .checked_add(length)
        .filter(|total| total.bit_len() <= MAX_OFFSET_BITS)
        .ok_or_else(|| AbiError::OffsetOverflow(format!("length {length} larger than int64")))?;
    if total > data_len {
        return Err(AbiError::InsufficientLength {
            have: data.len(),
            want: total.to_string(),
        });
    }

    Ok((start, to_usize(length)))
}

/// Resolves the offset word at `index` for a dynamic tuple or array.
fn tuple_points_to(index: usize, data: &[u8]) -> Result<usize> {
    let offset = U256::from_be_slice(read_word(data, index)?);

    if offset > U256::from(data.len() as u64) {
        return Err(AbiError::InsufficientLength {
            have: data.len(),
            want: offset.to_string(),
        });
    }
    if offset.bit_len() > MAX_OFFSET_BITS {
        return Err(AbiError::OffsetOverflow(format!("offset {offset} larger than int64")));
    }
    Ok(to_usize(offset))
}

/// Callers must have bounded `v` by a slice length first.
fn to_usize(v: U256) -> usize {
    v.as_limbs()[0] as usize
}

/// Reads an integer word, rejecting values that do not fit the declared
/// width and signedness.
fn read_integer(ty: &Type, word: &[u8]) -> Result<Value> {
    let raw = U256::from_be_slice(word);
    match ty.kind() {
        TypeKind::Uint(bits) if fits_unsigned(raw, *bits) => Ok(Value::Uint(raw)),
        TypeKind::Int(bits) if fits_signed(raw, *bits) => Ok(Value::Int(I256::from_raw(raw))),
        _ => Err(AbiError::ImproperlyEncodedInt(ty.canonical().to_string())),
    }
}

fn read_bool(word: &[u8]) -> Result<bool> {
    if word[..WORD_SIZE - 1].iter().any(|b| *b != 0) {
        return Err(AbiError::ImproperlyEncodedBool);
    }
    match word[WORD_SIZE - 1] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AbiError::ImproperlyEncodedBool),
    }
}

/// A function value is an address plus selector; the trailing 8 bytes of
/// the word must be zero.
fn read_function_type(word: &[u8]) -> Result<[u8; 24]> {
    if word[24..].iter().any(|b| *b != 0) {
        return Err(AbiError::ImproperlyEncodedFunction);
    }
    let mut func = [0u8; 24];
    func.copy_from_slice(&word[..24]);
    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgumentMarshaling;

    fn word(n: u64) -> Vec<u8> {
        U256::from(n).to_be_bytes::<32>().to_vec()
    }

    fn padded(bytes: &[u8]) -> Vec<u8> {
        let mut out = bytes.to_vec();
        out.resize(bytes.len().div_ceil(32) * 32, 0);
        out
    }

    #[test]
    fn unpack_uint256() {
        let ty = Type::new("uint256").unwrap();
        let value = ty.unpack(0, &word(42)).unwrap();
        assert_eq!(value, Value::Uint(U256::from(42)));
    }

    #[test]
    fn unpack_negative_int() {
        let ty = Type::new("int16").unwrap();
        let value = ty.unpack(0, &[0xff; 32]).unwrap();
        assert_eq!(value.as_int(), Some(I256::MINUS_ONE));
    }

    #[test]
    fn unpack_uint8_overflow_fails() {
        let ty = Type::new("uint8").unwrap();
        let err = ty.unpack(0, &word(256)).unwrap_err();
        assert_eq!(err.to_string(), "improperly encoded uint8 value");
    }

    #[test]
    fn unpack_int8_without_sign_extension_fails() {
        let ty = Type::new("int8").unwrap();
        // 0x80 is 128, not -128, unless the upper bytes are all 0xff
        assert!(matches!(
            ty.unpack(0, &word(0x80)),
            Err(AbiError::ImproperlyEncodedInt(name)) if name == "int8"
        ));

        let mut minus_128 = vec![0xff; 32];
        minus_128[31] = 0x80;
        assert_eq!(ty.unpack(0, &minus_128).unwrap().as_int().unwrap().to_string(), "-128");
    }

    #[test]
    fn unpack_int64_bounds() {
        let ty = Type::new("int64").unwrap();
        assert!(ty.unpack(0, &word(i64::MAX as u64)).is_ok());
        assert!(matches!(
            ty.unpack(0, &word(i64::MAX as u64 + 1)),
            Err(AbiError::ImproperlyEncodedInt(_))
        ));
    }

    #[test]
    fn unpack_bool() {
        let ty = Type::new("bool").unwrap();
        assert_eq!(ty.unpack(0, &word(1)).unwrap(), Value::Bool(true));
        assert_eq!(ty.unpack(0, &word(0)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn unpack_bool_rejects_two() {
        let ty = Type::new("bool").unwrap();
        assert!(matches!(ty.unpack(0, &word(2)), Err(AbiError::ImproperlyEncodedBool)));
    }

    #[test]
    fn unpack_bool_rejects_dirty_high_bytes() {
        let ty = Type::new("bool").unwrap();
        let mut w = word(1);
        w[0] = 1;
        assert!(matches!(ty.unpack(0, &w), Err(AbiError::ImproperlyEncodedBool)));
    }

    #[test]
    fn unpack_function_rejects_trailing_garbage() {
        let ty = Type::new("function").unwrap();
        let mut w = vec![0x33; 24];
        w.extend([0u8; 8]);
        assert_eq!(ty.unpack(0, &w).unwrap(), Value::Function([0x33; 24]));

        w[31] = 1;
        assert!(matches!(ty.unpack(0, &w), Err(AbiError::ImproperlyEncodedFunction)));
    }

    #[test]
    fn unpack_address_and_fixed_bytes() {
        let mut w = vec![0u8; 12];
        w.extend([0xaa; 20]);
        let addr = Type::new("address").unwrap().unpack(0, &w).unwrap();
        assert_eq!(addr, Value::Address(Address::repeat_byte(0xaa)));

        let fixed = Type::new("bytes2").unwrap().unpack(0, &padded(&[1, 2])).unwrap();
        assert_eq!(fixed, Value::FixedBytes(vec![1, 2]));
    }

    #[test]
    fn unpack_string() {
        let data = [word(32), word(3), padded(b"abc")].concat();
        let ty = Type::new("string").unwrap();
        assert_eq!(ty.unpack(0, &data).unwrap(), Value::from("abc"));
    }

    #[test]
    fn unpack_invalid_utf8_fails() {
        let data = [word(32), word(2), padded(&[0xff, 0xfe])].concat();
        let ty = Type::new("string").unwrap();
        assert!(matches!(ty.unpack(0, &data), Err(AbiError::InvalidUtf8)));
    }

    #[test]
    fn unpack_short_input_fails() {
        let ty = Type::new("uint256").unwrap();
        assert!(matches!(
            ty.unpack(0, &[0u8; 31]),
            Err(AbiError::InsufficientLength { have: 31, .. })
        ));
        assert!(matches!(
            ty.unpack(usize::MAX, &word(1)),
            Err(AbiError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn unpack_offset_past_end_fails() {
        let data = [word(64), word(0)].concat();
        let ty = Type::new("bytes").unwrap();
        assert!(matches!(
            ty.unpack(0, &data),
            Err(AbiError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn unpack_huge_offset_fails() {
        let ty = Type::new("bytes").unwrap();
        let data = [vec![0xff; 32], word(0)].concat();
        assert!(matches!(ty.unpack(0, &data), Err(AbiError::OffsetOverflow(_))));

        let ty = Type::new("string[2]").unwrap();
        assert!(matches!(
            ty.unpack(0, &data),
            Err(AbiError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn unpack_huge_length_fails() {
        let data = [word(32), vec![0xff; 32]].concat();
        let ty = Type::new("bytes").unwrap();
        assert!(matches!(ty.unpack(0, &data), Err(AbiError::OffsetOverflow(_))));

        let ty = Type::new("uint8[]").unwrap();
        assert!(ty.unpack(0, &data).is_err());
    }

    #[test]
    fn unpack_length_past_end_fails() {
        let data = [word(32), word(33), padded(b"short")].concat();
        let ty = Type::new("bytes").unwrap();
        assert!(matches!(
            ty.unpack(0, &data),
            Err(AbiError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn unpack_slice_length_exceeding_data_fails() {
        // claims 4 elements but only 1 word of body follows
        let data = [word(32), word(4), word(1)].concat();
        let ty = Type::new("uint256[]").unwrap();
        assert!(matches!(
            ty.unpack(0, &data),
            Err(AbiError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn unpack_slice() {
        let data = [word(32), word(2), word(7), word(8)].concat();
        let ty = Type::new("uint64[]").unwrap();
        assert_eq!(
            ty.unpack(0, &data).unwrap(),
            Value::Array(vec![Value::from(7u64), Value::from(8u64)])
        );
    }

    #[test]
    fn unpack_nested_static_array_in_place() {
        let data: Vec<u8> = (1..=6).flat_map(word).collect();
        let ty = Type::new("uint8[3][2]").unwrap();
        let value = ty.unpack(0, &data).unwrap();

        let row = |a: u64, b: u64, c: u64| {
            Value::Array(vec![Value::from(a), Value::from(b), Value::from(c)])
        };
        assert_eq!(value, Value::Array(vec![row(1, 2, 3), row(4, 5, 6)]));
    }

    #[test]
    fn unpack_fixed_array_of_strings() {
        // offset to the array body, then two element offsets relative to it
        let data = [
            word(32),
            word(64),
            word(128),
            word(1),
            padded(b"x"),
            word(1),
            padded(b"y"),
        ]
        .concat();
        let ty = Type::new("string[2]").unwrap();
        assert_eq!(
            ty.unpack(0, &data).unwrap(),
            Value::Array(vec![Value::from("x"), Value::from("y")])
        );
    }

    #[test]
    fn unpack_static_tuple_skips_inlined_arrays() {
        let components = [
            ArgumentMarshaling::new("grid", "uint8[2][2]"),
            ArgumentMarshaling::new("flag", "bool"),
        ];
        let ty = Type::parse("tuple", "", &components).unwrap();
        let data = [word(1), word(2), word(3), word(4), word(1)].concat();

        let value = ty.unpack(0, &data).unwrap();
        assert_eq!(value.field("flag").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn unpack_dynamic_tuple_follows_offset() {
        let components = [
            ArgumentMarshaling::new("id", "uint256"),
            ArgumentMarshaling::new("name", "string"),
        ];
        let ty = Type::parse("tuple", "", &components).unwrap();
        let data = [word(32), word(5), word(64), word(2), padded(b"hi")].concat();

        let value = ty.unpack(0, &data).unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![
                ("id".into(), Value::from(5u64)),
                ("name".into(), Value::from("hi")),
            ])
        );
    }

    #[test]
    fn unpack_empty_static_tuple_reads_nothing() {
        let ty = Type::parse("tuple", "", &[]).unwrap();
        assert_eq!(ty.unpack(0, &[]).unwrap(), Value::Tuple(vec![]));
    }

    #[test]
    fn slot_index_overflow_is_reported() {
        assert!(slot_index(usize::MAX).is_err());
        assert_eq!(slot_index(3).unwrap(), 96);
    }
}
