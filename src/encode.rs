use std::iter;

use ethereum_types::U256;

use crate::{
    values::{int_fits, uint_fits},
    Error, Param, Result, Type, Value,
};

/// Encodes `values` as the fields of a tuple made of `params`, using the
/// standard head/tail layout.
pub fn encode(values: &[Value], params: &[Param]) -> Result<Vec<u8>> {
    if values.len() != params.len() {
        return Err(Error::encode(format!(
            "expected {} values, got {}",
            params.len(),
            values.len()
        )));
    }

    encode_sequence(values, params.iter().map(|param| &param.type_))
}

// Heads are laid out in order; dynamic values get an offset, relative to the
// start of the sequence, to their content appended after the last head.
// Callers check that `values` and `tys` have the same length.
fn encode_sequence<'a, I>(values: &[Value], tys: I) -> Result<Vec<u8>>
where
    I: Iterator<Item = &'a Type> + Clone,
{
    let head_len = tys
        .clone()
        .fold(0usize, |acc, ty| acc.saturating_add(ty.head_len()));

    let mut head = vec![];
    let mut tail = vec![];

    for (value, ty) in values.iter().zip(tys) {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_value(value, ty)?);
        } else {
            head.extend(encode_value(value, ty)?);
        }
    }

    head.extend(tail);

    Ok(head)
}

/// Encodes a single value. Static values produce their in-place head bytes,
/// dynamic values produce their tail content.
pub(crate) fn encode_value(value: &Value, ty: &Type) -> Result<Vec<u8>> {
    match (ty, value) {
        (Type::Uint(size), Value::Uint(v, _)) => {
            if !uint_fits(*v, *size) {
                return Err(Error::encode(format!("{} does not fit in uint{}", v, size)));
            }

            Ok(u256_word(*v).to_vec())
        }

        (Type::Int(size), Value::Int(v, _)) => {
            if !int_fits(*v, *size) {
                return Err(Error::encode(format!(
                    "0x{:x} does not fit in int{}",
                    v, size
                )));
            }

            Ok(u256_word(*v).to_vec())
        }

        (Type::Address, Value::Address(addr)) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_bytes());

            Ok(word.to_vec())
        }

        (Type::Bool, Value::Bool(b)) => Ok(u256_word(U256::from(*b as u8)).to_vec()),

        (Type::FixedBytes(size), Value::FixedBytes(bytes)) => {
            if bytes.len() != *size {
                return Err(Error::encode(format!(
                    "expected {} bytes for bytes{}, got {}",
                    size,
                    size,
                    bytes.len()
                )));
            }

            let mut word = [0u8; 32];
            word[..*size].copy_from_slice(bytes);

            Ok(word.to_vec())
        }

        (Type::Bytes, Value::Bytes(bytes)) => Ok(encode_bytes(bytes)),

        (Type::String, Value::String(s)) => Ok(encode_bytes(s.as_bytes())),

        (Type::FixedArray(elem, size), Value::FixedArray(values))
        | (Type::FixedArray(elem, size), Value::Array(values)) => {
            if values.len() != *size {
                return Err(Error::encode(format!(
                    "expected {} elements for {}, got {}",
                    size,
                    ty,
                    values.len()
                )));
            }

            encode_sequence(values, iter::repeat(elem.as_ref()).take(*size))
        }

        (Type::Array(elem), Value::Array(values)) => {
            let mut out = usize_word(values.len()).to_vec();
            out.extend(encode_sequence(
                values,
                iter::repeat(elem.as_ref()).take(values.len()),
            )?);

            Ok(out)
        }

        (Type::Tuple(params), Value::Tuple(values)) => {
            if values.len() != params.len() {
                return Err(Error::encode(format!(
                    "expected {} fields for {}, got {}",
                    params.len(),
                    ty,
                    values.len()
                )));
            }

            encode_sequence(values, params.iter().map(|param| &param.type_))
        }

        (ty, value) => Err(Error::encode(format!(
            "cannot encode {} as {}",
            value.kind(),
            ty
        ))),
    }
}

// Length prefix followed by the bytes, right padded to a 32 byte boundary.
fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend_from_slice(bytes);
    out.resize(32 + padded32_size(bytes.len()), 0);

    out
}

fn u256_word(v: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    v.to_big_endian(&mut word);

    word
}

fn usize_word(v: usize) -> [u8; 32] {
    u256_word(U256::from(v))
}

// Computes the padded size for a given size, e.g.:
// padded32_size(20) == 32
// padded32_size(32) == 32
// padded32_size(40) == 64
pub(crate) fn padded32_size(size: usize) -> usize {
    let r = size % 32;

    if r == 0 {
        size
    } else {
        size + 32 - r
    }
}
