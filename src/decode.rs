use std::iter;

use ethereum_types::{H160, U256};

use crate::{
    values::{int_fits, uint_fits},
    DecodedParams, Error, Param, Result, Type, Value,
};

/// Decodes `bs` as a tuple made of `params`.
///
/// The input is treated as untrusted: every offset, length and element
/// count is checked against the buffer before it is followed.
pub fn decode(bs: &[u8], params: &[Param]) -> Result<DecodedParams> {
    let mut budget = Budget::for_input(bs);

    let values = decode_sequence(bs, params.iter().map(|param| &param.type_), &mut budget)
        .map_err(|err| {
            log::trace!("rejected {} byte payload: {}", bs.len(), err);
            err
        })?;

    Ok(params.iter().cloned().zip(values).collect::<Vec<_>>().into())
}

impl Value {
    /// Decodes `bs` as a tuple of unnamed fields of types `tys`.
    pub fn decode_from_slice(bs: &[u8], tys: &[Type]) -> Result<Vec<Value>> {
        decode_sequence(bs, tys.iter(), &mut Budget::for_input(bs))
    }
}

// Number of 32 byte words a payload may still decode into. Offsets may point
// at the same tail more than once, so bounding each array by the bytes after
// it does not bound the total; every word of output is charged here instead.
// A well formed encoding never reads a word twice and stays within budget.
struct Budget(usize);

impl Budget {
    fn for_input(bs: &[u8]) -> Budget {
        // One extra word for unpadded trailing bytes, one for a zero sized
        // composite.
        Budget(bs.len() / 32 + 2)
    }

    fn spend(&mut self, words: usize) -> Result<()> {
        self.0 = self.0.checked_sub(words).ok_or_else(|| {
            Error::decode("payload decodes to more words than it holds")
        })?;

        Ok(())
    }
}

// `bs` starts at the first head of the sequence; dynamic offsets are relative
// to it and must point past the heads.
fn decode_sequence<'a, I>(bs: &[u8], tys: I, budget: &mut Budget) -> Result<Vec<Value>>
where
    I: Iterator<Item = &'a Type> + Clone,
{
    let head_len = tys
        .clone()
        .fold(0usize, |acc, ty| acc.saturating_add(ty.head_len()));

    if bs.len() < head_len {
        return Err(Error::decode(format!(
            "buffer of {} bytes is shorter than its {} byte head",
            bs.len(),
            head_len
        )));
    }

    let mut values = vec![];
    let mut at = 0;

    for ty in tys {
        let value = if ty.is_dynamic() {
            let offset = read_usize(bs, at)?;

            if offset < head_len || offset > bs.len() {
                return Err(Error::decode(format!(
                    "offset {} of {} is outside the tail region {}..{}",
                    offset,
                    ty,
                    head_len,
                    bs.len()
                )));
            }

            decode_value_within(&bs[offset..], ty, budget)?
        } else {
            decode_value_within(&bs[at..(at + ty.head_len())], ty, budget)?
        };

        values.push(value);
        at += ty.head_len();
    }

    Ok(values)
}

/// Decodes a single value whose encoding starts at the beginning of `bs`.
pub(crate) fn decode_value(bs: &[u8], ty: &Type) -> Result<Value> {
    decode_value_within(bs, ty, &mut Budget::for_input(bs))
}

fn decode_value_within(bs: &[u8], ty: &Type, budget: &mut Budget) -> Result<Value> {
    match ty {
        Type::Uint(_) | Type::Int(_) | Type::Address | Type::Bool | Type::FixedBytes(_) => {
            let value = decode_word(bs, ty)?;
            budget.spend(1)?;

            Ok(value)
        }

        Type::Bytes => {
            let bytes = read_bytes(bs)?;
            budget.spend(1 + words_for(bytes.len()))?;

            Ok(Value::Bytes(bytes.to_vec()))
        }

        Type::String => {
            let bytes = read_bytes(bs)?;
            budget.spend(1 + words_for(bytes.len()))?;

            String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|e| Error::decode(e.to_string()))
        }

        Type::FixedArray(elem, size) => {
            if *size == 0 {
                budget.spend(1)?;
            }

            decode_sequence(bs, iter::repeat(elem.as_ref()).take(*size), budget)
                .map(Value::FixedArray)
        }

        Type::Array(elem) => {
            let count = read_usize(bs, 0)?;
            let elems = &bs[32..];

            // Bound the count by the bytes available before iterating, so a
            // forged count cannot drive the loop.
            let fits = count
                .checked_mul(elem.head_len().max(1))
                .map_or(false, |len| len <= elems.len());

            if !fits {
                return Err(Error::decode(format!(
                    "array of {} {} elements overruns the {} remaining bytes",
                    count,
                    elem,
                    elems.len()
                )));
            }

            budget.spend(1)?;

            decode_sequence(elems, iter::repeat(elem.as_ref()).take(count), budget)
                .map(Value::Array)
        }

        Type::Tuple(params) => {
            if params.is_empty() {
                budget.spend(1)?;
            }

            decode_sequence(bs, params.iter().map(|param| &param.type_), budget)
                .map(Value::Tuple)
        }
    }
}

// Single word value types.
fn decode_word(bs: &[u8], ty: &Type) -> Result<Value> {
    match ty {
        Type::Uint(size) => {
            let v = read_u256(bs, 0)?;

            if !uint_fits(v, *size) {
                return Err(Error::decode(format!("{} does not fit in uint{}", v, size)));
            }

            Ok(Value::Uint(v, *size))
        }

        Type::Int(size) => {
            let v = read_u256(bs, 0)?;

            if !int_fits(v, *size) {
                return Err(Error::decode(format!(
                    "0x{:x} is not a sign extended int{}",
                    v, size
                )));
            }

            Ok(Value::Int(v, *size))
        }

        Type::Address => {
            let word = read_word(bs, 0)?;

            if word[..12].iter().any(|b| *b != 0) {
                return Err(Error::decode("address has dirty high order bytes"));
            }

            Ok(Value::Address(H160::from_slice(&word[12..])))
        }

        Type::Bool => {
            let v = read_u256(bs, 0)?;

            if v.is_zero() {
                Ok(Value::Bool(false))
            } else if v == U256::one() {
                Ok(Value::Bool(true))
            } else {
                Err(Error::decode(format!("0x{:x} is not a boolean", v)))
            }
        }

        Type::FixedBytes(size) => {
            let word = read_word(bs, 0)?;

            if word[*size..].iter().any(|b| *b != 0) {
                return Err(Error::decode(format!(
                    "bytes{} has dirty padding bytes",
                    size
                )));
            }

            Ok(Value::FixedBytes(word[..*size].to_vec()))
        }

        _ => Err(Error::decode(format!("{} is not a single word type", ty))),
    }
}

fn words_for(len: usize) -> usize {
    len / 32 + usize::from(len % 32 != 0)
}

fn read_word(bs: &[u8], at: usize) -> Result<&[u8]> {
    at.checked_add(32)
        .and_then(|end| bs.get(at..end))
        .ok_or_else(|| {
            Error::decode(format!(
                "cannot read a 32 byte word at {} from {} bytes",
                at,
                bs.len()
            ))
        })
}

fn read_u256(bs: &[u8], at: usize) -> Result<U256> {
    read_word(bs, at).map(U256::from_big_endian)
}

fn read_usize(bs: &[u8], at: usize) -> Result<usize> {
    let v = read_u256(bs, at)?;

    if v > U256::from(usize::MAX) {
        return Err(Error::decode(format!("{} is not a valid length or offset", v)));
    }

    Ok(v.as_usize())
}

// Length prefixed byte string. Trailing padding is not required.
fn read_bytes(bs: &[u8]) -> Result<&[u8]> {
    let len = read_usize(bs, 0)?;

    bs[32..].get(..len).ok_or_else(|| {
        Error::decode(format!(
            "length {} overruns the {} remaining bytes",
            len,
            bs.len() - 32
        ))
    })
}
