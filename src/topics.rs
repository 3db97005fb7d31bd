use ethereum_types::H256;

use crate::{
    decode::decode_value, encode::encode_value, encode::padded32_size, signature::keccak256,
    Error, Result, Type, Value,
};

/// Whether indexed values of `ty` are stored as the keccak256 hash of their
/// encoding rather than the encoding itself.
pub fn is_hashed_topic(ty: &Type) -> bool {
    matches!(
        ty,
        Type::FixedArray(_, _) | Type::Array(_) | Type::Bytes | Type::String | Type::Tuple(_)
    )
}

/// Encodes `value` into a topic slot.
///
/// Value types are stored as their 32 byte word. Strings and bytes are
/// stored as the hash of their contents; arrays and tuples as the hash of
/// their in-place encoding, where every element is padded to 32 bytes and
/// no offsets or lengths are written.
pub fn encode_topic(ty: &Type, value: &Value) -> Result<H256> {
    if is_hashed_topic(ty) {
        let mut preimage = vec![];
        write_topic_preimage(ty, value, false, &mut preimage)?;

        return Ok(H256::from(keccak256(&preimage)));
    }

    encode_value(value, ty).map(|word| H256::from_slice(&word))
}

fn write_topic_preimage(ty: &Type, value: &Value, padded: bool, out: &mut Vec<u8>) -> Result<()> {
    match (ty, value) {
        (Type::Bytes, Value::Bytes(bytes)) => write_raw(bytes, padded, out),

        (Type::String, Value::String(s)) => write_raw(s.as_bytes(), padded, out),

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

            for value in values {
                write_topic_preimage(elem, value, true, out)?;
            }
        }

        (Type::Array(elem), Value::Array(values)) => {
            for value in values {
                write_topic_preimage(elem, value, true, out)?;
            }
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

            for (param, value) in params.iter().zip(values) {
                write_topic_preimage(&param.type_, value, true, out)?;
            }
        }

        // Value types, and mismatches which `encode_value` reports.
        _ => out.extend(encode_value(value, ty)?),
    }

    Ok(())
}

// Top level strings and bytes are hashed as is; nested ones are padded.
fn write_raw(bytes: &[u8], padded: bool, out: &mut Vec<u8>) {
    out.extend_from_slice(bytes);

    if padded {
        out.resize(out.len() + padded32_size(bytes.len()) - bytes.len(), 0);
    }
}

/// Decodes a topic slot holding a value type.
///
/// Kinds stored as a hash cannot be recovered and fail with
/// [`Error::UnsupportedType`].
pub fn decode_topic(ty: &Type, topic: &H256) -> Result<Value> {
    if is_hashed_topic(ty) {
        return Err(Error::UnsupportedType(format!(
            "indexed {} values are stored as a hash and cannot be decoded",
            ty
        )));
    }

    decode_value(topic.as_bytes(), ty)
}

#[cfg(test)]
mod test {
    use super::*;

    use std::str::FromStr;

    use ethereum_types::{H160, U256};
    use pretty_assertions::assert_eq;

    fn topic(s: &str) -> H256 {
        H256::from_str(s).unwrap()
    }

    #[test]
    fn bool_topics() {
        let mut expected = [0u8; 32];
        expected[31] = 1;

        assert_eq!(
            encode_topic(&Type::Bool, &Value::Bool(true)).unwrap(),
            H256::from(expected)
        );
        assert_eq!(
            encode_topic(&Type::Bool, &Value::Bool(false)).unwrap(),
            H256::zero()
        );

        assert_eq!(
            decode_topic(&Type::Bool, &H256::from(expected)),
            Ok(Value::Bool(true))
        );
        assert_eq!(decode_topic(&Type::Bool, &H256::zero()), Ok(Value::Bool(false)));

        expected[0] = 1;
        assert!(matches!(
            decode_topic(&Type::Bool, &H256::from(expected)),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn numeric_topics() {
        let minus_one = Value::from_i128(-1, 64);
        let t = encode_topic(&Type::Int(64), &minus_one).unwrap();

        assert_eq!(t, H256::repeat_byte(0xff));
        assert_eq!(decode_topic(&Type::Int(64), &t), Ok(minus_one));

        let v = Value::Uint(U256::from(0xbb8), 24);
        let t = encode_topic(&Type::Uint(24), &v).unwrap();

        assert_eq!(
            t,
            topic("0000000000000000000000000000000000000000000000000000000000000bb8")
        );
        assert_eq!(decode_topic(&Type::Uint(24), &t), Ok(v));
    }

    #[test]
    fn address_topics() {
        let t = topic("000000000000000000000000a0b211418d87c9f5918e6213fec3b13290aa5f26");
        let addr = H160::from_str("a0b211418d87c9f5918e6213fec3b13290aa5f26").unwrap();

        assert_eq!(decode_topic(&Type::Address, &t), Ok(Value::Address(addr)));
        assert_eq!(encode_topic(&Type::Address, &Value::Address(addr)), Ok(t));
    }

    #[test]
    fn hashed_topics() {
        assert_eq!(
            encode_topic(&Type::String, &Value::String("abc".to_string())).unwrap(),
            topic("4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45")
        );
        assert_eq!(
            encode_topic(&Type::Bytes, &Value::Bytes(b"abc".to_vec())).unwrap(),
            topic("4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45")
        );

        // Array elements are padded in place, without a length prefix.
        let ty: Type = "uint8[]".parse().unwrap();
        let value = Value::Array(vec![
            Value::Uint(U256::from(1), 8),
            Value::Uint(U256::from(2), 8),
        ]);

        let mut preimage = [0u8; 64];
        preimage[31] = 1;
        preimage[63] = 2;

        assert_eq!(
            encode_topic(&ty, &value).unwrap(),
            H256::from(keccak256(&preimage))
        );

        // Nested strings are padded too.
        let ty: Type = "(string,bool)".parse().unwrap();
        let value = Value::Tuple(vec![Value::String("abc".to_string()), Value::Bool(true)]);

        let mut preimage = [0u8; 64];
        preimage[..3].copy_from_slice(b"abc");
        preimage[63] = 1;

        assert_eq!(
            encode_topic(&ty, &value).unwrap(),
            H256::from(keccak256(&preimage))
        );
    }

    #[test]
    fn hashed_topics_cannot_be_decoded() {
        assert!(matches!(
            decode_topic(&Type::String, &H256::zero()),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test]
    fn topic_type_mismatch() {
        assert!(matches!(
            encode_topic(&Type::Bool, &Value::Uint(U256::one(), 256)),
            Err(Error::Encode(_))
        ));
        assert!(matches!(
            encode_topic(&Type::String, &Value::Bytes(vec![])),
            Err(Error::Encode(_))
        ));
    }
}
