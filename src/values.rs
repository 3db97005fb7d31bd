use ethereum_types::{H160, U256};

/// ABI value tree, mirroring the shape of [`crate::Type`].
///
/// Integers carry their declared bit width. Signed integers are stored in
/// their 256 bit two's complement form.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Uint(U256, usize),
    Int(U256, usize),
    Address(H160),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    FixedArray(Vec<Value>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Builds an `Int` value from a native signed integer.
    pub fn from_i128(v: i128, size: usize) -> Value {
        let uint = if v < 0 {
            !U256::from(!(v as u128))
        } else {
            U256::from(v as u128)
        };

        Value::Int(uint, size)
    }

    /// Returns a signed integer value as a native integer, if it fits.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v, _) if is_negative(*v) => {
                let magnitude = !*v;
                if magnitude.bits() > 127 {
                    return None;
                }

                Some(!(magnitude.low_u128() as i128))
            }
            Value::Int(v, _) if v.bits() <= 127 => Some(v.low_u128() as i128),
            _ => None,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Uint(_, _) => "uint",
            Value::Int(_, _) => "int",
            Value::Address(_) => "address",
            Value::Bool(_) => "bool",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::FixedArray(_) => "fixed array",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }
}

fn is_negative(v: U256) -> bool {
    v.bit(255)
}

/// Whether `v`, read as a 256 bit two's complement integer, fits in a signed
/// integer of `bits` bits.
pub(crate) fn int_fits(v: U256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }

    // Every bit from the sign bit upwards must be equal.
    let high = v >> (bits - 1);

    high.is_zero() || high == U256::MAX >> (bits - 1)
}

/// Whether `v` fits in an unsigned integer of `bits` bits.
pub(crate) fn uint_fits(v: U256, bits: usize) -> bool {
    v.bits() <= bits
}
