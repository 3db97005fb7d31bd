/// Errors produced while parsing descriptors or encoding/decoding ABI data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed type text or interface descriptor.
    #[error("parse error: {0}")]
    Parse(String),

    /// Argument count or value/type mismatch while encoding.
    #[error("encode error: {0}")]
    Encode(String),

    /// Truncated buffer, out of bounds offset, length overrun or a value
    /// that does not fit its declared type.
    #[error("decode error: {0}")]
    Decode(String),

    /// The payload or log does not belong to the function, error or event it
    /// is being decoded with. Selectors are hex encoded.
    #[error("selector {found} does not match expected selector {expected}")]
    SelectorMismatch { expected: String, found: String },

    /// Topic encoding or decoding of a kind that cannot be represented in a
    /// topic slot.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn encode(msg: impl Into<String>) -> Self {
        Error::Encode(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    pub(crate) fn selector_mismatch(expected: &[u8], found: &[u8]) -> Self {
        Error::SelectorMismatch {
            expected: format!("0x{}", hex::encode(expected)),
            found: format!("0x{}", hex::encode(found)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::Decode(err.to_string())
    }
}
