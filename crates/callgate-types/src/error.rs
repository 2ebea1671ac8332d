use thiserror::Error;

/// Errors from parsing textual identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors from the head/tail wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("read past end of input: offset {offset}, input length {len}")]
    OutOfBounds { offset: usize, len: usize },

    #[error("address word has non-zero padding")]
    InvalidAddress,

    #[error("bool word is neither 0 nor 1")]
    InvalidBool,

    #[error("bytes4 word has non-zero padding")]
    InvalidBytes4,

    #[error("uint256 value exceeds the supported 128-bit range")]
    UintOverflow,

    #[error("offset or length does not fit in memory: {0}")]
    InvalidOffset(String),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("token does not match expected type {expected}")]
    TypeMismatch { expected: String },
}
