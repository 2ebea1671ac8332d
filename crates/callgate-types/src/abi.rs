//! Head/tail wire codec for call arguments and results.
//!
//! Every value occupies one 32-byte head word. Static values are stored in
//! the head directly; dynamic values (`bytes`, `string`, arrays) store an
//! offset in the head that points at a length-prefixed tail. Offsets are
//! relative to the start of the enclosing tuple or array body.
//!
//! Decoding validates padding, offsets and lengths against the input and
//! never allocates more elements than the input could hold.

use crate::address::Address;
use crate::error::AbiError;
use crate::selector::Selector;

/// Width of one head word.
pub const WORD: usize = 32;

/// Type of a single encoded value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bytes4,
    Bool,
    /// `uint256`, restricted to the 128-bit range on decode.
    Uint,
    Bytes,
    String,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamType::Bytes | ParamType::String | ParamType::Array(_)
        )
    }

    /// Canonical type name as used in signatures.
    pub fn name(&self) -> String {
        match self {
            ParamType::Address => "address".into(),
            ParamType::Bytes4 => "bytes4".into(),
            ParamType::Bool => "bool".into(),
            ParamType::Uint => "uint256".into(),
            ParamType::Bytes => "bytes".into(),
            ParamType::String => "string".into(),
            ParamType::Array(inner) => format!("{}[]", inner.name()),
        }
    }
}

/// A decoded (or to-be-encoded) value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Bytes4(Selector),
    Bool(bool),
    Uint(u128),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Token::Bytes(_) | Token::String(_) | Token::Array(_))
    }

    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Token::Address(a) => Ok(a),
            _ => Err(mismatch(ParamType::Address)),
        }
    }

    pub fn into_bytes4(self) -> Result<Selector, AbiError> {
        match self {
            Token::Bytes4(s) => Ok(s),
            _ => Err(mismatch(ParamType::Bytes4)),
        }
    }

    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Token::Bool(b) => Ok(b),
            _ => Err(mismatch(ParamType::Bool)),
        }
    }

    pub fn into_uint(self) -> Result<u128, AbiError> {
        match self {
            Token::Uint(v) => Ok(v),
            _ => Err(mismatch(ParamType::Uint)),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, AbiError> {
        match self {
            Token::Bytes(b) => Ok(b),
            _ => Err(mismatch(ParamType::Bytes)),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(s) => Ok(s),
            _ => Err(mismatch(ParamType::String)),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Array(items) => Ok(items),
            _ => Err(AbiError::TypeMismatch {
                expected: "array".into(),
            }),
        }
    }
}

fn mismatch(expected: ParamType) -> AbiError {
    AbiError::TypeMismatch {
        expected: expected.name(),
    }
}

/// Encode a tuple of tokens.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = WORD * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            encode_tail(token, &mut tail);
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Encode a full call payload: selector followed by the encoded arguments.
pub fn encode_call(selector: Selector, tokens: &[Token]) -> Vec<u8> {
    selector.with_args(&encode(tokens))
}

/// Decode a tuple of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| decode_param(ty, data, i * WORD))
        .collect()
}

fn static_word(token: &Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
        Token::Bytes4(s) => word[..4].copy_from_slice(s.as_bytes()),
        Token::Bool(b) => word[31] = u8::from(*b),
        Token::Uint(v) => word[16..].copy_from_slice(&v.to_be_bytes()),
        // Dynamic tokens never reach the head as values.
        Token::Bytes(_) | Token::String(_) | Token::Array(_) => {}
    }
    word
}

fn encode_tail(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Bytes(bytes) => encode_padded(bytes, out),
        Token::String(s) => encode_padded(s.as_bytes(), out),
        Token::Array(items) => {
            out.extend_from_slice(&usize_word(items.len()));
            out.extend_from_slice(&encode(items));
        }
        _ => out.extend_from_slice(&static_word(token)),
    }
}

fn encode_padded(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    let rem = bytes.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + (WORD - rem), 0);
    }
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .and_then(|slice| <[u8; WORD]>::try_from(slice).ok())
        .ok_or(AbiError::OutOfBounds {
            offset,
            len: data.len(),
        })
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, AbiError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidOffset(hex::encode(word)));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| AbiError::InvalidOffset(hex::encode(word)))
}

fn decode_param(ty: &ParamType, base: &[u8], head_offset: usize) -> Result<Token, AbiError> {
    let head = read_word(base, head_offset)?;

    match ty {
        ParamType::Address => {
            if head[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidAddress);
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&head[12..]);
            Ok(Token::Address(Address::new(bytes)))
        }
        ParamType::Bytes4 => {
            if head[4..].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidBytes4);
            }
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&head[..4]);
            Ok(Token::Bytes4(Selector::new(bytes)))
        }
        ParamType::Bool => {
            if head[..31].iter().any(|b| *b != 0) || head[31] > 1 {
                return Err(AbiError::InvalidBool);
            }
            Ok(Token::Bool(head[31] == 1))
        }
        ParamType::Uint => {
            if head[..16].iter().any(|b| *b != 0) {
                return Err(AbiError::UintOverflow);
            }
            let mut low = [0u8; 16];
            low.copy_from_slice(&head[16..]);
            Ok(Token::Uint(u128::from_be_bytes(low)))
        }
        ParamType::Bytes | ParamType::String => {
            let offset = word_to_usize(&head)?;
            let len = word_to_usize(&read_word(base, offset)?)?;
            let start = offset + WORD;
            let bytes = start
                .checked_add(len)
                .and_then(|end| base.get(start..end))
                .ok_or(AbiError::OutOfBounds {
                    offset: start,
                    len: base.len(),
                })?
                .to_vec();

            if *ty == ParamType::String {
                String::from_utf8(bytes)
                    .map(Token::String)
                    .map_err(|_| AbiError::InvalidUtf8)
            } else {
                Ok(Token::Bytes(bytes))
            }
        }
        ParamType::Array(inner) => {
            let offset = word_to_usize(&head)?;
            let len = word_to_usize(&read_word(base, offset)?)?;
            let start = offset + WORD;
            let body = base.get(start..).ok_or(AbiError::OutOfBounds {
                offset: start,
                len: base.len(),
            })?;

            // Every element owns at least one head word in the body.
            if len > body.len() / WORD {
                return Err(AbiError::OutOfBounds {
                    offset: start,
                    len: base.len(),
                });
            }

            let items = (0..len)
                .map(|i| decode_param(inner, body, i * WORD))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Token::Array(items))
        }
    }
}
