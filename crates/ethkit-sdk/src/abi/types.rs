//! ABI value and type model

use std::fmt;

use ethkit_primitives::{Address, H256, U256};

/// A single ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    /// Unsigned integer of any width up to 256 bits
    Uint(U256),
    /// Signed integer of any width up to 256 bits
    Int(I256),
    Bool(bool),
    /// Dynamic `bytes`
    Bytes(Vec<u8>),
    /// `bytesN`, 1..=32
    FixedBytes(Vec<u8>),
    String(String),
    /// `T[]`
    Array(Vec<Token>),
    /// `T[N]`
    FixedArray(Vec<Token>),
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer as sign and magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256 {
    pub abs: U256,
    pub negative: bool,
}

impl I256 {
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Two's complement word
    pub(crate) fn to_word(self) -> [u8; 32] {
        let mut word = [0u8; 32];
        let value = if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        };
        value.to_big_endian(&mut word);
        word
    }

    pub(crate) fn from_word(word: &[u8]) -> Self {
        let raw = U256::from_big_endian(word);
        if word[0] & 0x80 == 0 {
            return Self::new(raw, false);
        }
        Self::new((!raw).overflowing_add(U256::one()).0, true)
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}", self.abs)
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// `uintN`
    Uint(usize),
    /// `intN`
    Int(usize),
    Bool,
    Bytes,
    /// `bytesN`
    FixedBytes(usize),
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Whether the value lives in the tail of an encoding
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes occupied in the head of an enclosing encoding
    pub(crate) fn head_len(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            ParamType::FixedArray(inner, size) => inner.head_len() * size,
            ParamType::Tuple(types) => types.iter().map(ParamType::head_len).sum(),
            _ => 32,
        }
    }

    /// Whether `token` is a value of this type
    pub fn accepts(&self, token: &Token) -> bool {
        match (self, token) {
            (ParamType::Address, Token::Address(_))
            | (ParamType::Bool, Token::Bool(_))
            | (ParamType::Bytes, Token::Bytes(_))
            | (ParamType::String, Token::String(_)) => true,
            (ParamType::Uint(bits), Token::Uint(v)) => *bits == 256 || v.bits() <= *bits,
            (ParamType::Int(_), Token::Int(_)) => true,
            (ParamType::FixedBytes(size), Token::FixedBytes(b)) => b.len() <= *size,
            (ParamType::Array(inner), Token::Array(items)) => items.iter().all(|t| inner.accepts(t)),
            (ParamType::FixedArray(inner, size), Token::FixedArray(items)) => {
                items.len() == *size && items.iter().all(|t| inner.accepts(t))
            }
            (ParamType::Tuple(types), Token::Tuple(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(t, v)| t.accepts(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    /// Canonical name as used in signatures
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Uint(bits) => write!(f, "uint{bits}"),
            ParamType::Int(bits) => write!(f, "int{bits}"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{size}"),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{inner}[]"),
            ParamType::FixedArray(inner, size) => write!(f, "{inner}[{size}]"),
            ParamType::Tuple(types) => {
                f.write_str("(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl Token {
    pub fn uint(value: impl Into<U256>) -> Self {
        Token::Uint(value.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Token::String(s.into())
    }

    pub fn bytes32(data: H256) -> Self {
        Token::FixedBytes(data.as_bytes().to_vec())
    }

    /// Type inferred from the value. Empty arrays default to `uint256[]`.
    pub fn type_of(&self) -> ParamType {
        match self {
            Token::Address(_) => ParamType::Address,
            Token::Uint(_) => ParamType::Uint(256),
            Token::Int(_) => ParamType::Int(256),
            Token::Bool(_) => ParamType::Bool,
            Token::Bytes(_) => ParamType::Bytes,
            Token::FixedBytes(b) => ParamType::FixedBytes(b.len()),
            Token::String(_) => ParamType::String,
            Token::Array(tokens) => ParamType::Array(Box::new(
                tokens.first().map_or(ParamType::Uint(256), Token::type_of),
            )),
            Token::FixedArray(tokens) => ParamType::FixedArray(
                Box::new(tokens.first().map_or(ParamType::Uint(256), Token::type_of)),
                tokens.len(),
            ),
            Token::Tuple(tokens) => ParamType::Tuple(tokens.iter().map(Token::type_of).collect()),
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}
