//! ABI decoding

use ethkit_primitives::{Address, U256};

use super::types::{ParamType, Token, I256};
use crate::SdkError;

/// Decode `data` as a tuple of `types`
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_tuple(types, data, 0)
}

/// Decode words in `data` laid out as a tuple starting at `base`.
/// Dynamic offsets are relative to `base`.
fn decode_tuple(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, SdkError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;

    for kind in types {
        let token = if kind.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            decode_at(kind, data, checked_add(base, offset)?)?
        } else {
            decode_at(kind, data, cursor)?
        };
        tokens.push(token);
        cursor = checked_add(cursor, kind.head_len())?;
    }

    Ok(tokens)
}

/// Decode one value whose encoding begins at `at`
fn decode_at(kind: &ParamType, data: &[u8], at: usize) -> Result<Token, SdkError> {
    match kind {
        ParamType::Address => {
            let w = read_word(data, at)?;
            if w[..12].iter().any(|b| *b != 0) {
                return Err(SdkError::Decode("address word has dirty high bytes".to_string()));
            }
            Ok(Token::Address(Address::from_slice(&w[12..])?))
        }
        ParamType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, at)?);
            if value.bits() > *bits {
                return Err(SdkError::Decode(format!("value exceeds uint{bits}")));
            }
            Ok(Token::Uint(value))
        }
        ParamType::Int(_) => Ok(Token::Int(I256::from_word(read_word(data, at)?))),
        ParamType::Bool => {
            let value = U256::from_big_endian(read_word(data, at)?);
            match value.low_u64() {
                0 if value.is_zero() => Ok(Token::Bool(false)),
                1 if value.bits() == 1 => Ok(Token::Bool(true)),
                _ => Err(SdkError::Decode("invalid bool word".to_string())),
            }
        }
        ParamType::FixedBytes(size) => {
            if *size == 0 || *size > 32 {
                return Err(SdkError::Decode(format!("invalid bytes{size}")));
            }
            Ok(Token::FixedBytes(read_word(data, at)?[..*size].to_vec()))
        }
        ParamType::Bytes => Ok(Token::Bytes(read_bytes(data, at)?.to_vec())),
        ParamType::String => {
            let bytes = read_bytes(data, at)?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| SdkError::Decode(format!("invalid utf-8 string: {e}")))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = checked_add(at, 32)?;
            // Each element needs at least one head word
            if len > data.len().saturating_sub(start) / 32 {
                return Err(SdkError::Decode(format!("array length {len} exceeds data")));
            }
            let types = vec![(**inner).clone(); len];
            decode_tuple(&types, data, start).map(Token::Array)
        }
        ParamType::FixedArray(inner, size) => {
            let types = vec![(**inner).clone(); *size];
            decode_tuple(&types, data, at).map(Token::FixedArray)
        }
        ParamType::Tuple(types) => decode_tuple(types, data, at).map(Token::Tuple),
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], SdkError> {
    let end = checked_add(at, 32)?;
    data.get(at..end).ok_or_else(|| {
        SdkError::Decode(format!(
            "need {} bytes, have {}",
            end,
            data.len()
        ))
    })
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(u32::MAX) {
        return Err(SdkError::Decode(format!("offset or length {value} out of range")));
    }
    Ok(value.low_u64() as usize)
}

fn read_bytes(data: &[u8], at: usize) -> Result<&[u8], SdkError> {
    let len = read_usize(data, at)?;
    let start = checked_add(at, 32)?;
    let end = checked_add(start, len)?;
    data.get(start..end)
        .ok_or_else(|| SdkError::Decode(format!("bytes of length {len} run past the data")))
}

fn checked_add(a: usize, b: usize) -> Result<usize, SdkError> {
    a.checked_add(b)
        .ok_or_else(|| SdkError::Decode("offset overflow".to_string()))
}
