//! ABI encoding

use ethkit_crypto::keccak256;
use ethkit_primitives::{H256, U256};

use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode `tokens` as a tuple, inferring each type from its value
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let types: Vec<ParamType> = tokens.iter().map(Token::type_of).collect();
    encode_tuple(&types, tokens)
}

/// Encode `tokens` against declared `types`
pub fn encode_params(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::InvalidArgument(format!(
            "expected {} arguments, got {}",
            types.len(),
            tokens.len()
        )));
    }
    for (i, (kind, token)) in types.iter().zip(tokens).enumerate() {
        if !kind.accepts(token) {
            return Err(SdkError::InvalidArgument(format!(
                "argument {i}: {token:?} is not a valid {kind}"
            )));
        }
    }
    Ok(encode_tuple(types, tokens))
}

/// Selector followed by the encoded arguments
pub fn encode_function_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode(tokens));
    out
}

/// First four bytes of the keccak hash of a canonical signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

/// topic0 of an event: keccak hash of its canonical signature
pub fn event_topic(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}

fn encode_tuple(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = types.iter().map(ParamType::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (kind, token) in types.iter().zip(tokens) {
        if kind.is_dynamic() {
            head.extend_from_slice(&word(U256::from(head_len + tail.len())));
            tail.extend(encode_token(kind, token));
        } else {
            head.extend(encode_token(kind, token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(kind: &ParamType, token: &Token) -> Vec<u8> {
    match (kind, token) {
        (_, Token::Address(address)) => address.into_word().as_bytes().to_vec(),
        (_, Token::Uint(value)) => word(*value).to_vec(),
        (_, Token::Int(value)) => value.to_word().to_vec(),
        (_, Token::Bool(b)) => word(U256::from(u8::from(*b))).to_vec(),
        (_, Token::FixedBytes(data)) => {
            let mut buf = [0u8; 32];
            let len = data.len().min(32);
            buf[..len].copy_from_slice(&data[..len]);
            buf.to_vec()
        }
        (_, Token::Bytes(data)) => encode_bytes(data),
        (_, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items)) => {
            let mut out = word(U256::from(items.len())).to_vec();
            out.extend(encode_tuple(&vec![(**inner).clone(); items.len()], items));
            out
        }
        (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => {
            encode_tuple(&vec![(**inner).clone(); items.len()], items)
        }
        (ParamType::Tuple(types), Token::Tuple(items)) => encode_tuple(types, items),
        // Inferred types always line up; declared types are checked by `encode_params`
        (_, Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items)) => {
            let types: Vec<ParamType> = items.iter().map(Token::type_of).collect();
            encode_tuple(&types, items)
        }
    }
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = word(U256::from(data.len())).to_vec();
    out.extend_from_slice(data);
    out.resize(32 + data.len().div_ceil(32) * 32, 0);
    out
}

fn word(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}
