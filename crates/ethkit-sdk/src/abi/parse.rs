//! Human-readable type and signature parsing

use super::types::ParamType;
use crate::SdkError;

fn invalid(msg: impl Into<String>) -> SdkError {
    SdkError::InvalidArgument(msg.into())
}

/// Parse a Solidity type such as `uint256`, `bytes32[]` or `(address,uint8)[2]`
pub fn parse_type(s: &str) -> Result<ParamType, SdkError> {
    let s = s.trim();

    if let Some(body) = s.strip_suffix(']') {
        let open = body
            .rfind('[')
            .ok_or_else(|| invalid(format!("unbalanced brackets in {s:?}")))?;
        let inner = parse_type(&body[..open])?;
        let size = &body[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| invalid(format!("invalid array size in {s:?}")))?;
        return Ok(ParamType::FixedArray(Box::new(inner), size));
    }

    if let Some(body) = s.strip_prefix('(') {
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| invalid(format!("unbalanced parentheses in {s:?}")))?;
        let members = split_top_level(body)?
            .into_iter()
            .map(parse_type)
            .collect::<Result<_, _>>()?;
        return Ok(ParamType::Tuple(members));
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        "uint" => return Ok(ParamType::Uint(256)),
        "int" => return Ok(ParamType::Int(256)),
        _ => {}
    }

    if let Some(bits) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(parse_bits(s, bits)?));
    }
    if let Some(bits) = s.strip_prefix("int") {
        return Ok(ParamType::Int(parse_bits(s, bits)?));
    }
    if let Some(size) = s.strip_prefix("bytes") {
        let size: usize = size
            .parse()
            .map_err(|_| invalid(format!("unknown type {s:?}")))?;
        if !(1..=32).contains(&size) {
            return Err(invalid(format!("bytes size out of range in {s:?}")));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(invalid(format!("unknown type {s:?}")))
}

fn parse_bits(ty: &str, bits: &str) -> Result<usize, SdkError> {
    let bits: usize = bits
        .parse()
        .map_err(|_| invalid(format!("unknown type {ty:?}")))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(invalid(format!("invalid width in {ty:?}")));
    }
    Ok(bits)
}

/// A parameter from a human-readable signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedParam {
    pub kind: ParamType,
    pub indexed: bool,
    pub name: String,
}

/// Split `name(params) rest` into its parts
pub(crate) fn split_signature(sig: &str) -> Result<(&str, &str, &str), SdkError> {
    let sig = sig.trim();
    let open = sig
        .find('(')
        .ok_or_else(|| invalid(format!("missing '(' in {sig:?}")))?;
    let close = matching_paren(sig, open)?;
    let name = sig[..open].trim();
    let name = name.strip_prefix("function ").unwrap_or(name).trim();
    let name = name.strip_prefix("event ").unwrap_or(name).trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(invalid(format!("invalid name in {sig:?}")));
    }
    Ok((name, &sig[open + 1..close], sig[close + 1..].trim()))
}

/// Parse `type [indexed] [name], ...`
pub(crate) fn parse_params(list: &str) -> Result<Vec<ParsedParam>, SdkError> {
    split_top_level(list)?
        .into_iter()
        .map(|param| {
            let param = param.trim();
            // Tuple types can contain spaces only inside their parentheses
            let type_end = if param.starts_with('(') {
                let close = matching_paren(param, 0)?;
                param[close..]
                    .find(char::is_whitespace)
                    .map_or(param.len(), |i| close + i)
            } else {
                param.find(char::is_whitespace).unwrap_or(param.len())
            };
            let kind = parse_type(&param[..type_end])?;
            let mut indexed = false;
            let mut name = String::new();
            for word in param[type_end..].split_whitespace() {
                match word {
                    "indexed" if !indexed && name.is_empty() => indexed = true,
                    "memory" | "calldata" | "storage" => {}
                    w if name.is_empty() => name = w.to_string(),
                    _ => return Err(invalid(format!("unexpected tokens in {param:?}"))),
                }
            }
            Ok(ParsedParam {
                kind,
                indexed,
                name,
            })
        })
        .collect()
}

/// Parse `name(type,type)` into its name and parameter types
pub fn parse_signature(sig: &str) -> Result<(String, Vec<ParamType>), SdkError> {
    let (name, params, rest) = split_signature(sig)?;
    if !rest.is_empty() {
        return Err(invalid(format!("trailing input {rest:?} in signature")));
    }
    let params = parse_params(params)?.into_iter().map(|p| p.kind).collect();
    Ok((name.to_string(), params))
}

pub(crate) fn matching_paren(s: &str, open: usize) -> Result<usize, SdkError> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid(format!("unbalanced parentheses in {s:?}")))?;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(invalid(format!("unbalanced parentheses in {s:?}")))
}

/// Split on commas outside parentheses; empty input yields no parts
fn split_top_level(s: &str) -> Result<Vec<&str>, SdkError> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(invalid(format!("unbalanced parentheses in {s:?}")));
        }
    }
    if depth != 0 {
        return Err(invalid(format!("unbalanced parentheses in {s:?}")));
    }
    parts.push(s[start..].trim());
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid(format!("empty parameter in {s:?}")));
    }
    Ok(parts)
}
