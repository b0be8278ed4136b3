//! Unit conversion between wei and human-readable denominations

use crate::{PrimitiveError, U256};

/// Decimals of one ether
pub const ETHER_DECIMALS: u32 = 18;

/// Decimals of one gwei
pub const GWEI_DECIMALS: u32 = 9;

/// Wei in one gwei
pub const GWEI: u128 = 1_000_000_000;

/// Wei in one ether
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Render `value` base units with `decimals` fractional digits, trimming trailing zeros
pub fn format_units(value: U256, decimals: u32) -> String {
    let base = U256::exp10(decimals as usize);
    let whole = value / base;
    let frac = value % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Wei as ether, e.g. `1500000000000000000` -> `"1.5"`
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

/// Wei as gwei
pub fn format_gwei(wei: U256) -> String {
    format_units(wei, GWEI_DECIMALS)
}

/// Parse a non-negative decimal string into base units
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128, PrimitiveError> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(PrimitiveError::InvalidAmount(format!(
            "negative amount: {amount}"
        )));
    }
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(PrimitiveError::InvalidAmount("empty amount".to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(PrimitiveError::InvalidAmount(amount.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(PrimitiveError::InvalidAmount(format!(
            "{amount} has more than {decimals} decimal places"
        )));
    }

    let overflow = || PrimitiveError::InvalidAmount(format!("{amount} is too large"));
    let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = decimals as usize)
            .parse()
            .map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}

/// Parse an ether amount into wei
pub fn parse_ether(amount: &str) -> Result<u128, PrimitiveError> {
    parse_units(amount, ETHER_DECIMALS)
}

/// Parse a gwei amount into wei
pub fn parse_gwei(amount: &str) -> Result<u128, PrimitiveError> {
    parse_units(amount, GWEI_DECIMALS)
}
