//! EIP-55 mixed-case address checksums

use ethkit_primitives::Address;

use crate::keccak256;

/// Format an address with EIP-55 mixed-case checksum
pub fn to_checksum_address(address: &Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash.as_bytes()[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// True when `s` parses as an address and its casing matches the checksum.
///
/// All-lowercase and all-uppercase inputs carry no checksum and are accepted.
pub fn is_valid_checksum(s: &str) -> bool {
    let Ok(address) = Address::from_hex(s) else {
        return false;
    };
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits == digits.to_lowercase() || digits == digits.to_uppercase() {
        return true;
    }
    to_checksum_address(&address)[2..] == *digits
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTORS: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_checksum_vectors() {
        for expected in VECTORS {
            let address = Address::from_hex(expected).unwrap();
            assert_eq!(to_checksum_address(&address), expected);
            assert!(is_valid_checksum(expected));
        }
    }

    #[test]
    fn test_checksum_detects_case_flip() {
        assert!(!is_valid_checksum("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn test_uniform_case_is_accepted() {
        assert!(is_valid_checksum("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_valid_checksum("0x1234"));
    }
}
