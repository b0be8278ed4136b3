//! Fixed-width byte strings: 20-byte addresses and 32-byte hashes

use std::fmt;
use std::str::FromStr;

use crate::PrimitiveError;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Width in bytes
            pub const LEN: usize = $len;

            /// All-zero value
            pub const ZERO: $name = $name([0u8; $len]);

            /// Wrap a byte array
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            /// Copy from a slice of exactly `LEN` bytes
            pub fn from_slice(slice: &[u8]) -> Result<Self, PrimitiveError> {
                let bytes: [u8; $len] = slice.try_into().map_err(|_| {
                    PrimitiveError::InvalidLength {
                        kind: $label,
                        expected: $len,
                        got: slice.len(),
                    }
                })?;
                Ok($name(bytes))
            }

            /// Parse a hex string, with or without the `0x` prefix
            pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(digits)
                    .map_err(|e| PrimitiveError::InvalidHex(format!("{}: {}", $label, e)))?;
                Self::from_slice(&bytes)
            }

            /// Borrow the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Take the raw bytes
            pub fn into_bytes(self) -> [u8; $len] {
                self.0
            }

            /// True for the all-zero value
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Lowercase hex with `0x` prefix
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = PrimitiveError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        #[cfg(feature = "rlp")]
        impl rlp::Encodable for $name {
            fn rlp_append(&self, s: &mut rlp::RlpStream) {
                s.encoder().encode_value(&self.0);
            }
        }

        #[cfg(feature = "rlp")]
        impl rlp::Decodable for $name {
            fn decode(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
                rlp.decoder().decode_value(|bytes| {
                    bytes
                        .try_into()
                        .map($name)
                        .map_err(|_| rlp::DecoderError::RlpInvalidLength)
                })
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// Ethereum account or contract address (20 bytes)
    Address,
    20,
    "address"
);

fixed_bytes!(
    /// 256-bit hash: transaction ids, block hashes, log topics
    H256,
    32,
    "hash"
);

impl Address {
    /// Left-pad into a 32-byte word, as used for indexed log topics
    pub fn into_word(self) -> H256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        H256(word)
    }
}

impl H256 {
    /// Interpret the hash as a big-endian 256-bit integer
    pub fn to_u256(&self) -> crate::U256 {
        crate::U256::from_big_endian(&self.0)
    }

    /// Big-endian word of a 256-bit integer
    pub fn from_u256(value: crate::U256) -> Self {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        H256(word)
    }
}
