//! # ethkit-crypto
//!
//! Cryptographic primitives used by ethkit.
//!
//! - Keccak-256 hashing
//! - Recoverable ECDSA over secp256k1 with low-s normalization
//! - Public key recovery and address derivation
//! - EIP-55 checksummed address formatting

#![warn(missing_docs)]
#![warn(clippy::all)]

mod checksum;
mod error;
mod hash;
mod signature;

pub use checksum::{is_valid_checksum, to_checksum_address};
pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, verify, PrivateKey,
    PublicKey, Signature,
};
