//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The key refused to produce a signature
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// r or s is not a valid scalar
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Parity byte is neither 0 nor 1
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// No public key matches the signature and digest
    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),

    /// Bytes are not a valid secp256k1 secret scalar
    #[error("invalid private key")]
    InvalidPrivateKey,
}
