//! Transaction encoding errors

use ethkit_crypto::CryptoError;
use thiserror::Error;

/// Error while encoding, decoding or verifying a transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// Malformed RLP
    #[error("rlp decode error: {0}")]
    Rlp(String),

    /// A field decoded but holds an unusable value
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Typed (EIP-2718) envelope, not a legacy list
    #[error("unsupported transaction type 0x{0:02x}")]
    UnsupportedType(u8),

    /// Chain id 0 cannot be bound into a signature
    #[error("invalid chain id: {0}")]
    InvalidChainId(u64),

    /// Signature was made for another chain
    #[error("chain id mismatch: expected {expected}, signature is for {actual:?}")]
    ChainIdMismatch {
        /// Chain the caller verifies against
        expected: u64,
        /// Chain encoded in v, `None` for pre-EIP-155 signatures
        actual: Option<u64>,
    },

    /// Signature recovery failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<rlp::DecoderError> for TxError {
    fn from(e: rlp::DecoderError) -> Self {
        TxError::Rlp(e.to_string())
    }
}
