//! SDK error types

use std::time::Duration;

use ethkit_primitives::H256;
use thiserror::Error;

/// SDK error type
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// Node unreachable or request timed out
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Node rejected a request for a reason without a dedicated variant
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Nonce already used or superseded; rebuild with a fresh nonce
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// Sender cannot cover value plus gas
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Key or digest unusable for signing
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Bad input shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transaction mined with a reverted status
    #[error("Transaction {tx_hash} reverted")]
    Reverted {
        /// Reverted transaction
        tx_hash: H256,
    },

    /// No receipt before the confirmation deadline
    #[error("Timed out after {waited:?} waiting for receipt of {hash}")]
    Timeout {
        /// Transaction being awaited
        hash: H256,
        /// Time spent waiting
        waited: Duration,
    },

    /// Live log feed ended abnormally
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Payload did not match the expected ABI schema
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed node response
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdkError::Connectivity(_) | SdkError::Timeout { .. })
    }

    /// Map a JSON-RPC error from transaction submission onto a typed error
    pub fn from_rpc_rejection(code: i64, message: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("nonce too low")
            || lower.contains("already known")
            || lower.contains("replacement transaction underpriced")
            || lower.contains("nonce too high")
        {
            SdkError::NonceConflict(message)
        } else if lower.contains("insufficient funds") {
            SdkError::InsufficientFunds(message)
        } else {
            SdkError::Rpc { code, message }
        }
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidArgument(format!("invalid hex: {e}"))
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<ethkit_crypto::CryptoError> for SdkError {
    fn from(e: ethkit_crypto::CryptoError) -> Self {
        SdkError::Signing(e.to_string())
    }
}

impl From<ethkit_primitives::PrimitiveError> for SdkError {
    fn from(e: ethkit_primitives::PrimitiveError) -> Self {
        SdkError::InvalidArgument(e.to_string())
    }
}

impl From<ethkit_types::TxError> for SdkError {
    fn from(e: ethkit_types::TxError) -> Self {
        match e {
            ethkit_types::TxError::InvalidChainId(_) | ethkit_types::TxError::Crypto(_) => {
                SdkError::Signing(e.to_string())
            }
            other => SdkError::Decode(other.to_string()),
        }
    }
}
