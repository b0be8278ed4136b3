//! Parse errors for primitive types

use thiserror::Error;

/// Error raised while parsing addresses, hashes or amounts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Input is not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Decoded bytes have the wrong width
    #[error("invalid {kind} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// What was being parsed
        kind: &'static str,
        /// Required width
        expected: usize,
        /// Actual width
        got: usize,
    },

    /// Decimal amount could not be converted to base units
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
