//! CLI error types

use ethkit_sdk::SdkError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// No key given on the command line or in the environment
    #[error("No private key: pass --key or set ETHKIT_PRIVATE_KEY")]
    MissingKey,

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configured chain id differs from the node's
    #[error("Chain id mismatch: configured {configured}, node reports {node}")]
    ChainMismatch { configured: u64, node: u64 },

    /// Balance too low for the planned transaction
    #[error("Insufficient balance: have {have} ETH, need at least {need} ETH")]
    InsufficientBalance { have: String, need: String },

    /// Block or receipt the node does not know
    #[error("Not found: {0}")]
    NotFound(String),

    /// SDK error
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Background task died
    #[error("Task failed: {0}")]
    Task(String),
}
