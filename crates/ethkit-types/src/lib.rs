//! # ethkit-types
//!
//! Chain data types used by ethkit:
//! - [`LegacyTx`] and [`SignedTransaction`] with EIP-155 signing digests and RLP wire encoding
//! - [`Receipt`] with terminal [`TxStatus`]
//! - [`Log`] and [`LogFilter`]
//! - [`BlockHeader`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod error;
mod log;
mod receipt;
mod transaction;

pub use block::BlockHeader;
pub use error::TxError;
pub use log::{Log, LogFilter};
pub use receipt::{Receipt, TxStatus};
pub use transaction::{
    contract_address, LegacyTx, SignedTransaction, TxSignature, INTRINSIC_GAS,
};
