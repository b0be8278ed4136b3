//! # ethkit-primitives
//!
//! Primitive types shared by every ethkit crate.
//!
//! - [`Address`] and [`H256`] fixed-width byte strings with hex parsing
//! - [`U256`] re-exported from `primitive-types`
//! - [`units`] for converting between wei, gwei and ether

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod fixed;
pub mod units;

pub use error::PrimitiveError;
pub use fixed::{Address, H256};

pub use primitive_types::U256;

/// Block number
pub type BlockNumber = u64;

/// Account nonce
pub type Nonce = u64;

/// Gas amount
pub type Gas = u64;
