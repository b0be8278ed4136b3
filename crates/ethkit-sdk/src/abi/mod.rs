//! Solidity ABI codec
//!
//! ```rust
//! use ethkit_sdk::abi::{decode, FunctionDef, ParamType, Token};
//!
//! let set = FunctionDef::parse("setCount(uint256)").unwrap();
//! let data = set.encode_input(&[Token::uint(7u64)]).unwrap();
//! assert_eq!(&data[..4], &set.selector());
//!
//! let values = decode(&[ParamType::Uint(256)], &data[4..]).unwrap();
//! assert_eq!(values, vec![Token::uint(7u64)]);
//! ```

mod decode;
mod encode;
mod item;
mod json;
mod parse;
mod types;

pub use decode::decode;
pub use encode::{encode, encode_function_call, encode_params, event_topic, function_selector};
pub use item::{EventDef, EventParam, FunctionDef, StateMutability};
pub use json::Abi;
pub use parse::{parse_signature, parse_type};
pub use types::{ParamType, Token, I256};
