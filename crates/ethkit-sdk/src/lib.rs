//! # ethkit-sdk
//!
//! Client library for Ethereum-compatible nodes.
//!
//! - **TransactionPipeline**: session nonces, fee pricing, EIP-155 signing,
//!   single-shot broadcast and receipt polling
//! - **EventSubscription**: historical logs followed by live ones, with explicit
//!   close and failure reporting
//! - **Contract**: ABI-driven binding with configurable query, submit and subscribe
//!   capabilities
//! - **Client**: JSON-RPC implementation of [`NodeFacade`]
//!
//! ## Sending a transfer
//!
//! ```rust,no_run
//! use ethkit_sdk::{Client, TransactionPipeline, TxRequest, Wallet};
//! use ethkit_primitives::{units, Address};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Client::connect("http://127.0.0.1:8545").await?;
//!     let wallet = Wallet::from_private_key_hex(&std::env::var("ETHKIT_PRIVATE_KEY")?)?;
//!     let mut pipeline = TransactionPipeline::new();
//!
//!     let to = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//!     let request = TxRequest::transfer(to, units::parse_ether("0.001")?);
//!     let receipt = pipeline.send_and_confirm(&node, &wallet, request).await?;
//!     println!("mined in block {}", receipt.block_number);
//!     Ok(())
//! }
//! ```
//!
//! ## Watching a contract
//!
//! ```rust,no_run
//! use ethkit_sdk::{contract, Client};
//! use ethkit_primitives::Address;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Client::connect("http://127.0.0.1:8545").await?;
//!     let counter = contract::counter(Address::from_hex("0x5FbDB2315678afecb367f032d93F642f64180aa3")?)?;
//!
//!     let mut events = counter.subscribe(&node, "CountIncremented", Some(0)).await?;
//!     while let Some(event) = events.next().await {
//!         println!("count is now {:?} (block {})", event.event, event.log.block_number);
//!     }
//!     if let Some(err) = events.error() {
//!         eprintln!("subscription failed: {err}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod abi;
mod client;
mod config;
pub mod contract;
mod error;
mod node;
mod pipeline;
pub mod subscription;
mod transport;
pub mod types;
mod wallet;
mod wire;

pub use client::Client;
pub use config::PipelineConfig;
pub use contract::{Capabilities, Contract, TxOptions};
pub use error::SdkError;
pub use node::{LogFeed, NodeFacade};
pub use pipeline::{ensure_success, TransactionPipeline};
pub use subscription::{CloseHandle, EventDecoder, EventSubscription, LogEvent, SubscriptionState};
pub use transport::{MockTransport, Transport};
pub use types::{BlockId, CallRequest, Deployment, TxRequest};
pub use wallet::Wallet;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

pub use ethkit_primitives::{Address, H256, U256};
pub use ethkit_types::{BlockHeader, LegacyTx, Log, LogFilter, Receipt, SignedTransaction, TxStatus};
