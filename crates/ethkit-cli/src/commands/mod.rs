//! Subcommands and the state they share

pub mod counter;
pub mod query;
pub mod transfer;

use ethkit_crypto::to_checksum_address;
use ethkit_primitives::{units, Address, U256};
use ethkit_sdk::{Client, NodeFacade, TransactionPipeline, Wallet};
use tracing::debug;

use crate::{CliError, Config};

/// Resolved configuration plus global flags
pub struct Session {
    pub config: Config,
    pub json: bool,
    key: Option<String>,
}

impl Session {
    pub fn new(config: Config, json: bool, key: Option<String>) -> Self {
        Self { config, json, key }
    }

    /// Connect and check the chain id against the configured one, if any
    pub async fn connect(&self) -> Result<Client, CliError> {
        let client = Client::connect_with_config(&self.config.rpc_url, &self.config.pipeline).await?;
        let node = client.chain_id().await?;
        if let Some(configured) = self.config.chain_id {
            if configured != node {
                return Err(CliError::ChainMismatch { configured, node });
            }
        }
        debug!(rpc_url = %self.config.rpc_url, chain_id = node, "session connected");
        Ok(client)
    }

    pub fn wallet(&self) -> Result<Wallet, CliError> {
        let key = self.key.as_deref().ok_or(CliError::MissingKey)?;
        Wallet::from_private_key_hex(key).map_err(|e| CliError::InvalidKey(e.to_string()))
    }

    pub fn pipeline(&self) -> TransactionPipeline {
        TransactionPipeline::with_config(self.config.pipeline.clone())
    }
}

pub fn parse_address(s: &str) -> Result<Address, CliError> {
    Address::from_hex(s).map_err(|e| CliError::InvalidAddress(format!("{s}: {e}")))
}

/// EIP-55 form
pub fn display_address(address: &Address) -> String {
    to_checksum_address(address)
}

pub fn ether(wei: u128) -> String {
    units::format_ether(U256::from(wei))
}
