//! Query commands

use clap::Subcommand;
use ethkit_primitives::{units, H256};
use ethkit_sdk::types::BlockId;
use ethkit_sdk::NodeFacade;

use super::{display_address, parse_address, Session};
use crate::{output::Output, CliError};

/// Query subcommands
#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Block header
    Block {
        /// Block number, "latest", "pending", "earliest", "safe" or "finalized"
        #[arg(default_value = "latest")]
        block: String,
    },
    /// Account balance
    Balance {
        /// Account address
        address: String,
        /// Block to read at
        #[arg(long, default_value = "latest")]
        block: String,
    },
    /// Transaction receipt
    Receipt {
        /// Transaction hash
        hash: String,
    },
    /// Chain id
    ChainId,
    /// Suggested gas price
    GasPrice,
    /// Latest block number
    BlockNumber,
}

pub fn parse_block(block: &str) -> Result<BlockId, CliError> {
    Ok(match block {
        "latest" => BlockId::Latest,
        "pending" => BlockId::Pending,
        "earliest" => BlockId::Earliest,
        "safe" => BlockId::Safe,
        "finalized" => BlockId::Finalized,
        n => BlockId::Number(
            n.parse::<u64>()
                .map_err(|_| CliError::InvalidInput(format!("invalid block: {n}")))?,
        ),
    })
}

impl QueryCommand {
    pub async fn execute(self, session: &Session) -> Result<(), CliError> {
        // Validate arguments before touching the network
        match self {
            QueryCommand::Block { block } => {
                let block = parse_block(&block)?;
                query_block(session, block).await
            }
            QueryCommand::Balance { address, block } => {
                let address = parse_address(&address)?;
                let block = parse_block(&block)?;
                let node = session.connect().await?;
                let balance = node.get_balance(&address, block).await?;
                let formatted = units::format_ether(balance);
                Output::new(session.json)
                    .field("address", &display_address(&address))
                    .field("balance_wei", &balance.to_string())
                    .field("balance_ether", &formatted)
                    .message(&format!("{}: {formatted} ETH", display_address(&address)))
                    .print();
                Ok(())
            }
            QueryCommand::Receipt { hash } => {
                let hash = H256::from_hex(&hash)
                    .map_err(|e| CliError::InvalidInput(format!("transaction hash: {e}")))?;
                query_receipt(session, hash).await
            }
            QueryCommand::ChainId => {
                let chain_id = session.connect().await?.chain_id().await?;
                Output::new(session.json)
                    .field_u64("chain_id", chain_id)
                    .message(&format!("Chain ID: {chain_id}"))
                    .print();
                Ok(())
            }
            QueryCommand::GasPrice => {
                let price = session.connect().await?.gas_price().await?;
                let gwei = units::format_gwei(price.into());
                Output::new(session.json)
                    .field_u128("gas_price_wei", price)
                    .field("gas_price_gwei", &gwei)
                    .message(&format!("Gas Price: {gwei} gwei ({price} wei)"))
                    .print();
                Ok(())
            }
            QueryCommand::BlockNumber => {
                let number = session.connect().await?.block_number().await?;
                Output::new(session.json)
                    .field_u64("block_number", number)
                    .message(&format!("Block Number: {number}"))
                    .print();
                Ok(())
            }
        }
    }
}

async fn query_block(session: &Session, block: BlockId) -> Result<(), CliError> {
    let node = session.connect().await?;
    let header = node
        .get_block_header(block)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("block {block}")))?;

    Output::new(session.json)
        .field_u64("number", header.number)
        .field("hash", &header.hash.to_hex())
        .field("parent_hash", &header.parent_hash.to_hex())
        .field_u64("timestamp", header.timestamp)
        .field("difficulty", &header.difficulty.to_string())
        .field_u64("gas_limit", header.gas_limit)
        .field_u64("gas_used", header.gas_used)
        .field_u64("transactions", header.transaction_count as u64)
        .field("miner", &display_address(&header.miner))
        .message(&format!(
            "Block {}\n  Hash:         {}\n  Parent:       {}\n  Timestamp:    {}\n  Difficulty:   {}\n  Gas:          {} / {}\n  Transactions: {}\n  Miner:        {}",
            header.number,
            header.hash,
            header.parent_hash,
            header.timestamp,
            header.difficulty,
            header.gas_used,
            header.gas_limit,
            header.transaction_count,
            display_address(&header.miner),
        ))
        .print();
    Ok(())
}

async fn query_receipt(session: &Session, hash: H256) -> Result<(), CliError> {
    let node = session.connect().await?;
    let receipt = node
        .get_receipt(&hash)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("receipt for {hash}")))?;
    let status = if receipt.is_success() { "success" } else { "reverted" };

    let mut out = Output::new(session.json)
        .field("tx_hash", &hash.to_hex())
        .field("status", status)
        .field_u64("block_number", receipt.block_number)
        .field_u64("gas_used", receipt.gas_used)
        .field_u64("logs", receipt.logs.len() as u64);
    if let Some(address) = &receipt.contract_address {
        out = out.field("contract_address", &display_address(address));
    }
    out.message(&format!(
        "Transaction {hash}\n  Status:   {status}\n  Block:    {}\n  Gas used: {}\n  Logs:     {}",
        receipt.block_number,
        receipt.gas_used,
        receipt.logs.len()
    ))
    .print();
    Ok(())
}
