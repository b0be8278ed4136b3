//! Block header summary

use ethkit_primitives::{Address, H256, U256};

/// Header fields of a block plus its transaction count
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Block number
    pub number: u64,
    /// Block hash
    pub hash: H256,
    /// Parent block hash
    pub parent_hash: H256,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Proof-of-work difficulty, zero after the merge
    pub difficulty: U256,
    /// Block gas limit
    pub gas_limit: u64,
    /// Gas used by all transactions
    pub gas_used: u64,
    /// Base fee, for post-London blocks
    pub base_fee_per_gas: Option<u128>,
    /// Fee recipient
    pub miner: Address,
    /// Number of transactions in the block
    pub transaction_count: usize,
}
