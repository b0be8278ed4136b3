//! Contract logs and log filters

use bytes::Bytes;
use ethkit_primitives::{Address, H256};

/// Log entry emitted by a contract, with its position in the chain
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics; topic 0 is the event signature hash for non-anonymous events
    pub topics: Vec<H256>,
    /// ABI-encoded non-indexed fields
    pub data: Bytes,
    /// Block containing the log
    pub block_number: u64,
    /// Index of the log within its block
    pub log_index: u64,
    /// Transaction that emitted the log
    pub transaction_hash: H256,
    /// Set when a reorg removed the log
    pub removed: bool,
}

impl Log {
    /// Event signature topic
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }

    /// Sort key: `(block_number, log_index)`
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Criteria selecting logs by emitter, topics and block range
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LogFilter {
    /// Only logs from this contract
    pub address: Option<Address>,
    /// Positional topic constraints; `None` matches anything at that position
    pub topics: Vec<Option<H256>>,
    /// First block, inclusive; `None` means the node default
    pub from_block: Option<u64>,
    /// Last block, inclusive; `None` means the latest block
    pub to_block: Option<u64>,
}

impl LogFilter {
    /// Filter matching every log
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one emitting contract
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Restrict topic 0 to one event signature
    pub fn event(self, topic0: H256) -> Self {
        self.topic(0, topic0)
    }

    /// Require `topic` at position `index`
    pub fn topic(mut self, index: usize, topic: H256) -> Self {
        if self.topics.len() <= index {
            self.topics.resize(index + 1, None);
        }
        self.topics[index] = Some(topic);
        self
    }

    /// Start at `block`
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    /// Stop at `block`
    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// True when `log` satisfies every constraint
    pub fn matches(&self, log: &Log) -> bool {
        if self.address.is_some_and(|a| a != log.address) {
            return false;
        }
        if self.from_block.is_some_and(|from| log.block_number < from) {
            return false;
        }
        if self.to_block.is_some_and(|to| log.block_number > to) {
            return false;
        }
        self.topics.iter().enumerate().all(|(i, wanted)| match wanted {
            None => true,
            Some(topic) => log.topics.get(i) == Some(topic),
        })
    }
}
