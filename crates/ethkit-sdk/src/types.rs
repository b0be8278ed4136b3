//! Request-side SDK types

use std::fmt;

use bytes::Bytes;
use ethkit_primitives::{Address, H256};
use serde::ser::SerializeMap;
use serde::Serialize;

/// Block selector for state queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Specific block number
    Number(u64),
    /// Latest mined block
    #[default]
    Latest,
    /// Pending state, including transactions not yet mined
    Pending,
    /// Genesis
    Earliest,
    /// Latest safe block
    Safe,
    /// Latest finalized block
    Finalized,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(n) => write!(f, "0x{:x}", n),
            BlockId::Latest => f.write_str("latest"),
            BlockId::Pending => f.write_str("pending"),
            BlockId::Earliest => f.write_str("earliest"),
            BlockId::Safe => f.write_str("safe"),
            BlockId::Finalized => f.write_str("finalized"),
        }
    }
}

impl Serialize for BlockId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        BlockId::Number(n)
    }
}

/// Parameters for `eth_call`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// Caller address
    pub from: Option<Address>,
    /// Contract being called
    pub to: Option<Address>,
    /// Gas cap
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<u128>,
    /// Value in wei
    pub value: Option<u128>,
    /// ABI-encoded input
    pub data: Option<Bytes>,
}

impl CallRequest {
    /// Call `to` with `data`
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: Some(data.into()),
            ..Default::default()
        }
    }
}

impl Serialize for CallRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = self.gas {
            map.serialize_entry("gas", &format!("0x{:x}", gas))?;
        }
        if let Some(gas_price) = self.gas_price {
            map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
        }
        if let Some(value) = self.value {
            map.serialize_entry("value", &format!("0x{:x}", value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }
        map.end()
    }
}

/// Intent for an outgoing transaction.
///
/// `nonce` and `gas_price` default to the pipeline's session nonce and the node's
/// suggested price when left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient; `None` deploys `data` as init code
    pub to: Option<Address>,
    /// Value in wei
    pub value: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Call data or init code
    pub data: Bytes,
    /// Explicit gas price in wei
    pub gas_price: Option<u128>,
    /// Explicit nonce
    pub nonce: Option<u64>,
}

impl TxRequest {
    /// Plain value transfer
    pub fn transfer(to: Address, value: u128) -> Self {
        Self {
            to: Some(to),
            value,
            gas_limit: ethkit_types::INTRINSIC_GAS,
            ..Default::default()
        }
    }

    /// Call `to` with `data`
    pub fn call(to: Address, data: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            to: Some(to),
            data: data.into(),
            gas_limit,
            ..Default::default()
        }
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Override the gas price
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Override the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Result of broadcasting a contract creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// Address the contract will live at once mined
    pub address: Address,
    /// Creation transaction hash
    pub tx_hash: H256,
    /// Nonce consumed by the creation
    pub nonce: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_id_serialization() {
        assert_eq!(serde_json::to_value(BlockId::Latest).unwrap(), json!("latest"));
        assert_eq!(serde_json::to_value(BlockId::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(BlockId::Number(9135366)).unwrap(), json!("0x8b6506"));
    }

    #[test]
    fn test_call_request_skips_unset() {
        let to = Address::from_bytes([0x01; 20]);
        let request = CallRequest::new(to, vec![0xa8, 0x7d, 0x94, 0x2c]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "to": "0x0101010101010101010101010101010101010101",
                "data": "0xa87d942c"
            })
        );
    }

    #[test]
    fn test_tx_request_transfer_defaults() {
        let request = TxRequest::transfer(Address::ZERO, 5);
        assert_eq!(request.gas_limit, 21_000);
        assert!(request.nonce.is_none());
        assert!(request.gas_price.is_none());
    }
}
