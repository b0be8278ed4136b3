//! JSON-RPC wire formats and hex quantity helpers

use bytes::Bytes;
use ethkit_primitives::{Address, H256, U256};
use ethkit_types::{BlockHeader, Log, LogFilter, Receipt, TxStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::SdkError;

pub(crate) fn parse_hex_u64(s: &str) -> Result<u64, SdkError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| SdkError::Serialization(format!("bad quantity {s:?}: {e}")))
}

pub(crate) fn parse_hex_u128(s: &str) -> Result<u128, SdkError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(digits, 16)
        .map_err(|e| SdkError::Serialization(format!("bad quantity {s:?}: {e}")))
}

pub(crate) fn parse_hex_u256(s: &str) -> Result<U256, SdkError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(digits, 16)
        .map_err(|e| SdkError::Serialization(format!("bad quantity {s:?}: {e}")))
}

pub(crate) fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| SdkError::Serialization(format!("bad hex data: {e}")))
}

fn parse_opt_u64(s: Option<&str>) -> Result<u64, SdkError> {
    s.map(parse_hex_u64).transpose().map(Option::unwrap_or_default)
}

/// `eth_getLogs` filter object
pub(crate) fn filter_params(filter: &LogFilter) -> Value {
    let block = |n: Option<u64>| match n {
        Some(n) => Value::String(format!("0x{:x}", n)),
        None => Value::String("latest".to_string()),
    };
    let mut object = json!({
        "fromBlock": match filter.from_block {
            Some(n) => Value::String(format!("0x{:x}", n)),
            None => Value::String("earliest".to_string()),
        },
        "toBlock": block(filter.to_block),
    });
    if let Some(address) = &filter.address {
        object["address"] = Value::String(address.to_hex());
    }
    if !filter.topics.is_empty() {
        object["topics"] = Value::Array(
            filter
                .topics
                .iter()
                .map(|t| t.map_or(Value::Null, |t| Value::String(t.to_hex())))
                .collect(),
        );
    }
    object
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcLog {
    address: Address,
    #[serde(default)]
    topics: Vec<H256>,
    data: String,
    block_number: Option<String>,
    log_index: Option<String>,
    transaction_hash: Option<H256>,
    #[serde(default)]
    removed: bool,
}

impl TryFrom<RpcLog> for Log {
    type Error = SdkError;

    fn try_from(raw: RpcLog) -> Result<Self, Self::Error> {
        Ok(Log {
            address: raw.address,
            topics: raw.topics,
            data: parse_hex_bytes(&raw.data)?,
            block_number: parse_opt_u64(raw.block_number.as_deref())?,
            log_index: parse_opt_u64(raw.log_index.as_deref())?,
            transaction_hash: raw.transaction_hash.unwrap_or_default(),
            removed: raw.removed,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcReceipt {
    transaction_hash: H256,
    status: Option<String>,
    block_number: String,
    block_hash: Option<H256>,
    gas_used: String,
    effective_gas_price: Option<String>,
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

impl TryFrom<RpcReceipt> for Receipt {
    type Error = SdkError;

    fn try_from(raw: RpcReceipt) -> Result<Self, Self::Error> {
        let status = match raw.status.as_deref() {
            Some(s) => TxStatus::from(parse_hex_u64(s)? == 1),
            None => {
                return Err(SdkError::Serialization(
                    "receipt without status field".to_string(),
                ))
            }
        };
        Ok(Receipt {
            transaction_hash: raw.transaction_hash,
            status,
            block_number: parse_hex_u64(&raw.block_number)?,
            block_hash: raw.block_hash,
            gas_used: parse_hex_u64(&raw.gas_used)?,
            effective_gas_price: raw
                .effective_gas_price
                .as_deref()
                .map(parse_hex_u128)
                .transpose()?,
            contract_address: raw.contract_address,
            logs: raw
                .logs
                .into_iter()
                .map(Log::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcBlock {
    number: String,
    hash: H256,
    parent_hash: H256,
    timestamp: String,
    #[serde(default)]
    difficulty: Option<String>,
    gas_limit: String,
    gas_used: String,
    base_fee_per_gas: Option<String>,
    miner: Address,
    #[serde(default)]
    transactions: Vec<Value>,
}

impl TryFrom<RpcBlock> for BlockHeader {
    type Error = SdkError;

    fn try_from(raw: RpcBlock) -> Result<Self, Self::Error> {
        Ok(BlockHeader {
            number: parse_hex_u64(&raw.number)?,
            hash: raw.hash,
            parent_hash: raw.parent_hash,
            timestamp: parse_hex_u64(&raw.timestamp)?,
            difficulty: raw
                .difficulty
                .as_deref()
                .map(parse_hex_u256)
                .transpose()?
                .unwrap_or_default(),
            gas_limit: parse_hex_u64(&raw.gas_limit)?,
            gas_used: parse_hex_u64(&raw.gas_used)?,
            base_fee_per_gas: raw
                .base_fee_per_gas
                .as_deref()
                .map(parse_hex_u128)
                .transpose()?,
            miner: raw.miner,
            transaction_count: raw.transactions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantities() {
        assert_eq!(parse_hex_u64("0x5208").unwrap(), 21000);
        assert_eq!(parse_hex_u128("0x38d7ea4c68000").unwrap(), 1_000_000_000_000_000);
        assert_eq!(parse_hex_u256("0x0").unwrap(), U256::zero());
        assert_eq!(parse_hex_bytes("0x").unwrap(), Bytes::new());
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_filter_params() {
        let filter = LogFilter::new()
            .address(Address::from_bytes([0x01; 20]))
            .topic(1, H256::from_bytes([0x02; 32]))
            .from_block(16);
        let params = filter_params(&filter);
        assert_eq!(params["fromBlock"], json!("0x10"));
        assert_eq!(params["toBlock"], json!("latest"));
        assert_eq!(params["topics"][0], Value::Null);
        assert_eq!(
            params["address"],
            json!("0x0101010101010101010101010101010101010101")
        );
    }

    #[test]
    fn test_pending_log_positions_default_to_zero() {
        let raw: RpcLog = serde_json::from_value(json!({
            "address": "0x0101010101010101010101010101010101010101",
            "topics": [],
            "data": "0x",
            "blockNumber": null,
            "logIndex": null,
            "transactionHash": null
        }))
        .unwrap();
        let log = Log::try_from(raw).unwrap();
        assert_eq!(log.position(), (0, 0));
    }

    #[test]
    fn test_receipt_requires_status() {
        let raw: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x1",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        assert!(Receipt::try_from(raw).is_err());
    }
}
