//! JSON-RPC client implementing [`NodeFacade`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ethkit_primitives::{Address, H256, U256};
use ethkit_types::{BlockHeader, Log, LogFilter, Receipt};
use serde_json::Value;
use tokio::sync::{mpsc, watch, OnceCell};
use tracing::{debug, warn};

use crate::node::{LogFeed, NodeFacade};
use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{BlockId, CallRequest};
use crate::wire::{
    filter_params, parse_hex_bytes, parse_hex_u128, parse_hex_u256, parse_hex_u64, RpcBlock,
    RpcLog, RpcReceipt,
};
use crate::{PipelineConfig, SdkError};

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Node client speaking Ethereum JSON-RPC
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    chain_id: Arc<OnceCell<u64>>,
    feed_poll_interval: Duration,
    feed_buffer: usize,
}

impl Client {
    /// Connect over HTTP and fetch the chain id
    #[cfg(feature = "http")]
    pub async fn connect(url: &str) -> Result<Self, SdkError> {
        Self::connect_with_config(url, &PipelineConfig::default()).await
    }

    /// Connect over HTTP using the timeouts and feed settings from `config`
    #[cfg(feature = "http")]
    pub async fn connect_with_config(url: &str, config: &PipelineConfig) -> Result<Self, SdkError> {
        let transport = HttpTransport::with_timeout(url, config.request_timeout())?;
        let client = Self::with_transport(transport).with_config(config);
        let chain_id = client.chain_id().await?;
        debug!(url, chain_id, "connected");
        Ok(client)
    }

    /// Client over the default [`MockTransport`]
    pub fn new_mock() -> Self {
        Self::with_transport(MockTransport::new())
    }

    /// Client over a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            transport: Arc::new(transport),
            chain_id: Arc::new(OnceCell::new()),
            feed_poll_interval: defaults.feed_poll_interval(),
            feed_buffer: defaults.log_buffer,
        }
    }

    /// Apply live-feed settings from `config`
    pub fn with_config(mut self, config: &PipelineConfig) -> Self {
        self.feed_poll_interval = config.feed_poll_interval();
        self.feed_buffer = config.log_buffer.max(1);
        self
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        debug!(method, "rpc call");
        let value = self.transport.request_json(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Chain Info ====================

    async fn fetch_chain_id(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_chainId", vec![]).await?;
        parse_hex_u64(&result)
    }

    // ==================== Account Queries ====================

    /// Deployed code at `address`
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_getCode",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Gas estimate for `request`
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, SdkError> {
        let result: String = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        parse_hex_u64(&result)
    }
}

#[async_trait]
impl NodeFacade for Client {
    async fn chain_id(&self) -> Result<u64, SdkError> {
        self.chain_id
            .get_or_try_init(|| self.fetch_chain_id())
            .await
            .copied()
    }

    async fn gas_price(&self) -> Result<u128, SdkError> {
        let result: String = self.request("eth_gasPrice", vec![]).await?;
        parse_hex_u128(&result)
    }

    async fn block_number(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&result)
    }

    async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_u64(&result)
    }

    async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        let result: String = self
            .request(
                "eth_getBalance",
                vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_u256(&result)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError> {
        let params = vec![Value::String(format!("0x{}", hex::encode(raw)))];
        let result: String = match self.request("eth_sendRawTransaction", params).await {
            Ok(result) => result,
            Err(SdkError::Rpc { code, message }) => {
                return Err(SdkError::from_rpc_rejection(code, message))
            }
            Err(e) => return Err(e),
        };
        H256::from_hex(&result).map_err(|e| SdkError::Serialization(e.to_string()))
    }

    async fn get_receipt(&self, hash: &H256) -> Result<Option<Receipt>, SdkError> {
        let result: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", vec![Value::String(hash.to_hex())])
            .await?;
        result.map(Receipt::try_from).transpose()
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, SdkError> {
        let result: Vec<RpcLog> = self
            .request("eth_getLogs", vec![filter_params(filter)])
            .await?;
        result.into_iter().map(Log::try_from).collect()
    }

    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogFeed, SdkError> {
        let head = self
            .block_number()
            .await
            .map_err(|e| SdkError::Subscription(format!("cannot start log feed: {e}")))?;
        let start = filter.from_block.map_or(head + 1, |from| from.max(head + 1));

        let (log_tx, logs) = mpsc::channel(self.feed_buffer);
        let (err_tx, errors) = mpsc::channel(1);

        // Range already behind the head: history covers it, the feed ends at once
        if filter.to_block.is_some_and(|to| start > to) {
            debug!(start, "log feed range already past");
            return Ok(LogFeed::new(logs, errors, || {}));
        }

        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(poll_logs(
            self.clone(),
            filter.clone(),
            start,
            log_tx,
            err_tx,
            stop_rx,
        ));

        Ok(LogFeed::new(logs, errors, move || {
            let _ = stop_tx.send(true);
        }))
    }

    async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    async fn get_block_header(&self, block: BlockId) -> Result<Option<BlockHeader>, SdkError> {
        let result: Option<RpcBlock> = self
            .request(
                "eth_getBlockByNumber",
                vec![serde_json::to_value(block)?, Value::Bool(false)],
            )
            .await?;
        result.map(BlockHeader::try_from).transpose()
    }
}

/// Emulates a log subscription over plain HTTP by polling new block ranges
async fn poll_logs(
    client: Client,
    filter: LogFilter,
    mut next_block: u64,
    logs: mpsc::Sender<Log>,
    errors: mpsc::Sender<SdkError>,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(client.feed_poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("log feed released");
                    return;
                }
                continue;
            }
        }

        let head = match client.block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "log feed stopped");
                if errors.send(SdkError::Subscription(e.to_string())).await.is_err() {
                    debug!("log feed error dropped, receiver gone");
                }
                return;
            }
        };
        if filter.to_block.is_some_and(|to| next_block > to) {
            debug!("log feed reached end of range");
            return;
        }
        if head < next_block {
            continue;
        }

        let window = LogFilter {
            from_block: Some(next_block),
            to_block: Some(filter.to_block.map_or(head, |to| to.min(head))),
            ..filter.clone()
        };
        match client.get_logs(&window).await {
            Ok(batch) => {
                debug!(from = next_block, to = head, count = batch.len(), "log feed batch");
                for log in batch {
                    if logs.send(log).await.is_err() {
                        return;
                    }
                }
                next_block = head + 1;
            }
            Err(e) => {
                warn!(error = %e, "log feed stopped");
                if errors.send(SdkError::Subscription(e.to_string())).await.is_err() {
                    debug!("log feed error dropped, receiver gone");
                }
                return;
            }
        }
    }
}
