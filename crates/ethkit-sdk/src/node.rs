//! Node access seam used by the pipeline, subscriptions and contract bindings

use async_trait::async_trait;
use bytes::Bytes;
use ethkit_primitives::{Address, H256, U256};
use ethkit_types::{BlockHeader, Log, LogFilter, Receipt};
use tokio::sync::mpsc;

use crate::types::{BlockId, CallRequest};
use crate::SdkError;

/// Operations a chain node must offer.
///
/// [`Client`](crate::Client) implements this over JSON-RPC; tests can supply an
/// in-memory node.
#[async_trait]
pub trait NodeFacade: Send + Sync {
    /// Chain id used for replay protection
    async fn chain_id(&self) -> Result<u64, SdkError>;

    /// Suggested gas price in wei
    async fn gas_price(&self) -> Result<u128, SdkError>;

    /// Latest block number
    async fn block_number(&self) -> Result<u64, SdkError>;

    /// Transaction count of `address`; with [`BlockId::Pending`] this includes unmined ones
    async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError>;

    /// Balance in wei
    async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError>;

    /// Submit a signed, encoded transaction; returns the hash the node reports
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError>;

    /// Receipt of a mined transaction, `None` while pending or unknown
    async fn get_receipt(&self, hash: &H256) -> Result<Option<Receipt>, SdkError>;

    /// Historical logs matching `filter`
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, SdkError>;

    /// Live feed of new logs matching `filter`
    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogFeed, SdkError>;

    /// Execute a read-only call
    async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError>;

    /// Header summary of a block
    async fn get_block_header(&self, block: BlockId) -> Result<Option<BlockHeader>, SdkError> {
        let _ = block;
        Err(SdkError::Rpc {
            code: -32601,
            message: "block headers not supported by this node".to_string(),
        })
    }
}

/// Live log feed handed out by [`NodeFacade::subscribe_logs`].
///
/// `errors` yields `Some(err)` when the feed dies abnormally. When it closes without
/// a value the feed ended, which may or may not have been clean. The node-side
/// subscription is released when the feed is dropped or [`release`](Self::release)d.
pub struct LogFeed {
    /// New logs in arrival order
    pub logs: mpsc::Receiver<Log>,
    /// Termination signal
    pub errors: mpsc::Receiver<SdkError>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LogFeed {
    /// Feed whose node-side resources are freed by `release`
    pub fn new(
        logs: mpsc::Receiver<Log>,
        errors: mpsc::Receiver<SdkError>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            logs,
            errors,
            release: Some(Box::new(release)),
        }
    }

    /// Release the node-side subscription. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LogFeed {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LogFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFeed")
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_feed_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let (_log_tx, logs) = mpsc::channel(1);
        let (_err_tx, errors) = mpsc::channel(1);

        let mut feed = LogFeed::new(logs, errors, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        feed.release();
        feed.release();
        drop(feed);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_feed_released_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let (_log_tx, logs) = mpsc::channel(1);
        let (_err_tx, errors) = mpsc::channel(1);

        drop(LogFeed::new(logs, errors, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
