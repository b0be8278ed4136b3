//! Transaction pipeline: nonce, fees, build, sign, broadcast, confirm

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use ethkit_primitives::{Address, H256};
use ethkit_types::{contract_address, LegacyTx, Receipt, SignedTransaction, INTRINSIC_GAS};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::node::NodeFacade;
use crate::types::{BlockId, Deployment, TxRequest};
use crate::{PipelineConfig, SdkError, Wallet};

/// Stand-in for deadlines too large to represent as an instant
const UNBOUNDED_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Per-session sender state.
///
/// Keeps one nonce cursor per account so back-to-back sends never reuse a nonce,
/// even before earlier transactions are mined. Methods that touch the cursor take
/// `&mut self`; share a pipeline across tasks behind a `tokio::sync::Mutex`.
#[derive(Debug, Default)]
pub struct TransactionPipeline {
    nonces: HashMap<Address, u64>,
    config: PipelineConfig,
}

impl TransactionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            nonces: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ==================== Nonce ====================

    /// Next nonce for `address`, consuming it.
    ///
    /// The first call per account asks the node for its pending count; later calls
    /// advance the local cursor.
    pub async fn prepare_nonce(
        &mut self,
        node: &dyn NodeFacade,
        address: &Address,
    ) -> Result<u64, SdkError> {
        let nonce = self.peek_nonce(node, address).await?;
        self.nonces.insert(*address, nonce + 1);
        Ok(nonce)
    }

    /// Forget the cursor for `address` so the next send re-reads the node
    pub fn reset_nonce(&mut self, address: &Address) {
        if self.nonces.remove(address).is_some() {
            debug!(%address, "nonce cursor reset");
        }
    }

    async fn peek_nonce(&self, node: &dyn NodeFacade, address: &Address) -> Result<u64, SdkError> {
        if let Some(nonce) = self.nonces.get(address) {
            return Ok(*nonce);
        }
        let nonce = node.get_nonce(address, BlockId::Pending).await?;
        debug!(%address, nonce, "nonce fetched from node");
        Ok(nonce)
    }

    fn commit_nonce(&mut self, address: &Address, used: u64) {
        let cursor = self.nonces.entry(*address).or_insert(used + 1);
        *cursor = (*cursor).max(used + 1);
    }

    // ==================== Fees ====================

    /// Node-suggested gas price in wei
    pub async fn price_fees(&self, node: &dyn NodeFacade) -> Result<u128, SdkError> {
        let price = node.gas_price().await?;
        debug!(gas_price = price, "gas price");
        Ok(price)
    }

    // ==================== Build & Sign ====================

    /// Assemble an unsigned legacy transaction. `to = None` creates a contract from `data`.
    pub fn build(
        nonce: u64,
        to: Option<Address>,
        value: u128,
        gas_limit: u64,
        gas_price: u128,
        data: impl Into<Bytes>,
    ) -> Result<LegacyTx, SdkError> {
        if gas_limit < INTRINSIC_GAS {
            return Err(SdkError::InvalidArgument(format!(
                "gas limit {gas_limit} below intrinsic cost {INTRINSIC_GAS}"
            )));
        }
        let tx = LegacyTx {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data: data.into(),
        };
        if tx.is_create() && tx.data.is_empty() {
            return Err(SdkError::InvalidArgument(
                "contract creation without init code".to_string(),
            ));
        }
        if tx.max_cost().is_none() {
            return Err(SdkError::InvalidArgument(
                "gas limit * gas price + value overflows".to_string(),
            ));
        }
        Ok(tx)
    }

    /// EIP-155 sign `tx` for `chain_id`
    pub fn sign(
        tx: LegacyTx,
        wallet: &Wallet,
        chain_id: u64,
    ) -> Result<SignedTransaction, SdkError> {
        if chain_id == 0 {
            return Err(SdkError::Signing(
                "chain id 0 gives no replay protection".to_string(),
            ));
        }
        let signature = wallet.sign_hash(&tx.signing_hash(chain_id))?;
        Ok(SignedTransaction::from_signature(tx, &signature, chain_id)?)
    }

    // ==================== Broadcast & Confirm ====================

    /// Submit once. Returns the locally computed hash.
    pub async fn broadcast(
        &self,
        node: &dyn NodeFacade,
        signed: &SignedTransaction,
    ) -> Result<H256, SdkError> {
        let hash = signed.hash();
        let reported = match node.send_raw_transaction(&signed.encode()).await {
            Ok(reported) => reported,
            Err(SdkError::Rpc { code, message }) => {
                return Err(SdkError::from_rpc_rejection(code, message))
            }
            Err(e) => return Err(e),
        };
        if reported != hash {
            warn!(tx_hash = %hash, node_hash = %reported, "node reported a different transaction hash");
        }
        info!(tx_hash = %hash, nonce = signed.tx().nonce, "transaction broadcast");
        Ok(hash)
    }

    /// Poll for the receipt of `hash` until `deadline` elapses.
    ///
    /// A reverted receipt is returned as-is; check [`Receipt::is_success`] or use
    /// [`ensure_success`].
    pub async fn await_confirmation(
        &self,
        node: &dyn NodeFacade,
        hash: H256,
        deadline: Duration,
    ) -> Result<Receipt, SdkError> {
        let started = Instant::now();
        let until = started
            .checked_add(deadline)
            .unwrap_or_else(|| started + UNBOUNDED_WAIT);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match tokio::time::timeout_at(until, node.get_receipt(&hash)).await {
                Err(_) => break,
                Ok(Ok(Some(receipt))) if receipt.transaction_hash == hash => {
                    info!(
                        tx_hash = %hash,
                        block = receipt.block_number,
                        success = receipt.is_success(),
                        attempt,
                        "transaction confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(Ok(Some(receipt))) => {
                    warn!(tx_hash = %hash, got = %receipt.transaction_hash, "ignoring receipt for another transaction");
                }
                Ok(Ok(None)) => debug!(tx_hash = %hash, attempt, "receipt pending"),
                Ok(Err(SdkError::Connectivity(reason))) => {
                    warn!(tx_hash = %hash, attempt, %reason, "receipt poll failed, retrying");
                }
                Ok(Err(e)) => return Err(e),
            }

            let wake = Instant::now()
                .checked_add(self.config.poll_interval())
                .unwrap_or(until);
            if wake >= until {
                tokio::time::sleep_until(until).await;
                break;
            }
            tokio::time::sleep_until(wake).await;
        }

        Err(SdkError::Timeout {
            hash,
            waited: started.elapsed(),
        })
    }

    // ==================== Composed flows ====================

    /// Nonce, price, chain id, build, sign and broadcast `request`
    pub async fn send(
        &mut self,
        node: &dyn NodeFacade,
        wallet: &Wallet,
        request: TxRequest,
    ) -> Result<H256, SdkError> {
        let (hash, _) = self.submit(node, wallet, request).await?;
        Ok(hash)
    }

    /// [`send`](Self::send) then wait up to the configured confirmation timeout
    pub async fn send_and_confirm(
        &mut self,
        node: &dyn NodeFacade,
        wallet: &Wallet,
        request: TxRequest,
    ) -> Result<Receipt, SdkError> {
        let hash = self.send(node, wallet, request).await?;
        self.await_confirmation(node, hash, self.config.confirmation_timeout())
            .await
    }

    /// Broadcast a contract creation of `bytecode ++ constructor_args`
    pub async fn deploy(
        &mut self,
        node: &dyn NodeFacade,
        wallet: &Wallet,
        bytecode: &[u8],
        constructor_args: &[u8],
        gas_limit: u64,
    ) -> Result<Deployment, SdkError> {
        let mut init_code = Vec::with_capacity(bytecode.len() + constructor_args.len());
        init_code.extend_from_slice(bytecode);
        init_code.extend_from_slice(constructor_args);

        let request = TxRequest {
            to: None,
            data: init_code.into(),
            gas_limit,
            ..Default::default()
        };
        let (tx_hash, nonce) = self.submit(node, wallet, request).await?;
        let address = contract_address(wallet.address(), nonce);
        info!(%address, tx_hash = %tx_hash, nonce, "contract deployment broadcast");

        Ok(Deployment {
            address,
            tx_hash,
            nonce,
        })
    }

    async fn submit(
        &mut self,
        node: &dyn NodeFacade,
        wallet: &Wallet,
        request: TxRequest,
    ) -> Result<(H256, u64), SdkError> {
        let sender = *wallet.address();
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.peek_nonce(node, &sender).await?,
        };
        let gas_price = match request.gas_price {
            Some(price) => price,
            None => self.price_fees(node).await?,
        };
        let chain_id = node.chain_id().await?;

        let tx = Self::build(
            nonce,
            request.to,
            request.value,
            request.gas_limit,
            gas_price,
            request.data,
        )?;
        let signed = Self::sign(tx, wallet, chain_id)?;

        // Consumed from here on, whether or not the node accepts it
        self.commit_nonce(&sender, nonce);
        let hash = self.broadcast(node, &signed).await?;
        Ok((hash, nonce))
    }
}

/// Turn a reverted receipt into [`SdkError::Reverted`]
pub fn ensure_success(receipt: Receipt) -> Result<Receipt, SdkError> {
    if receipt.is_reverted() {
        return Err(SdkError::Reverted {
            tx_hash: receipt.transaction_hash,
        });
    }
    Ok(receipt)
}
