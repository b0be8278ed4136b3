//! In-memory chain used by the integration tests.
//!
//! Mines every accepted transaction into its own block, runs the Counter
//! contract natively and feeds live log subscribers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ethkit_crypto::keccak256;
use ethkit_sdk::abi::{encode, function_selector, Token};
use ethkit_sdk::contract::counter_bytecode;
use ethkit_sdk::{
    Address, BlockHeader, BlockId, CallRequest, Log, LogFeed, LogFilter, NodeFacade, Receipt,
    SdkError, SignedTransaction, TxStatus, Wallet, H256, U256,
};
use ethkit_types::contract_address;
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SEPOLIA: u64 = 11155111;
pub const GAS_PRICE: u128 = 2_000_000_000;
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

const CALL_GAS: u64 = 30_000;
const CREATE_GAS: u64 = 150_000;

pub fn dev_wallet() -> Wallet {
    Wallet::from_private_key_hex(DEV_KEY).expect("dev key")
}

pub fn count_incremented_topic() -> H256 {
    keccak256(b"CountIncremented(uint256)")
}

struct Counter {
    owner: Address,
    count: U256,
}

struct Subscriber {
    id: usize,
    filter: LogFilter,
    logs: mpsc::Sender<Log>,
    errors: mpsc::Sender<SdkError>,
}

#[derive(Default)]
struct Chain {
    head: u64,
    balances: HashMap<Address, u128>,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<H256, Receipt>,
    logs: Vec<Log>,
    counters: HashMap<Address, Counter>,
    subscribers: Vec<Subscriber>,
    next_subscriber: usize,
    submissions: Vec<SignedTransaction>,
    hidden_receipt_polls: usize,
    withhold_receipts: bool,
    wrong_receipts: usize,
    unreachable_receipt_polls: usize,
    fail_subscribe: bool,
    replay_on_subscribe: bool,
}

/// Scriptable in-memory node
#[derive(Clone)]
pub struct DevNode {
    chain_id: u64,
    chain: Arc<Mutex<Chain>>,
    released: Arc<AtomicUsize>,
}

impl DevNode {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            chain: Arc::new(Mutex::new(Chain::default())),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Node on Sepolia's chain id with the dev account funded with 10 ether
    pub fn funded() -> Self {
        let node = Self::new(SEPOLIA);
        node.fund(dev_wallet().address(), 10 * ONE_ETHER);
        node
    }

    pub fn fund(&self, address: &Address, amount: u128) {
        *self.chain.lock().balances.entry(*address).or_default() += amount;
    }

    pub fn set_nonce(&self, address: &Address, nonce: u64) {
        self.chain.lock().nonces.insert(*address, nonce);
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.chain.lock().balances.get(address).copied().unwrap_or_default()
    }

    pub fn head(&self) -> u64 {
        self.chain.lock().head
    }

    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.chain.lock().submissions.clone()
    }

    /// Answer the next `polls` receipt queries with "pending"
    pub fn hide_receipts_for(&self, polls: usize) {
        self.chain.lock().hidden_receipt_polls = polls;
    }

    /// Never report receipts
    pub fn withhold_receipts(&self) {
        self.chain.lock().withhold_receipts = true;
    }

    /// Answer the next `polls` receipt queries with a receipt for another hash
    pub fn return_wrong_receipts(&self, polls: usize) {
        self.chain.lock().wrong_receipts = polls;
    }

    /// Fail the next `polls` receipt queries as unreachable
    pub fn drop_receipt_polls(&self, polls: usize) {
        self.chain.lock().unreachable_receipt_polls = polls;
    }

    pub fn fail_subscribe(&self) {
        self.chain.lock().fail_subscribe = true;
    }

    /// New feeds start by repeating every stored log that matches
    pub fn replay_history_on_subscribe(&self) {
        self.chain.lock().replay_on_subscribe = true;
    }

    /// Number of feeds whose node-side subscription was released
    pub fn released_feeds(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live_feeds(&self) -> usize {
        self.chain.lock().subscribers.len()
    }

    /// Mine a block holding one synthetic log and return it
    pub fn emit_log(&self, address: Address, topics: Vec<H256>, data: Vec<u8>) -> Log {
        let mut chain = self.chain.lock();
        chain.head += 1;
        let log = Log {
            address,
            topics,
            data: data.into(),
            block_number: chain.head,
            log_index: 0,
            transaction_hash: keccak256(chain.head.to_be_bytes()),
            removed: false,
        };
        chain.publish(vec![log.clone()]);
        log
    }

    /// Drop `log` from the chain as a reorg would, telling live feeds it was removed
    pub fn retract_log(&self, log: &Log) {
        let mut chain = self.chain.lock();
        chain.logs.retain(|l| l.position() != log.position());
        chain.notify(&Log {
            removed: true,
            ..log.clone()
        });
    }

    /// End every live feed with `err`
    pub fn fail_feeds(&self, err: SdkError) {
        let subscribers = std::mem::take(&mut self.chain.lock().subscribers);
        for sub in subscribers {
            let _ = sub.errors.try_send(err.clone());
        }
    }

    /// End every live feed without an error
    pub fn end_feeds(&self) {
        self.chain.lock().subscribers.clear();
    }

    pub fn counter_value(&self, address: &Address) -> Option<U256> {
        self.chain.lock().counters.get(address).map(|c| c.count)
    }
}

impl Chain {
    fn publish(&mut self, logs: Vec<Log>) {
        for log in logs {
            self.notify(&log);
            self.logs.push(log);
        }
    }

    fn notify(&self, log: &Log) {
        for sub in &self.subscribers {
            if sub.filter.address.map_or(true, |a| a == log.address)
                && topics_match(&sub.filter, log)
            {
                let _ = sub.logs.try_send(log.clone());
            }
        }
    }

    fn execute(&mut self, signed: &SignedTransaction, sender: Address) -> Receipt {
        let tx = signed.tx();
        let hash = signed.hash();
        self.head += 1;
        let block = self.head;

        let mut status = TxStatus::Success;
        let mut emitted = Vec::new();
        let mut created = None;

        let gas_used = match tx.to {
            None => {
                let code = counter_bytecode().unwrap_or_default();
                let address = contract_address(&sender, tx.nonce);
                if tx.gas_limit < CREATE_GAS || !tx.data.starts_with(&code) {
                    status = TxStatus::Reverted;
                } else {
                    self.counters.insert(
                        address,
                        Counter {
                            owner: sender,
                            count: U256::zero(),
                        },
                    );
                    created = Some(address);
                }
                CREATE_GAS.min(tx.gas_limit)
            }
            Some(to) if self.counters.contains_key(&to) => {
                if tx.gas_limit < CALL_GAS {
                    status = TxStatus::Reverted;
                } else {
                    match self.run_counter(to, sender, &tx.data) {
                        Some(logs) => emitted = logs,
                        None => status = TxStatus::Reverted,
                    }
                }
                CALL_GAS.min(tx.gas_limit)
            }
            Some(to) => {
                *self.balances.entry(to).or_default() += tx.value;
                21_000
            }
        };

        let fee = tx.gas_price * gas_used as u128;
        let spent = if status == TxStatus::Success && tx.to.is_some() {
            fee + tx.value
        } else {
            fee
        };
        if let Some(balance) = self.balances.get_mut(&sender) {
            *balance = balance.saturating_sub(spent);
        }

        let logs: Vec<Log> = emitted
            .into_iter()
            .enumerate()
            .map(|(i, mut log)| {
                log.block_number = block;
                log.log_index = i as u64;
                log.transaction_hash = hash;
                log
            })
            .collect();

        let mut receipt = Receipt::new(hash, status, block, gas_used);
        receipt.block_hash = Some(keccak256(block.to_be_bytes()));
        receipt.effective_gas_price = Some(tx.gas_price);
        receipt.contract_address = created;
        receipt.logs = logs.clone();
        self.publish(logs);
        receipt
    }

    /// `None` means the call reverted
    fn run_counter(&mut self, address: Address, sender: Address, data: &[u8]) -> Option<Vec<Log>> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let counter = self.counters.get_mut(&address)?;

        if selector == function_selector("increment()") {
            counter.count += U256::one();
            return Some(vec![Log {
                address,
                topics: vec![count_incremented_topic()],
                data: encode(&[Token::Uint(counter.count)]).into(),
                ..Default::default()
            }]);
        }
        if selector == function_selector("reset()") {
            if sender != counter.owner {
                return None;
            }
            counter.count = U256::zero();
            return Some(vec![Log {
                address,
                topics: vec![keccak256(b"CountReset()")],
                ..Default::default()
            }]);
        }
        if selector == function_selector("setCount(uint256)") {
            if sender != counter.owner {
                return None;
            }
            let arg = data.get(4..36)?;
            counter.count = U256::from_big_endian(arg);
            return Some(Vec::new());
        }
        None
    }
}

fn topics_match(filter: &LogFilter, log: &Log) -> bool {
    filter.topics.iter().enumerate().all(|(i, wanted)| match wanted {
        None => true,
        Some(topic) => log.topics.get(i) == Some(topic),
    })
}

fn rejected(message: &str) -> SdkError {
    SdkError::Rpc {
        code: -32000,
        message: message.to_string(),
    }
}

#[async_trait]
impl NodeFacade for DevNode {
    async fn chain_id(&self) -> Result<u64, SdkError> {
        Ok(self.chain_id)
    }

    async fn gas_price(&self) -> Result<u128, SdkError> {
        Ok(GAS_PRICE)
    }

    async fn block_number(&self) -> Result<u64, SdkError> {
        Ok(self.chain.lock().head)
    }

    async fn get_nonce(&self, address: &Address, _block: BlockId) -> Result<u64, SdkError> {
        Ok(self.chain.lock().nonces.get(address).copied().unwrap_or_default())
    }

    async fn get_balance(&self, address: &Address, _block: BlockId) -> Result<U256, SdkError> {
        Ok(U256::from(self.balance(address)))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError> {
        let signed = SignedTransaction::decode(raw)
            .map_err(|e| rejected(&format!("rlp: {e}")))?;
        let sender = signed
            .recover_sender_on(self.chain_id)
            .map_err(|_| rejected("invalid sender: chain id mismatch"))?;

        let mut chain = self.chain.lock();
        chain.submissions.push(signed.clone());

        let tx = signed.tx();
        let expected = chain.nonces.get(&sender).copied().unwrap_or_default();
        if tx.nonce < expected {
            return Err(rejected("nonce too low"));
        }
        if tx.nonce > expected {
            return Err(rejected("nonce too high"));
        }
        let cost = tx.max_cost().unwrap_or(u128::MAX);
        if chain.balances.get(&sender).copied().unwrap_or_default() < cost {
            return Err(rejected("insufficient funds for gas * price + value"));
        }

        chain.nonces.insert(sender, expected + 1);
        let receipt = chain.execute(&signed, sender);
        chain.receipts.insert(receipt.transaction_hash, receipt);
        Ok(signed.hash())
    }

    async fn get_receipt(&self, hash: &H256) -> Result<Option<Receipt>, SdkError> {
        let mut chain = self.chain.lock();
        if chain.unreachable_receipt_polls > 0 {
            chain.unreachable_receipt_polls -= 1;
            return Err(SdkError::Connectivity("connection reset".to_string()));
        }
        if chain.withhold_receipts {
            return Ok(None);
        }
        if chain.hidden_receipt_polls > 0 {
            chain.hidden_receipt_polls -= 1;
            return Ok(None);
        }
        if chain.wrong_receipts > 0 {
            chain.wrong_receipts -= 1;
            let other = keccak256(hash.as_bytes());
            return Ok(Some(Receipt::new(other, TxStatus::Success, chain.head, 21_000)));
        }
        Ok(chain.receipts.get(hash).cloned())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, SdkError> {
        let chain = self.chain.lock();
        // Returned newest first so callers must sort
        Ok(chain
            .logs
            .iter()
            .rev()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogFeed, SdkError> {
        let mut chain = self.chain.lock();
        if chain.fail_subscribe {
            return Err(SdkError::Subscription("subscriptions disabled".to_string()));
        }
        let (log_tx, logs) = mpsc::channel(64);
        let (err_tx, errors) = mpsc::channel(1);
        if chain.replay_on_subscribe {
            for log in chain.logs.iter().filter(|log| filter.matches(log)) {
                let _ = log_tx.try_send(log.clone());
            }
        }
        let id = chain.next_subscriber;
        chain.next_subscriber += 1;
        chain.subscribers.push(Subscriber {
            id,
            filter: filter.clone(),
            logs: log_tx,
            errors: err_tx,
        });

        let registry = self.chain.clone();
        let released = self.released.clone();
        Ok(LogFeed::new(logs, errors, move || {
            registry.lock().subscribers.retain(|s| s.id != id);
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn call(&self, request: &CallRequest, _block: BlockId) -> Result<Bytes, SdkError> {
        let chain = self.chain.lock();
        let counter = request
            .to
            .and_then(|to| chain.counters.get(&to))
            .ok_or_else(|| rejected("execution reverted"))?;
        let data = request.data.clone().unwrap_or_default();

        if data.starts_with(&function_selector("getCount()")) {
            return Ok(encode(&[Token::Uint(counter.count)]).into());
        }
        if data.starts_with(&function_selector("owner()")) {
            return Ok(encode(&[Token::Address(counter.owner)]).into());
        }
        Err(rejected("execution reverted"))
    }

    async fn get_block_header(&self, block: BlockId) -> Result<Option<BlockHeader>, SdkError> {
        let head = self.chain.lock().head;
        let number = match block {
            BlockId::Number(n) if n > head => return Ok(None),
            BlockId::Number(n) => n,
            BlockId::Earliest => 0,
            _ => head,
        };
        Ok(Some(BlockHeader {
            number,
            hash: keccak256(number.to_be_bytes()),
            parent_hash: keccak256(number.saturating_sub(1).to_be_bytes()),
            timestamp: 1_700_000_000 + number * 12,
            gas_limit: 30_000_000,
            ..Default::default()
        }))
    }
}
