//! Contract bindings

use bytes::Bytes;
use ethkit_primitives::Address;
use ethkit_types::{Log, Receipt};
use tracing::debug;

use crate::abi::{Abi, EventDef, FunctionDef, Token};
use crate::node::NodeFacade;
use crate::subscription::{EventSubscription, LogEvent};
use crate::types::{BlockId, CallRequest, TxRequest};
use crate::{SdkError, TransactionPipeline, Wallet};

/// Default gas limit for state-changing calls
pub const DEFAULT_CALL_GAS: u64 = 100_000;

/// Operations a [`Contract`] is allowed to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Read-only `eth_call`s
    pub query: bool,
    /// Signed transactions
    pub submit: bool,
    /// Event queries and subscriptions
    pub subscribe: bool,
}

impl Capabilities {
    pub const fn all() -> Self {
        Self {
            query: true,
            submit: true,
            subscribe: true,
        }
    }

    /// Everything except submitting transactions
    pub const fn read_only() -> Self {
        Self {
            query: true,
            submit: false,
            subscribe: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-transaction overrides for [`Contract::transact`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOptions {
    pub value: u128,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            value: 0,
            gas_limit: DEFAULT_CALL_GAS,
            gas_price: None,
            nonce: None,
        }
    }
}

/// A deployed contract: address, interface and allowed operations
#[derive(Debug, Clone)]
pub struct Contract {
    address: Address,
    abi: Abi,
    capabilities: Capabilities,
}

impl Contract {
    pub fn new(address: Address, abi: Abi) -> Self {
        Self {
            address,
            abi,
            capabilities: Capabilities::all(),
        }
    }

    /// Binding from a JSON ABI
    pub fn from_json(address: Address, abi_json: &str) -> Result<Self, SdkError> {
        Ok(Self::new(address, Abi::from_json(abi_json)?))
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn function(&self, name: &str) -> Result<&FunctionDef, SdkError> {
        self.abi
            .function(name)
            .ok_or_else(|| SdkError::InvalidArgument(format!("unknown function {name:?}")))
    }

    pub fn event(&self, name: &str) -> Result<&EventDef, SdkError> {
        self.abi
            .event(name)
            .ok_or_else(|| SdkError::InvalidArgument(format!("unknown event {name:?}")))
    }

    /// Calldata for `method(args)`
    pub fn encode_call(&self, method: &str, args: &[Token]) -> Result<Bytes, SdkError> {
        Ok(self.function(method)?.encode_input(args)?.into())
    }

    fn require(&self, allowed: bool, operation: &str) -> Result<(), SdkError> {
        if allowed {
            Ok(())
        } else {
            Err(SdkError::InvalidArgument(format!(
                "contract binding at {} is not configured to {operation}",
                self.address
            )))
        }
    }

    /// Execute `method` read-only at `block` and decode its outputs
    pub async fn call(
        &self,
        node: &dyn NodeFacade,
        method: &str,
        args: &[Token],
        block: BlockId,
    ) -> Result<Vec<Token>, SdkError> {
        self.require(self.capabilities.query, "query")?;
        let function = self.function(method)?;
        let request = CallRequest::new(self.address, function.encode_input(args)?);
        debug!(contract = %self.address, method, "contract call");
        let output = node.call(&request, block).await?;
        function.decode_output(&output)
    }

    /// Send `method(args)` through `pipeline` and wait for its receipt.
    ///
    /// A reverted transaction is returned as a receipt with a reverted status.
    pub async fn transact(
        &self,
        pipeline: &mut TransactionPipeline,
        node: &dyn NodeFacade,
        wallet: &Wallet,
        method: &str,
        args: &[Token],
        options: TxOptions,
    ) -> Result<Receipt, SdkError> {
        self.require(self.capabilities.submit, "submit transactions")?;
        let data = self.encode_call(method, args)?;
        let request = TxRequest {
            to: Some(self.address),
            value: options.value,
            gas_limit: options.gas_limit,
            data,
            gas_price: options.gas_price,
            nonce: options.nonce,
        };
        debug!(contract = %self.address, method, "contract transaction");
        pipeline.send_and_confirm(node, wallet, request).await
    }

    /// Historical then live `event` logs from this contract, starting at `from_block`
    pub async fn subscribe(
        &self,
        node: &dyn NodeFacade,
        event: &str,
        from_block: Option<u64>,
    ) -> Result<EventSubscription<EventDef>, SdkError> {
        self.require(self.capabilities.subscribe, "subscribe to events")?;
        let event = self.event(event)?.clone();
        let mut filter = event.filter(self.address);
        if let Some(from) = from_block {
            filter = filter.from_block(from);
        }
        EventSubscription::open(node, filter, event).await
    }

    /// `event` logs from this contract in `from..=to` (`to = None` means latest)
    pub async fn query_events(
        &self,
        node: &dyn NodeFacade,
        event: &str,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<LogEvent<Vec<Token>>>, SdkError> {
        self.require(self.capabilities.subscribe, "query events")?;
        let event = self.event(event)?;
        let mut filter = event.filter(self.address).from_block(from);
        if let Some(to) = to {
            filter = filter.to_block(to);
        }

        let mut logs = node.get_logs(&filter).await?;
        logs.sort_by_key(Log::position);
        logs.into_iter()
            .map(|log| {
                let values = event.decode_log(&log)?;
                Ok(LogEvent { log, event: values })
            })
            .collect()
    }
}

/// Creation code of the bundled Counter contract, hex with `0x`
pub const COUNTER_BYTECODE: &str = include_str!("../contracts/Counter.bin");

/// JSON ABI of the bundled Counter contract
pub const COUNTER_ABI: &str = include_str!("../contracts/Counter.abi.json");

/// Decoded [`COUNTER_BYTECODE`]
pub fn counter_bytecode() -> Result<Vec<u8>, SdkError> {
    let code = COUNTER_BYTECODE.trim();
    Ok(hex::decode(code.strip_prefix("0x").unwrap_or(code))?)
}

/// Binding for the Counter contract at `address`.
///
/// Functions: `getCount`, `increment`, `owner`, `reset`, `setCount(uint256)`.
/// Events: `CountIncremented(uint256)`, `CountReset()`.
pub fn counter(address: Address) -> Result<Contract, SdkError> {
    Contract::from_json(address, COUNTER_ABI)
}
