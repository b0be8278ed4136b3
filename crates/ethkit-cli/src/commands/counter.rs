//! Counter contract workflows

use clap::Subcommand;
use ethkit_primitives::{units, U256};
use ethkit_sdk::abi::Token;
use ethkit_sdk::contract::{counter, counter_bytecode};
use ethkit_sdk::types::BlockId;
use ethkit_sdk::{
    ensure_success, Capabilities, Client, Contract, LogEvent, NodeFacade, SdkError, TxOptions,
};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::{display_address, parse_address, Session};
use crate::{output::Output, CliError};

/// Counter subcommands
#[derive(Debug, Subcommand)]
pub enum CounterCommand {
    /// Deploy a new Counter and print its address
    Deploy,
    /// Increment the counter and print the new value
    Increment {
        /// Contract address
        address: String,
    },
    /// Print the current value
    Count {
        /// Contract address
        address: String,
    },
    /// Stream CountIncremented events until Ctrl-C
    Watch {
        /// Contract address
        address: String,
        /// Replay events from this block first
        #[arg(long)]
        from_block: Option<u64>,
    },
}

impl CounterCommand {
    pub async fn execute(self, session: &Session) -> Result<(), CliError> {
        match self {
            CounterCommand::Deploy => deploy(session).await,
            CounterCommand::Increment { address } => {
                let contract = counter(parse_address(&address)?)?;
                increment(session, &contract).await
            }
            CounterCommand::Count { address } => {
                let contract =
                    counter(parse_address(&address)?)?.with_capabilities(Capabilities::read_only());
                let node = session.connect().await?;
                let value = read_count(&contract, &node).await?;
                Output::new(session.json)
                    .field("contract", &display_address(contract.address()))
                    .field("count", &value.to_string())
                    .message(&format!("Count: {value}"))
                    .print();
                Ok(())
            }
            CounterCommand::Watch {
                address,
                from_block,
            } => {
                let contract =
                    counter(parse_address(&address)?)?.with_capabilities(Capabilities::read_only());
                watch_increments(session, &contract, from_block).await
            }
        }
    }
}

async fn read_count(contract: &Contract, node: &Client) -> Result<U256, CliError> {
    let out = contract.call(node, "getCount", &[], BlockId::Latest).await?;
    out.into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| SdkError::Decode("getCount returned no uint256".to_string()).into())
}

async fn deploy(session: &Session) -> Result<(), CliError> {
    let wallet = session.wallet()?;
    let node = session.connect().await?;
    let mut pipeline = session.pipeline();
    let gas_limit = session.config.deploy_gas_limit;

    let balance = node.get_balance(wallet.address(), BlockId::Latest).await?;
    let gas_price = pipeline.price_fees(&node).await?;
    let need = U256::from(gas_price) * U256::from(gas_limit);
    if balance < need {
        return Err(CliError::InsufficientBalance {
            have: units::format_ether(balance),
            need: units::format_ether(need),
        });
    }

    let code = counter_bytecode()?;
    let deployment = pipeline
        .deploy(&node, &wallet, &code, &[], gas_limit)
        .await?;
    info!(address = %deployment.address, tx_hash = %deployment.tx_hash, "waiting for deployment");

    let timeout = pipeline.config().confirmation_timeout();
    let receipt =
        ensure_success(pipeline.await_confirmation(&node, deployment.tx_hash, timeout).await?)?;
    if receipt.contract_address.is_some_and(|a| a != deployment.address) {
        warn!(
            expected = %deployment.address,
            reported = ?receipt.contract_address,
            "node reported a different contract address"
        );
    }

    let contract = counter(deployment.address)?;
    let value = read_count(&contract, &node).await?;
    let address = display_address(&deployment.address);

    Output::new(session.json)
        .field("contract", &address)
        .field("tx_hash", &deployment.tx_hash.to_hex())
        .field_u64("block_number", receipt.block_number)
        .field_u64("gas_used", receipt.gas_used)
        .field("count", &value.to_string())
        .message(&format!(
            "Counter deployed at {address}\nTransaction: {}\nBlock: {}\nCount: {value}",
            deployment.tx_hash, receipt.block_number
        ))
        .print();
    Ok(())
}

async fn increment(session: &Session, contract: &Contract) -> Result<(), CliError> {
    let wallet = session.wallet()?;
    let node = session.connect().await?;
    let mut pipeline = session.pipeline();

    let options = TxOptions {
        gas_limit: session.config.call_gas_limit,
        ..Default::default()
    };
    let receipt = contract
        .transact(&mut pipeline, &node, &wallet, "increment", &[], options)
        .await?;
    let receipt = ensure_success(receipt)?;
    let value = read_count(contract, &node).await?;

    Output::new(session.json)
        .field("contract", &display_address(contract.address()))
        .field("tx_hash", &receipt.transaction_hash.to_hex())
        .field_u64("block_number", receipt.block_number)
        .field("count", &value.to_string())
        .message(&format!(
            "Incremented in block {}\nTransaction: {}\nCount: {value}",
            receipt.block_number, receipt.transaction_hash
        ))
        .print();
    Ok(())
}

async fn watch_increments(
    session: &Session,
    contract: &Contract,
    from_block: Option<u64>,
) -> Result<(), CliError> {
    let node = session.connect().await?;
    let mut subscription = contract
        .subscribe(&node, "CountIncremented", from_block)
        .await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, closing subscription");
        }
        cancel_tx.send_replace(true);
    });

    let (sink, mut events) = mpsc::channel::<LogEvent<Vec<Token>>>(16);
    let watcher = tokio::spawn(async move { subscription.watch(sink, cancel_rx).await });

    if !session.json {
        println!(
            "Watching CountIncremented on {} (Ctrl-C to stop)",
            display_address(contract.address())
        );
    }
    while let Some(event) = events.recv().await {
        let count = event
            .event
            .first()
            .cloned()
            .and_then(Token::into_uint)
            .map(|v| v.to_string())
            .unwrap_or_default();
        Output::new(session.json)
            .compact()
            .field("count", &count)
            .field_u64("block_number", event.log.block_number)
            .field_u64("log_index", event.log.log_index)
            .field("tx_hash", &event.log.transaction_hash.to_hex())
            .message(&format!(
                "[block {}] count = {count} ({})",
                event.log.block_number, event.log.transaction_hash
            ))
            .print();
    }

    watcher
        .await
        .map_err(|e| CliError::Task(e.to_string()))??;
    Ok(())
}
