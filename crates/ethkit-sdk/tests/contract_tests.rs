//! Counter contract end to end against the in-memory node

mod common;

use std::time::Duration;

use common::{count_incremented_topic, dev_wallet, DevNode, ONE_ETHER};
use ethkit_sdk::abi::Token;
use ethkit_sdk::contract::{counter, counter_bytecode};
use ethkit_sdk::types::BlockId;
use ethkit_sdk::{
    ensure_success, Address, Capabilities, Contract, PipelineConfig, SdkError,
    TransactionPipeline, TxOptions, Wallet, U256,
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn pipeline() -> TransactionPipeline {
    TransactionPipeline::with_config(PipelineConfig {
        poll_interval_ms: 10,
        confirmation_timeout_secs: 5,
        ..Default::default()
    })
}

async fn deploy_counter(node: &DevNode, pipeline: &mut TransactionPipeline) -> Contract {
    let wallet = dev_wallet();
    let deployment = pipeline
        .deploy(node, &wallet, &counter_bytecode().unwrap(), &[], 500_000)
        .await
        .unwrap();
    let receipt = pipeline
        .await_confirmation(node, deployment.tx_hash, Duration::from_secs(5))
        .await
        .and_then(ensure_success)
        .unwrap();
    assert_eq!(receipt.contract_address, Some(deployment.address));
    counter(deployment.address).unwrap()
}

async fn count(contract: &Contract, node: &DevNode) -> U256 {
    let out = contract
        .call(node, "getCount", &[], BlockId::Latest)
        .await
        .unwrap();
    out[0].clone().into_uint().unwrap()
}

#[tokio::test]
async fn test_counter_scenario() {
    let node = DevNode::funded();
    let wallet = dev_wallet();
    let mut pipeline = pipeline();

    let contract = deploy_counter(&node, &mut pipeline).await;
    assert_eq!(count(&contract, &node).await, U256::zero());

    let mut events = contract
        .subscribe(&node, "CountIncremented", Some(0))
        .await
        .unwrap();

    let receipt = contract
        .transact(&mut pipeline, &node, &wallet, "increment", &[], TxOptions::default())
        .await
        .unwrap();
    assert!(receipt.is_success());
    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].topic0(), Some(&count_incremented_topic()));

    let event = timeout(WAIT, events.next()).await.unwrap().unwrap();
    assert_eq!(event.event, vec![Token::uint(1u64)]);
    assert_eq!(event.log.transaction_hash, receipt.transaction_hash);
    assert_eq!(event.log.address, *contract.address());

    assert_eq!(count(&contract, &node).await, U256::one());

    events.close();
    assert!(events.next().await.is_none());
    assert!(events.is_closed());
}

#[tokio::test]
async fn test_owner_reads_back() {
    let node = DevNode::funded();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;

    let out = contract
        .call(&node, "owner", &[], BlockId::Latest)
        .await
        .unwrap();
    assert_eq!(out, vec![Token::Address(*dev_wallet().address())]);
}

#[tokio::test]
async fn test_set_count_then_increment() {
    let node = DevNode::funded();
    let wallet = dev_wallet();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;

    contract
        .transact(
            &mut pipeline,
            &node,
            &wallet,
            "setCount",
            &[Token::uint(41u64)],
            TxOptions::default(),
        )
        .await
        .and_then(ensure_success)
        .unwrap();
    contract
        .transact(&mut pipeline, &node, &wallet, "increment", &[], TxOptions::default())
        .await
        .and_then(ensure_success)
        .unwrap();

    assert_eq!(count(&contract, &node).await, U256::from(42u64));
}

#[tokio::test]
async fn test_non_owner_reset_reverts() {
    let node = DevNode::funded();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;

    let stranger = Wallet::new_random();
    node.fund(stranger.address(), ONE_ETHER);

    let receipt = contract
        .transact(&mut pipeline, &node, &stranger, "reset", &[], TxOptions::default())
        .await
        .unwrap();
    assert!(receipt.is_reverted());
    assert!(matches!(
        ensure_success(receipt),
        Err(SdkError::Reverted { .. })
    ));
}

#[tokio::test]
async fn test_wrong_argument_type_rejected_locally() {
    let node = DevNode::funded();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;
    let submitted = node.submissions().len();

    let err = contract
        .transact(
            &mut pipeline,
            &node,
            &dev_wallet(),
            "setCount",
            &[Token::String("ten".to_string())],
            TxOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::InvalidArgument(_)));
    assert_eq!(node.submissions().len(), submitted);
}

#[tokio::test]
async fn test_query_events_in_order() {
    let node = DevNode::funded();
    let wallet = dev_wallet();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;

    for _ in 0..3 {
        contract
            .transact(&mut pipeline, &node, &wallet, "increment", &[], TxOptions::default())
            .await
            .unwrap();
    }

    let events = contract
        .query_events(&node, "CountIncremented", 0, None)
        .await
        .unwrap();
    let counts: Vec<Token> = events.iter().map(|e| e.event[0].clone()).collect();
    assert_eq!(
        counts,
        vec![Token::uint(1u64), Token::uint(2u64), Token::uint(3u64)]
    );
    assert!(events.windows(2).all(|w| w[0].position() < w[1].position()));

    let last_block = events[2].log.block_number;
    let tail = contract
        .query_events(&node, "CountIncremented", last_block, Some(last_block))
        .await
        .unwrap();
    assert_eq!(tail.len(), 1);
}

#[tokio::test]
async fn test_history_then_live_increments() {
    let node = DevNode::funded();
    let wallet = dev_wallet();
    let mut pipeline = pipeline();
    let contract = deploy_counter(&node, &mut pipeline).await;

    contract
        .transact(&mut pipeline, &node, &wallet, "increment", &[], TxOptions::default())
        .await
        .unwrap();
    let mut events = contract
        .subscribe(&node, "CountIncremented", Some(0))
        .await
        .unwrap();
    contract
        .transact(&mut pipeline, &node, &wallet, "increment", &[], TxOptions::default())
        .await
        .unwrap();

    let first = timeout(WAIT, events.next()).await.unwrap().unwrap();
    let second = timeout(WAIT, events.next()).await.unwrap().unwrap();
    assert_eq!(first.event, vec![Token::uint(1u64)]);
    assert_eq!(second.event, vec![Token::uint(2u64)]);
}

#[tokio::test]
async fn test_read_only_binding_queries() {
    let node = DevNode::funded();
    let mut pipeline = pipeline();
    let deployed = deploy_counter(&node, &mut pipeline).await;

    let viewer = counter(*deployed.address())
        .unwrap()
        .with_capabilities(Capabilities::read_only());
    assert_eq!(count(&viewer, &node).await, U256::zero());
    assert!(viewer
        .subscribe(&node, "CountIncremented", None)
        .await
        .is_ok());

    let err = viewer
        .transact(
            &mut pipeline,
            &node,
            &dev_wallet(),
            "increment",
            &[],
            TxOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_call_on_missing_contract() {
    let node = DevNode::funded();
    let contract = counter(Address::from_bytes([0x42; 20])).unwrap();

    assert!(contract
        .call(&node, "getCount", &[], BlockId::Latest)
        .await
        .is_err());
}
