//! Node client, contract handle and extension bridge over real WebSocket
//! sessions against in-process servers.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;

use common::{
    closed_port, start_extension, start_ws_node, wait_for, BEST_HASH, BEST_NUMBER, CONTRACT_ADDRESS,
    GENESIS_HASH, SCENARIO_ACCOUNT, WS_NODE_VALUE,
};
use flipper_client::chain::{
    blake2_256, AccountId, ChainError, ContractCallTx, NodeApi, NodeClient, TxStatus, Weight, H256,
};
use flipper_client::config::{
    ChainConfig, ClientConfig, ConfigError, ExtensionEndpoint, NodeConfig, WalletConfig,
};
use flipper_client::contract::{ContractHandle, ContractMetadata, QueryOptions};
use flipper_client::rpc::RpcError;
use flipper_client::wallet::{
    ExtensionBridge, Signer, SignerPayload, SignerResult, WalletBridge, WalletError, WalletResult,
};
use flipper_client::{FlowError, FlowOptions, Session};

struct FixedSigner;

#[async_trait]
impl Signer for FixedSigner {
    async fn sign_payload(&self, _payload: &SignerPayload) -> WalletResult<SignerResult> {
        Ok(SignerResult {
            id: 1,
            signature: "0x00".to_string(),
            signed_transaction: Some("0x1234".to_string()),
        })
    }
}

fn node_config(endpoint: String) -> NodeConfig {
    NodeConfig {
        endpoint,
        connect_attempts: 2,
        backoff_base_ms: 1,
        backoff_max_ms: 5,
        ..NodeConfig::default()
    }
}

async fn connect(endpoint: String) -> NodeClient {
    NodeClient::connect(&node_config(endpoint), ChainConfig::default())
        .await
        .unwrap()
}

fn hash(s: &str) -> H256 {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_chain_info() {
    let server = start_ws_node().await;
    let node = connect(server.endpoint()).await;

    let info = node.chain_info().await.unwrap();

    assert_eq!(info.chain, "Aleph Zero Testnet");
    assert_eq!(info.genesis_hash, hash(GENESIS_HASH));
    assert_eq!(info.runtime.spec_version, 68);
    assert_eq!(info.runtime.transaction_version, 17);
    assert_eq!(info.best_number, BEST_NUMBER);
    assert_eq!(info.best_hash, hash(BEST_HASH));
    node.close().await;
}

#[tokio::test]
async fn test_contract_query_over_websocket() {
    let server = start_ws_node().await;
    let node = Arc::new(connect(server.endpoint()).await);
    let contract = ContractHandle::new(
        node.clone(),
        Arc::new(ContractMetadata::embedded().unwrap()),
        CONTRACT_ADDRESS.parse().unwrap(),
    );
    let caller: AccountId = SCENARIO_ACCOUNT.parse().unwrap();

    let result = contract
        .query(&caller, "get", &[], &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(result.output(), Some(&json!(WS_NODE_VALUE)));
    assert_eq!(result.gas_required, Weight::new(2_000, 20));
    assert!(server.has_received("state_call"));
    node.close().await;
}

#[tokio::test]
async fn test_submit_and_watch_until_finalized() {
    let server = start_ws_node().await;
    let node = connect(server.endpoint()).await;
    let call = ContractCallTx {
        origin: SCENARIO_ACCOUNT.parse().unwrap(),
        dest: CONTRACT_ADDRESS.parse().unwrap(),
        value: 0,
        gas_limit: Weight::new(2_000, 20),
        storage_deposit_limit: None,
        data: vec![0x63, 0x3a, 0xa5, 0x51],
    };

    let mut progress = node.sign_and_submit(&call, &FixedSigner).await.unwrap();

    assert_eq!(progress.tx_hash(), blake2_256(&[0x12, 0x34]));
    assert_eq!(progress.next_status().await.unwrap().unwrap(), TxStatus::Ready);
    assert_eq!(
        progress.next_status().await.unwrap().unwrap(),
        TxStatus::InBlock(hash(BEST_HASH))
    );
    assert_eq!(
        progress.next_status().await.unwrap().unwrap(),
        TxStatus::Finalized(hash(BEST_HASH))
    );
    assert!(server.has_received("system_accountNextIndex"));
    assert!(server.has_received("state_getRuntimeVersion"));

    drop(progress);
    assert!(wait_for(|| server.has_received("author_unwatchExtrinsic")).await);
    node.close().await;
}

#[tokio::test]
async fn test_dropping_heads_unsubscribes() {
    let server = start_ws_node().await;
    let node = connect(server.endpoint()).await;

    let mut heads = node.subscribe_new_heads().await.unwrap();
    let first = heads.next().await.unwrap().unwrap();
    let second = heads.next().await.unwrap().unwrap();
    assert_eq!(first.number, BEST_NUMBER);
    assert_eq!(second.number, BEST_NUMBER + 1);

    drop(heads);
    assert!(wait_for(|| server.has_received("chain_unsubscribeNewHeads")).await);
    node.close().await;
}

#[tokio::test]
async fn test_server_error_is_surfaced() {
    let server = start_ws_node().await;
    let node = connect(server.endpoint()).await;

    let err = node.state_call("Missing_api", &[]).await.unwrap_err();

    assert!(matches!(err, ChainError::Rpc(RpcError::Server { code: -32000, .. })));
    node.close().await;
}

#[tokio::test]
async fn test_requests_fail_after_close() {
    let server = start_ws_node().await;
    let node = connect(server.endpoint()).await;

    node.close().await;
    let err = node.chain_name().await.unwrap_err();

    assert!(matches!(err, ChainError::Rpc(RpcError::ConnectionClosed)));
}

#[tokio::test]
async fn test_connect_gives_up_after_retries() {
    let endpoint = format!("ws://{}", closed_port().await);

    let err = NodeClient::connect(&node_config(endpoint), ChainConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::Rpc(RpcError::Transport(_))));
}

fn wallet_config(extensions: Vec<ExtensionEndpoint>) -> WalletConfig {
    WalletConfig {
        extensions,
        ..WalletConfig::default()
    }
}

#[tokio::test]
async fn test_extension_bridge_enable_accounts_sign() {
    let extension = start_extension(&[SCENARIO_ACCOUNT], true).await;
    let bridge = ExtensionBridge::new(&wallet_config(vec![
        ExtensionEndpoint {
            name: "polkadot-js".to_string(),
            endpoint: extension.endpoint(),
        },
        ExtensionEndpoint {
            name: "unreachable".to_string(),
            endpoint: format!("ws://{}", closed_port().await),
        },
    ]));

    let enabled = bridge.enable("my cool dapp").await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].name, "polkadot-js");

    let accounts = bridge.accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].address, SCENARIO_ACCOUNT);
    assert_eq!(accounts[0].meta.source, "polkadot-js");
    assert_eq!(accounts[0].meta.name.as_deref(), Some("dev"));

    let signer = bridge.signer(SCENARIO_ACCOUNT).await.unwrap();
    let payload = SignerPayload {
        address: SCENARIO_ACCOUNT.to_string(),
        block_hash: GENESIS_HASH.to_string(),
        block_number: "0x00000000".to_string(),
        era: "0x00".to_string(),
        genesis_hash: GENESIS_HASH.to_string(),
        method: "0x1206".to_string(),
        nonce: "0x00000005".to_string(),
        signed_extensions: vec!["CheckNonce".to_string()],
        spec_version: "0x00000044".to_string(),
        tip: "0x00000000000000000000000000000000".to_string(),
        transaction_version: "0x00000011".to_string(),
        version: 4,
        with_signed_transaction: true,
    };
    let signed = signer.sign_payload(&payload).await.unwrap();
    assert_eq!(signed.signed_transaction.as_deref(), Some("0x1234"));

    let requests = extension.sign_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["address"], json!(SCENARIO_ACCOUNT));
    assert_eq!(requests[0]["withSignedTransaction"], json!(true));

    assert!(matches!(
        bridge.signer("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty").await,
        Err(WalletError::UnknownAccount(_))
    ));
    bridge.close().await;
}

#[tokio::test]
async fn test_declined_extension_is_not_enabled() {
    let extension = start_extension(&[SCENARIO_ACCOUNT], false).await;
    let bridge = ExtensionBridge::new(&wallet_config(vec![ExtensionEndpoint {
        name: "polkadot-js".to_string(),
        endpoint: extension.endpoint(),
    }]));

    let enabled = bridge.enable("my cool dapp").await.unwrap();

    assert!(enabled.is_empty());
    assert!(matches!(bridge.accounts().await, Err(WalletError::NotEnabled)));
}

#[tokio::test]
async fn test_session_runs_the_flow_end_to_end() {
    let server = start_ws_node().await;
    let extension = start_extension(&[SCENARIO_ACCOUNT], true).await;

    let mut config = ClientConfig::default();
    config.node = node_config(server.endpoint());
    config.contract.address = CONTRACT_ADDRESS.to_string();
    config.wallet.extensions = vec![ExtensionEndpoint {
        name: "polkadot-js".to_string(),
        endpoint: extension.endpoint(),
    }];

    let session = Session::open(&config).await.unwrap();
    let report = session.flow(FlowOptions::from_config(&config)).run().await.unwrap();

    assert_eq!(report.account.address, SCENARIO_ACCOUNT);
    assert_eq!(report.before.output(), Some(&json!(WS_NODE_VALUE)));
    assert_eq!(report.after.output(), Some(&json!(WS_NODE_VALUE)));
    assert_eq!(report.in_block, Some(hash(BEST_HASH)));
    assert_eq!(report.finalized, hash(BEST_HASH));
    assert_eq!(report.tx_hash, blake2_256(&[0x12, 0x34]));
    assert_eq!(extension.sign_requests().len(), 1);

    session.close().await;
    assert!(wait_for(|| server.has_received("author_unwatchExtrinsic")).await);
}

#[tokio::test]
async fn test_session_rejects_message_arguments_that_do_not_fit() {
    let mut config = ClientConfig::default();
    config.node = node_config(format!("ws://{}", closed_port().await));
    config.contract.tx_message = "inc".to_string();

    let err = Session::open(&config).await.unwrap_err();

    assert!(matches!(err, FlowError::Config(ConfigError::Validation(ref errors)) if errors[0].field == "contract.tx_args"));
}
