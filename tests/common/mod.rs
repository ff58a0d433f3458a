//! Shared mock collaborators for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, SinkExt, StreamExt};
use parity_scale_codec::Encode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use flipper_client::chain::{
    ChainError, ChainResult, ContractCallRequest, ContractCallTx, ContractExecResult, DispatchError,
    ExecReturnValue, NodeApi, StorageDeposit, TxProgress, TxStatus, Weight, H256,
};
use flipper_client::contract::{ContractHandle, ContractMetadata};
use flipper_client::wallet::{
    AccountMeta, InjectedAccount, InjectedExtension, Signer, SignerPayload, SignerResult,
    WalletBridge, WalletError, WalletResult,
};
use flipper_client::{Flow, FlowOptions};

/// Account used by the end-to-end scenario.
pub const SCENARIO_ACCOUNT: &str = "5F8Re8dN4B8eDZqJDmPeLkYaQ14KjK3Bt8qZxQmg5PzYg6Qg";

/// Contract address used by the mocks.
pub const CONTRACT_ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

const GET_SELECTOR: [u8; 4] = [0x2f, 0x86, 0x5b, 0xd9];
const FLIP_SELECTOR: [u8; 4] = [0x63, 0x3a, 0xa5, 0x51];
pub const INC_SELECTOR: [u8; 4] = [0x1d, 0x32, 0x61, 0x9f];

/// `by` argument of an encoded `inc` call.
fn inc_amount(data: &[u8]) -> ChainResult<i32> {
    let bytes: [u8; 4] = data
        .get(4..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ChainError::Codec("inc without argument".to_string()))?;
    Ok(i32::from_le_bytes(bytes))
}

/// Ordered record of collaborator calls, shared by node and wallet mocks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

pub fn block(n: u8) -> H256 {
    H256([n; 32])
}

/// In-memory flipper contract behind [`NodeApi`].
pub struct MockNode {
    log: CallLog,
    value: AtomicI32,
    pub gas_required: Weight,
    /// Statuses played back after submission.
    pub statuses: Mutex<Vec<ChainResult<TxStatus>>>,
    /// Never send a status after submission.
    pub hang: AtomicBool,
    /// Reads fail with a dispatch error.
    pub fail_reads: AtomicBool,
    /// The `flip` dry run fails with a dispatch error.
    pub fail_estimate: AtomicBool,
    pub requests: Mutex<Vec<ContractCallRequest>>,
    pub submitted: Mutex<Vec<ContractCallTx>>,
}

impl MockNode {
    pub fn new(log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            value: AtomicI32::new(0),
            gas_required: Weight::new(1_234_567_890, 17_408),
            statuses: Mutex::new(vec![
                Ok(TxStatus::Ready),
                Ok(TxStatus::Broadcast(vec!["12D3KooWpeer".to_string()])),
                Ok(TxStatus::InBlock(block(1))),
                Ok(TxStatus::Finalized(block(1))),
            ]),
            hang: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_estimate: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn set_statuses(&self, statuses: Vec<TxStatus>) {
        *self.statuses.lock().unwrap() = statuses.into_iter().map(Ok).collect();
    }

    fn exec(&self, result: Result<ExecReturnValue, DispatchError>) -> ContractExecResult {
        ContractExecResult {
            gas_consumed: Weight::new(self.gas_required.ref_time / 2, self.gas_required.proof_size / 2),
            gas_required: self.gas_required,
            storage_deposit: StorageDeposit::Charge(0),
            debug_message: Vec::new(),
            result,
        }
    }
}

#[async_trait]
impl NodeApi for MockNode {
    async fn call_contract(&self, request: &ContractCallRequest) -> ChainResult<ContractExecResult> {
        self.requests.lock().unwrap().push(request.clone());
        let selector: [u8; 4] = request.input_data[..4]
            .try_into()
            .map_err(|_| ChainError::Codec("short input".to_string()))?;

        match selector {
            GET_SELECTOR => {
                self.log.push("call:get");
                if self.fail_reads.load(Ordering::SeqCst) {
                    return Ok(self.exec(Err(DispatchError::BadOrigin)));
                }
                let data = Ok::<i32, ()>(self.value.load(Ordering::SeqCst)).encode();
                Ok(self.exec(Ok(ExecReturnValue { flags: 0, data })))
            }
            FLIP_SELECTOR => {
                self.log.push("call:flip");
                if self.fail_estimate.load(Ordering::SeqCst) {
                    return Ok(self.exec(Err(DispatchError::Exhausted)));
                }
                Ok(self.exec(Ok(ExecReturnValue { flags: 0, data: vec![0] })))
            }
            INC_SELECTOR => {
                inc_amount(&request.input_data)?;
                self.log.push("call:inc");
                Ok(self.exec(Ok(ExecReturnValue { flags: 0, data: vec![0] })))
            }
            other => Err(ChainError::UnexpectedResponse(format!("unknown selector {:?}", other))),
        }
    }

    async fn sign_and_submit(&self, call: &ContractCallTx, signer: &dyn Signer) -> ChainResult<TxProgress> {
        let payload = SignerPayload {
            address: call.origin.to_string(),
            block_hash: block(0).to_string(),
            block_number: "0x00000000".to_string(),
            era: "0x00".to_string(),
            genesis_hash: block(0).to_string(),
            method: format!("0x{}", hex::encode(call.encode_call(18, 6))),
            nonce: "0x00000000".to_string(),
            signed_extensions: Vec::new(),
            spec_version: "0x00000044".to_string(),
            tip: "0x00000000000000000000000000000000".to_string(),
            transaction_version: "0x00000011".to_string(),
            version: 4,
            with_signed_transaction: true,
        };
        signer
            .sign_payload(&payload)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        self.log.push("submit");
        self.submitted.lock().unwrap().push(call.clone());
        if call.data.starts_with(&INC_SELECTOR) {
            self.value.fetch_add(inc_amount(&call.data)?, Ordering::SeqCst);
        } else {
            let current = self.value.load(Ordering::SeqCst);
            self.value.store(if current == 0 { 1 } else { 0 }, Ordering::SeqCst);
        }

        if self.hang.load(Ordering::SeqCst) {
            return Ok(TxProgress::new(block(9), stream::pending()));
        }
        let statuses = std::mem::take(&mut *self.statuses.lock().unwrap());
        Ok(TxProgress::new(block(9), stream::iter(statuses)))
    }
}

/// Wallet with fixed extensions and accounts.
pub struct MockWallet {
    log: CallLog,
    pub extensions: Vec<InjectedExtension>,
    pub accounts: Vec<InjectedAccount>,
    pub reject_signing: AtomicBool,
}

impl MockWallet {
    pub fn new(log: CallLog, addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            log,
            extensions: vec![InjectedExtension {
                name: "polkadot-js".to_string(),
                endpoint: "ws://127.0.0.1:9955".to_string(),
            }],
            accounts: addresses.iter().map(|a| account(a)).collect(),
            reject_signing: AtomicBool::new(false),
        })
    }

    pub fn without_extensions(log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            extensions: Vec::new(),
            accounts: Vec::new(),
            reject_signing: AtomicBool::new(false),
        })
    }
}

pub fn account(address: &str) -> InjectedAccount {
    InjectedAccount {
        address: address.to_string(),
        meta: AccountMeta {
            name: Some("dev".to_string()),
            source: "polkadot-js".to_string(),
            genesis_hash: None,
        },
        key_type: Some("sr25519".to_string()),
    }
}

#[async_trait]
impl WalletBridge for MockWallet {
    async fn enable(&self, app_name: &str) -> WalletResult<Vec<InjectedExtension>> {
        self.log.push(format!("enable:{}", app_name));
        Ok(self.extensions.clone())
    }

    async fn accounts(&self) -> WalletResult<Vec<InjectedAccount>> {
        self.log.push("accounts");
        Ok(self.accounts.clone())
    }

    async fn signer(&self, address: &str) -> WalletResult<Arc<dyn Signer>> {
        self.log.push("signer");
        if !self.accounts.iter().any(|a| a.address == address) {
            return Err(WalletError::UnknownAccount(address.to_string()));
        }
        Ok(Arc::new(MockSigner {
            log: self.log.clone(),
            reject: self.reject_signing.load(Ordering::SeqCst),
        }))
    }
}

struct MockSigner {
    log: CallLog,
    reject: bool,
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign_payload(&self, _payload: &SignerPayload) -> WalletResult<SignerResult> {
        self.log.push("sign");
        if self.reject {
            return Err(WalletError::Rejected("Cancelled".to_string()));
        }
        Ok(SignerResult {
            id: 1,
            signature: format!("0x{}", "11".repeat(64)),
            signed_transaction: Some("0x1234".to_string()),
        })
    }
}

/// A flow over the mocks with default options.
pub fn flow(node: Arc<MockNode>, wallet: Arc<MockWallet>, options: FlowOptions) -> Flow {
    let metadata = Arc::new(ContractMetadata::embedded().unwrap());
    let contract = ContractHandle::new(node, metadata, CONTRACT_ADDRESS.parse().unwrap());
    Flow::new(contract, wallet, options)
}

/// Reserve a local port that nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `condition` until it holds or a second passes.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub const GENESIS_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
pub const BEST_HASH: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";
pub const BEST_NUMBER: u64 = 0x10;

/// Value the WebSocket node's contract reports for `get`.
pub const WS_NODE_VALUE: i32 = 7;

/// In-process node speaking JSON-RPC over WebSocket.
pub struct WsNode {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
}

impl WsNode {
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Methods received so far, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn has_received(&self, method: &str) -> bool {
        self.received().iter().any(|m| m == method)
    }
}

pub async fn start_ws_node() -> WsNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let text = match message {
                        Message::Text(text) => text.as_str().to_string(),
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    let request: Value = serde_json::from_str(&text).unwrap();
                    log.lock()
                        .unwrap()
                        .push(request["method"].as_str().unwrap_or_default().to_string());
                    for frame in node_response(&request) {
                        if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    WsNode { addr, received }
}

fn header_json(number: u64) -> Value {
    json!({
        "parentHash": GENESIS_HASH,
        "number": format!("{:#x}", number),
        "stateRoot": BEST_HASH,
        "extrinsicsRoot": BEST_HASH,
        "digest": {"logs": []}
    })
}

fn notification(method: &str, subscription: &str, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": {"subscription": subscription, "result": result}
    })
}

fn exec_result_hex(input: &[u8]) -> String {
    let data = if input.ends_with(&GET_SELECTOR) {
        Ok::<i32, ()>(WS_NODE_VALUE).encode()
    } else {
        vec![0]
    };
    let result = ContractExecResult {
        gas_consumed: Weight::new(1_000, 10),
        gas_required: Weight::new(2_000, 20),
        storage_deposit: StorageDeposit::Charge(0),
        debug_message: Vec::new(),
        result: Ok(ExecReturnValue { flags: 0, data }),
    };
    let mut bytes = result.encode();
    // Trailing `events: None` as newer runtimes send it.
    bytes.push(0);
    format!("0x{}", hex::encode(bytes))
}

fn node_response(request: &Value) -> Vec<Value> {
    let id = request["id"].clone();
    let params = &request["params"];
    let ok = |result: Value| json!({"jsonrpc": "2.0", "id": id, "result": result});
    let error = |code: i64, message: &str, data: &str| {
        json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message, "data": data}})
    };

    match request["method"].as_str().unwrap_or_default() {
        "system_chain" => vec![ok(json!("Aleph Zero Testnet"))],
        "chain_getBlockHash" if params[0] == json!(0) => vec![ok(json!(GENESIS_HASH))],
        "chain_getBlockHash" => vec![ok(json!(BEST_HASH))],
        "state_getRuntimeVersion" => vec![ok(json!({
            "specName": "aleph-node",
            "implName": "aleph-node",
            "specVersion": 68,
            "implVersion": 1,
            "transactionVersion": 17,
            "apis": []
        }))],
        "chain_getHeader" => vec![ok(header_json(BEST_NUMBER))],
        "system_accountNextIndex" => vec![ok(json!(5))],
        "state_call" if params[0] == json!("ContractsApi_call") => {
            let args = params[1].as_str().unwrap_or_default().trim_start_matches("0x");
            let input = hex::decode(args).unwrap_or_default();
            vec![ok(json!(exec_result_hex(&input)))]
        }
        "state_call" => vec![error(-32000, "Client error", "Execution failed: exported method not found")],
        "author_submitAndWatchExtrinsic" => vec![
            ok(json!("watch-1")),
            notification("author_extrinsicUpdate", "watch-1", json!("ready")),
            notification("author_extrinsicUpdate", "watch-1", json!({"inBlock": BEST_HASH})),
            notification("author_extrinsicUpdate", "watch-1", json!({"finalized": BEST_HASH})),
        ],
        "chain_subscribeNewHeads" => {
            let mut frames = vec![ok(json!("heads-1"))];
            for n in 0..3 {
                frames.push(notification("chain_newHead", "heads-1", header_json(BEST_NUMBER + n)));
            }
            frames
        }
        "author_unwatchExtrinsic" | "chain_unsubscribeNewHeads" => vec![ok(json!(true))],
        _ => vec![error(-32601, "Method not found", "")],
    }
}

/// In-process wallet extension speaking the page protocol.
pub struct ExtensionServer {
    pub addr: SocketAddr,
    sign_requests: Arc<Mutex<Vec<Value>>>,
}

impl ExtensionServer {
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Payloads received with `pub(extrinsic.sign)`.
    pub fn sign_requests(&self) -> Vec<Value> {
        self.sign_requests.lock().unwrap().clone()
    }
}

pub async fn start_extension(addresses: &[&str], authorize: bool) -> ExtensionServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let sign_requests = Arc::new(Mutex::new(Vec::new()));
    let accounts: Vec<Value> = addresses
        .iter()
        .map(|a| json!({"address": a, "name": "dev", "type": "sr25519"}))
        .collect();
    let log = sign_requests.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = log.clone();
            let accounts = accounts.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let text = match message {
                        Message::Text(text) => text.as_str().to_string(),
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    let request: Value = serde_json::from_str(&text).unwrap();
                    let id = request["id"].clone();
                    let reply = match request["message"].as_str().unwrap_or_default() {
                        "pub(authorize.tab)" => json!({"id": id, "response": authorize}),
                        "pub(accounts.list)" => json!({"id": id, "response": accounts}),
                        "pub(extrinsic.sign)" => {
                            log.lock().unwrap().push(request["request"].clone());
                            json!({"id": id, "response": {
                                "id": 1,
                                "signature": format!("0x{}", "22".repeat(64)),
                                "signedTransaction": "0x1234"
                            }})
                        }
                        other => json!({"id": id, "error": format!("Unknown message {}", other)}),
                    };
                    if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    ExtensionServer { addr, sign_requests }
}
