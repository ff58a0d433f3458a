//! Substrate node client with timeout and retry handling.
//!
//! # Responsibilities
//! - Connect to the node's WebSocket endpoint, retrying with backoff
//! - Query chain identity and head (name, genesis, runtime version, header)
//! - Dry-run contract calls through the `ContractsApi_call` runtime API
//! - Build the signer payload, submit signed extrinsics and watch them
//!
//! # Design Decisions
//! - Extrinsics are immortal and anchored at genesis, so no block lookup is
//!   needed between nonce query and submission
//! - The signer returns the complete signed extrinsic; this client never
//!   encodes the signed envelope itself

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use parity_scale_codec::Decode;
use serde_json::{json, Value};

use crate::chain::api::{NodeApi, TxProgress};
use crate::chain::contracts::{ContractCallRequest, ContractCallTx, ContractExecResult, CONTRACTS_API_CALL};
use crate::chain::types::{
    blake2_256, decode_hex, encode_hex, AccountId, ChainError, ChainInfo, ChainResult, Header,
    RuntimeVersion, H256,
};
use crate::config::{ChainConfig, NodeConfig};
use crate::resilience::{retry_with_backoff, BackoffPolicy};
use crate::rpc::RpcClient;
use crate::wallet::{Signer, SignerPayload};

/// Era byte of an immortal transaction.
const IMMORTAL_ERA: &str = "0x00";

/// Extrinsic format version advertised to the signer.
const EXTRINSIC_VERSION: u8 = 4;

/// Stream of new best-block headers.
pub type HeaderStream = BoxStream<'static, ChainResult<Header>>;

/// Connection to a Substrate node.
pub struct NodeClient {
    rpc: RpcClient,
    config: ChainConfig,
}

impl NodeClient {
    /// Connect to the configured endpoint.
    ///
    /// Retries with exponential backoff up to `node.connect_attempts` times.
    pub async fn connect(node: &NodeConfig, config: ChainConfig) -> ChainResult<Self> {
        let connect_timeout = Duration::from_secs(node.connect_timeout_secs);
        let request_timeout = Duration::from_secs(node.request_timeout_secs);

        let rpc = retry_with_backoff(BackoffPolicy::from_node_config(node), "connect", |_| {
            RpcClient::connect(&node.endpoint, connect_timeout, request_timeout)
        })
        .await?;

        tracing::info!(endpoint = %node.endpoint, "Node client connected");
        Ok(Self { rpc, config })
    }

    /// Human-readable chain name (`system_chain`).
    pub async fn chain_name(&self) -> ChainResult<String> {
        Ok(self.rpc.request("system_chain", json!([])).await?)
    }

    /// Hash of block 0.
    pub async fn genesis_hash(&self) -> ChainResult<H256> {
        Ok(self.rpc.request("chain_getBlockHash", json!([0])).await?)
    }

    /// Hash of the block at `number`.
    pub async fn block_hash(&self, number: u64) -> ChainResult<H256> {
        let hash: Option<H256> = self.rpc.request("chain_getBlockHash", json!([number])).await?;
        hash.ok_or_else(|| ChainError::UnexpectedResponse(format!("no block at height {}", number)))
    }

    pub async fn runtime_version(&self) -> ChainResult<RuntimeVersion> {
        Ok(self.rpc.request("state_getRuntimeVersion", json!([])).await?)
    }

    /// Header of the best block.
    pub async fn latest_header(&self) -> ChainResult<Header> {
        Ok(self.rpc.request("chain_getHeader", json!([])).await?)
    }

    /// Next usable nonce for `account`, counting pooled transactions.
    pub async fn account_next_index(&self, account: &AccountId) -> ChainResult<u32> {
        let address = account.to_ss58(self.config.ss58_prefix);
        Ok(self.rpc.request("system_accountNextIndex", json!([address])).await?)
    }

    /// Chain identity and current head.
    pub async fn chain_info(&self) -> ChainResult<ChainInfo> {
        let (chain, genesis_hash, runtime, header) = tokio::try_join!(
            self.chain_name(),
            self.genesis_hash(),
            self.runtime_version(),
            self.latest_header(),
        )?;
        let best_hash = self.block_hash(header.number).await?;

        Ok(ChainInfo {
            chain,
            genesis_hash,
            runtime,
            best_number: header.number,
            best_hash,
        })
    }

    /// Subscribe to new best-block headers.
    ///
    /// Dropping the stream unsubscribes.
    pub async fn subscribe_new_heads(&self) -> ChainResult<HeaderStream> {
        let subscription = self
            .rpc
            .subscribe("chain_subscribeNewHeads", json!([]), "chain_unsubscribeNewHeads")
            .await?;
        Ok(subscription
            .map(|value| {
                serde_json::from_value::<Header>(value)
                    .map_err(|e| ChainError::UnexpectedResponse(format!("header: {}", e)))
            })
            .boxed())
    }

    /// Call a runtime API function with SCALE-encoded arguments.
    pub async fn state_call(&self, method: &str, args: &[u8]) -> ChainResult<Vec<u8>> {
        let result: String = self
            .rpc
            .request("state_call", json!([method, encode_hex(args)]))
            .await?;
        decode_hex(&result)
    }

    /// Close the session, cancelling open subscriptions.
    pub async fn close(&self) {
        self.rpc.close().await;
        tracing::info!(endpoint = %self.rpc.endpoint(), "Node client closed");
    }

    async fn signer_payload(&self, origin: &AccountId, method: Vec<u8>) -> ChainResult<SignerPayload> {
        let (genesis_hash, runtime, nonce) = tokio::try_join!(
            self.genesis_hash(),
            self.runtime_version(),
            self.account_next_index(origin),
        )?;

        Ok(SignerPayload {
            address: origin.to_ss58(self.config.ss58_prefix),
            block_hash: genesis_hash.to_string(),
            block_number: format!("{:#010x}", 0u32),
            era: IMMORTAL_ERA.to_string(),
            genesis_hash: genesis_hash.to_string(),
            method: encode_hex(&method),
            nonce: format!("{:#010x}", nonce),
            signed_extensions: self.config.signed_extensions.clone(),
            spec_version: format!("{:#010x}", runtime.spec_version),
            tip: format!("{:#034x}", 0u128),
            transaction_version: format!("{:#010x}", runtime.transaction_version),
            version: EXTRINSIC_VERSION,
            with_signed_transaction: true,
        })
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn call_contract(&self, request: &ContractCallRequest) -> ChainResult<ContractExecResult> {
        let bytes = self.state_call(CONTRACTS_API_CALL, &request.encode_args()).await?;
        let result = ContractExecResult::decode(&mut bytes.as_slice())?;
        tracing::trace!(
            dest = %request.dest,
            gas_required = %result.gas_required,
            "Contract dry run complete"
        );
        Ok(result)
    }

    async fn sign_and_submit(&self, call: &ContractCallTx, signer: &dyn Signer) -> ChainResult<TxProgress> {
        let method = call.encode_call(self.config.contracts_pallet_index, self.config.contracts_call_index);
        let payload = self.signer_payload(&call.origin, method).await?;

        let signed = signer
            .sign_payload(&payload)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let extrinsic = signed
            .signed_transaction
            .ok_or_else(|| ChainError::Signing("signer returned no signed transaction".to_string()))?;
        let tx_hash = blake2_256(&decode_hex(&extrinsic)?);

        let subscription = self
            .rpc
            .subscribe(
                "author_submitAndWatchExtrinsic",
                Value::Array(vec![Value::String(extrinsic)]),
                "author_unwatchExtrinsic",
            )
            .await?;

        tracing::info!(tx_hash = %tx_hash, nonce = %payload.nonce, "Extrinsic submitted");
        Ok(TxProgress::from_subscription(tx_hash, subscription))
    }
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("endpoint", &self.rpc.endpoint())
            .field("ss58_prefix", &self.config.ss58_prefix)
            .finish()
    }
}
