//! The node operations contract calls depend on.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};

use crate::chain::contracts::{ContractCallRequest, ContractCallTx, ContractExecResult};
use crate::chain::types::{ChainError, ChainResult, TxStatus, H256};
use crate::rpc::Subscription;
use crate::wallet::Signer;

/// Node access needed by contract handles.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Dry-run a contract call against the best block.
    async fn call_contract(&self, request: &ContractCallRequest) -> ChainResult<ContractExecResult>;

    /// Sign `call` with `signer` and submit it, watching its status.
    async fn sign_and_submit(&self, call: &ContractCallTx, signer: &dyn Signer) -> ChainResult<TxProgress>;
}

/// Status updates of a submitted extrinsic.
///
/// Dropping it stops watching the extrinsic.
pub struct TxProgress {
    tx_hash: H256,
    statuses: BoxStream<'static, ChainResult<TxStatus>>,
}

impl TxProgress {
    pub fn new<S>(tx_hash: H256, statuses: S) -> Self
    where
        S: Stream<Item = ChainResult<TxStatus>> + Send + 'static,
    {
        Self {
            tx_hash,
            statuses: statuses.boxed(),
        }
    }

    /// Decode `author_extrinsicUpdate` notifications.
    pub fn from_subscription(tx_hash: H256, subscription: Subscription) -> Self {
        let statuses = subscription.map(|value| {
            serde_json::from_value::<TxStatus>(value)
                .map_err(|e| ChainError::UnexpectedResponse(format!("extrinsic status: {}", e)))
        });
        Self::new(tx_hash, statuses)
    }

    /// Hash of the submitted extrinsic.
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// Next status, or `None` once the node stops sending.
    pub async fn next_status(&mut self) -> Option<ChainResult<TxStatus>> {
        self.statuses.next().await
    }
}

impl std::fmt::Debug for TxProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxProgress").field("tx_hash", &self.tx_hash).finish()
    }
}
