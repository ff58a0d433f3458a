//! Collaborators built from configuration, owned for one process run.

use std::path::Path;
use std::sync::Arc;

use crate::chain::{AccountId, NodeClient};
use crate::config::{validate_messages, ClientConfig, ConfigError};
use crate::contract::{ContractHandle, ContractMetadata};
use crate::flow::runner::Flow;
use crate::flow::types::{FlowOptions, FlowResult};
use crate::wallet::ExtensionBridge;

/// Node connection, wallet bridge and contract handle.
///
/// Call [`Session::close`] on every exit path.
pub struct Session {
    node: Arc<NodeClient>,
    wallet: Arc<ExtensionBridge>,
    contract: ContractHandle,
}

impl Session {
    /// Load the contract interface and connect to the node.
    pub async fn open(config: &ClientConfig) -> FlowResult<Self> {
        let metadata = match &config.contract.metadata_path {
            Some(path) => ContractMetadata::from_path(Path::new(path))?,
            None => ContractMetadata::embedded()?,
        };
        validate_messages(&config.contract, &metadata).map_err(ConfigError::Validation)?;
        let address: AccountId = config.contract.address.parse()?;

        let node = Arc::new(NodeClient::connect(&config.node, config.chain.clone()).await?);
        let wallet = Arc::new(ExtensionBridge::new(&config.wallet));
        let contract = ContractHandle::new(node.clone(), Arc::new(metadata), address);

        tracing::info!(
            contract = %contract.metadata().name,
            address = %address,
            messages = contract.metadata().messages().len(),
            "Session open"
        );
        Ok(Self {
            node,
            wallet,
            contract,
        })
    }

    pub fn node(&self) -> &NodeClient {
        &self.node
    }

    pub fn contract(&self) -> &ContractHandle {
        &self.contract
    }

    /// A flow over this session's contract and wallet.
    pub fn flow(&self, options: FlowOptions) -> Flow {
        Flow::new(self.contract.clone(), self.wallet.clone(), options)
    }

    /// Close wallet connections and the node session.
    pub async fn close(&self) {
        self.wallet.close().await;
        self.node.close().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("node", &self.node)
            .field("contract", &self.contract)
            .finish()
    }
}
