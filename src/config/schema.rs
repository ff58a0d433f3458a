//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Public Aleph Zero testnet gateway.
pub const DEFAULT_ENDPOINT: &str = "wss://ws.test.azero.dev";

/// Deployed flipper contract on the testnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "5F8Re8dN4B8eDZqJDmPeLkYaQ14KjK3Bt8qZxQmg5PzYg6Qg";

/// Root configuration for the contract client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node connection settings.
    pub node: NodeConfig,

    /// Runtime-specific encoding parameters.
    pub chain: ChainConfig,

    /// Wallet bridge settings.
    pub wallet: WalletConfig,

    /// Target contract.
    pub contract: ContractConfig,

    /// Orchestration flow behavior.
    pub flow: FlowSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// WebSocket JSON-RPC endpoint.
    pub endpoint: String,

    /// Timeout for establishing the WebSocket session in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for a single RPC request in seconds.
    pub request_timeout_secs: u64,

    /// Connection attempts before giving up (1 = no retry).
    pub connect_attempts: u32,

    /// Base delay for exponential backoff between attempts in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            connect_attempts: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 4_000,
        }
    }
}

/// Runtime parameters needed to build a `Contracts::call` extrinsic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// SS58 address prefix used when formatting accounts.
    pub ss58_prefix: u16,

    /// Index of `pallet-contracts` in the runtime's `construct_runtime!`.
    pub contracts_pallet_index: u8,

    /// Index of the `call` dispatchable inside `pallet-contracts`.
    pub contracts_call_index: u8,

    /// Signed extensions advertised to the signer, in runtime order.
    pub signed_extensions: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            ss58_prefix: 42,
            contracts_pallet_index: 18,
            contracts_call_index: 6,
            signed_extensions: [
                "CheckNonZeroSender",
                "CheckSpecVersion",
                "CheckTxVersion",
                "CheckGenesis",
                "CheckMortality",
                "CheckNonce",
                "CheckWeight",
                "ChargeTransactionPayment",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Wallet bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Application label shown by the extension during consent.
    pub app_name: String,

    /// Extensions reachable through the bridge.
    pub extensions: Vec<ExtensionEndpoint>,

    /// Account to use instead of the first authorized one.
    pub account: Option<String>,

    /// Timeout for a single bridge request in seconds. Signing waits on the
    /// user, so this is generous.
    pub request_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            app_name: "my cool dapp".to_string(),
            extensions: Vec::new(),
            account: None,
            request_timeout_secs: 300,
        }
    }
}

/// One injected extension reachable over WebSocket.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtensionEndpoint {
    /// Extension name, reported as the account source.
    pub name: String,

    /// Bridge endpoint (e.g., "ws://127.0.0.1:9955").
    pub endpoint: String,
}

/// Target contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployed contract address (SS58).
    pub address: String,

    /// Interface description to load instead of the embedded one.
    pub metadata_path: Option<String>,

    /// Read-only message called before and after the transaction.
    pub query_message: String,

    /// Arguments for `query_message`, one JSON/TOML value per parameter.
    pub query_args: Vec<serde_json::Value>,

    /// Mutating message submitted as a transaction.
    pub tx_message: String,

    /// Arguments for `tx_message` (e.g., `[1]` for `inc`).
    pub tx_args: Vec<serde_json::Value>,

    /// Gas ceiling for read-only queries; `None` means unlimited.
    pub query_gas_limit: Option<WeightConfig>,

    /// Storage deposit ceiling; `None` means unlimited.
    pub storage_deposit_limit: Option<u128>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            metadata_path: None,
            query_message: "get".to_string(),
            query_args: Vec::new(),
            tx_message: "flip".to_string(),
            tx_args: Vec::new(),
            query_gas_limit: None,
            storage_deposit_limit: None,
        }
    }
}

/// Two-dimensional weight as written in config files.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct WeightConfig {
    pub ref_time: u64,
    pub proof_size: u64,
}

/// What to do when the gas estimate reports a failed call.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstimateFailurePolicy {
    /// Stop before submitting.
    #[default]
    Abort,
    /// Submit anyway with the reported gas requirement.
    Continue,
}

/// Orchestration flow settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Behavior on a failed gas estimate.
    pub on_estimate_failure: EstimateFailurePolicy,

    /// Upper bound on the wait for finalization in seconds.
    pub finalization_timeout_secs: u64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            on_estimate_failure: EstimateFailurePolicy::Abort,
            finalization_timeout_secs: 120,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_testnet() {
        let config = ClientConfig::default();
        assert_eq!(config.node.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.contract.address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.contract.query_message, "get");
        assert_eq!(config.contract.tx_message, "flip");
        assert_eq!(config.flow.on_estimate_failure, EstimateFailurePolicy::Abort);
        assert!(config.wallet.extensions.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [flow]
            on_estimate_failure = "continue"

            [[wallet.extensions]]
            name = "polkadot-js"
            endpoint = "ws://127.0.0.1:9955"
            "#,
        )
        .unwrap();

        assert_eq!(config.flow.on_estimate_failure, EstimateFailurePolicy::Continue);
        assert_eq!(config.flow.finalization_timeout_secs, 120);
        assert_eq!(config.wallet.extensions.len(), 1);
        assert_eq!(config.wallet.app_name, "my cool dapp");
        assert_eq!(config.chain.signed_extensions.len(), 8);
        assert!(config.contract.tx_args.is_empty());
    }

    #[test]
    fn test_message_args_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [contract]
            tx_message = "inc"
            tx_args = [1]
            "#,
        )
        .unwrap();

        assert_eq!(config.contract.tx_message, "inc");
        assert_eq!(config.contract.tx_args, vec![serde_json::json!(1)]);
        assert!(config.contract.query_args.is_empty());
    }
}
