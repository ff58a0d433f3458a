//! Flow options, outcome and error definitions.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::chain::{Balance, ChainError, GasLimit, TxStatus, Weight, H256};
use crate::config::{ClientConfig, ConfigError, EstimateFailurePolicy};
use crate::contract::{ContractError, QueryOptions, QueryResult};
use crate::wallet::{InjectedAccount, WalletError};

/// Errors that end a flow run.
#[derive(Debug, Error)]
pub enum FlowError {
    /// No wallet extension authorized the application.
    #[error("no wallet extension authorized the application")]
    NoExtensions,

    /// The enabled extensions expose no accounts.
    #[error("no accounts available in the enabled extensions")]
    NoAccounts,

    /// The configured account is not exposed by any extension.
    #[error("account {0} is not exposed by any enabled extension")]
    AccountNotFound(String),

    /// The gas estimate reported a failure and the policy is to abort.
    #[error("gas estimate for '{message}' failed: {reason}")]
    EstimateFailed { message: String, reason: String },

    /// The extrinsic reached a terminal status other than finalized.
    #[error("transaction not finalized: {0}")]
    TxFailed(TxStatus),

    /// The node stopped sending status updates before finalization.
    #[error("status stream closed before finalization")]
    StatusStreamClosed,

    #[error("transaction not finalized within {0}s")]
    FinalizationTimeout(u64),

    /// The configuration does not fit the loaded contract interface.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Contract(ContractError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl From<ContractError> for FlowError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::Chain(e) => FlowError::Chain(e),
            other => FlowError::Contract(other),
        }
    }
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// What a flow run does and how it reacts to failures.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// Label shown to the wallet when asking for access.
    pub app_name: String,
    /// Account to use instead of the first one.
    pub account: Option<String>,
    pub query_message: String,
    pub query_args: Vec<Value>,
    pub tx_message: String,
    pub tx_args: Vec<Value>,
    /// Limits for the read before and after the transaction.
    pub query_options: QueryOptions,
    pub storage_deposit_limit: Option<Balance>,
    pub on_estimate_failure: EstimateFailurePolicy,
    /// Bound on waiting for finalization after submission.
    pub finalization_timeout: Duration,
}

impl FlowOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            app_name: config.wallet.app_name.clone(),
            account: config.wallet.account.clone(),
            query_message: config.contract.query_message.clone(),
            query_args: config.contract.query_args.clone(),
            tx_message: config.contract.tx_message.clone(),
            tx_args: config.contract.tx_args.clone(),
            query_options: QueryOptions {
                gas_limit: GasLimit::from(config.contract.query_gas_limit.map(Weight::from)),
                storage_deposit_limit: config.contract.storage_deposit_limit,
                value: 0,
            },
            storage_deposit_limit: config.contract.storage_deposit_limit,
            on_estimate_failure: config.flow.on_estimate_failure,
            finalization_timeout: Duration::from_secs(config.flow.finalization_timeout_secs),
        }
    }
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Everything a successful run observed.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub account: InjectedAccount,
    /// Read before the transaction.
    pub before: QueryResult,
    pub estimate: QueryResult,
    pub tx_hash: H256,
    /// Last block the extrinsic was seen in before finalization.
    pub in_block: Option<H256>,
    pub finalized: H256,
    /// Read after finalization.
    pub after: QueryResult,
    /// Every status received, in order.
    pub statuses: Vec<TxStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightConfig;

    #[test]
    fn test_options_from_default_config() {
        let options = FlowOptions::default();
        assert_eq!(options.app_name, "my cool dapp");
        assert_eq!(options.query_message, "get");
        assert_eq!(options.tx_message, "flip");
        assert!(options.tx_args.is_empty());
        assert_eq!(options.query_options.gas_limit, GasLimit::Unlimited);
        assert_eq!(options.on_estimate_failure, EstimateFailurePolicy::Abort);
    }

    #[test]
    fn test_options_carry_query_gas_limit() {
        let mut config = ClientConfig::default();
        config.contract.query_gas_limit = Some(WeightConfig {
            ref_time: 5,
            proof_size: 6,
        });
        let options = FlowOptions::from_config(&config);
        assert_eq!(options.query_options.gas_limit, GasLimit::Limited(Weight::new(5, 6)));
    }

    #[test]
    fn test_signing_failure_maps_to_chain_error() {
        let err: FlowError = ContractError::Chain(ChainError::Signing("declined".to_string())).into();
        assert!(matches!(err, FlowError::Chain(ChainError::Signing(_))));
        let err: FlowError = ContractError::UnknownMessage("flap".to_string()).into();
        assert!(matches!(err, FlowError::Contract(_)));
    }
}
