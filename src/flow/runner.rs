//! The read, estimate, submit, observe, re-read sequence.
//!
//! # Responsibilities
//! - Gain wallet access and pick the account to act as
//! - Read contract state before and after the transaction
//! - Estimate gas and submit the mutating call with that estimate
//! - Follow the extrinsic until finalization or a terminal failure
//!
//! # Data Flow
//! ```text
//! WalletBridge::enable → accounts → select account
//!     → query (Before) → estimate → tx.sign_and_send
//!     → TxProgress: inBlock … finalized
//!     → query (After) → FlowReport
//! ```
//!
//! # Design Decisions
//! - Every step is awaited in order; nothing runs concurrently
//! - Status observation stops at finalization and drops the subscription
//!   before the final read

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::chain::{AccountId, TxProgress, TxStatus, H256};
use crate::config::EstimateFailurePolicy;
use crate::contract::{ContractHandle, QueryResult, TxOptions};
use crate::flow::types::{FlowError, FlowOptions, FlowReport, FlowResult};
use crate::observability::metrics;
use crate::resilience::deadline;
use crate::wallet::{InjectedAccount, WalletBridge};

/// Outcome of following one extrinsic to finalization.
struct Observation {
    in_block: Option<H256>,
    finalized: H256,
    after: QueryResult,
    statuses: Vec<TxStatus>,
}

/// Pick the configured account, or the first one.
pub fn select_account(accounts: Vec<InjectedAccount>, wanted: Option<&str>) -> FlowResult<InjectedAccount> {
    if accounts.is_empty() {
        return Err(FlowError::NoAccounts);
    }
    match wanted {
        Some(address) => accounts
            .into_iter()
            .find(|a| a.address == address)
            .ok_or_else(|| FlowError::AccountNotFound(address.to_string())),
        None => accounts.into_iter().next().ok_or(FlowError::NoAccounts),
    }
}

/// One contract interaction against one wallet.
pub struct Flow {
    contract: ContractHandle,
    wallet: Arc<dyn WalletBridge>,
    options: FlowOptions,
}

impl Flow {
    pub fn new(contract: ContractHandle, wallet: Arc<dyn WalletBridge>, options: FlowOptions) -> Self {
        Self {
            contract,
            wallet,
            options,
        }
    }

    /// Run the whole sequence once.
    pub async fn run(&self) -> FlowResult<FlowReport> {
        let span = tracing::info_span!("flow", run_id = %Uuid::new_v4());
        let result = self.execute().instrument(span).await;
        metrics::record_flow_run(result.is_ok());
        result
    }

    async fn execute(&self) -> FlowResult<FlowReport> {
        let extensions = self.wallet.enable(&self.options.app_name).await?;
        if extensions.is_empty() {
            return Err(FlowError::NoExtensions);
        }
        tracing::debug!(count = extensions.len(), "Wallet access enabled");

        let accounts = self.wallet.accounts().await?;
        let account = select_account(accounts, self.options.account.as_deref())?;
        let origin: AccountId = account.address.parse()?;
        tracing::info!(
            address = %account.address,
            source = %account.meta.source,
            "Personal address"
        );

        let before = self.read_state(&origin, "Before").await?;

        let message = self.options.tx_message.as_str();
        let args = self.options.tx_args.as_slice();
        let estimate = self.contract.estimate(&origin, message, args).await?;
        tracing::info!(
            call = message,
            outcome = estimate.outcome(),
            gas_required = %estimate.gas_required,
            storage_deposit = %estimate.storage_deposit,
            result = %describe(&estimate),
            "Gas estimate"
        );
        if let Err(reason) = &estimate.result {
            match self.options.on_estimate_failure {
                EstimateFailurePolicy::Abort => {
                    return Err(FlowError::EstimateFailed {
                        message: message.to_string(),
                        reason: reason.to_string(),
                    });
                }
                EstimateFailurePolicy::Continue => {
                    tracing::warn!(call = message, reason = %reason, "Estimate failed, submitting anyway");
                }
            }
        }

        let signer = self.wallet.signer(&account.address).await?;
        let tx = self.contract.tx(
            message,
            args,
            TxOptions {
                gas_limit: estimate.gas_required,
                storage_deposit_limit: self.options.storage_deposit_limit,
                value: 0,
            },
        )?;
        let progress = tx.sign_and_send(&origin, signer.as_ref()).await?;
        let tx_hash = progress.tx_hash();

        let timeout = self.options.finalization_timeout;
        let observation = deadline(timeout, self.observe(progress, &origin))
            .await
            .map_err(|_| FlowError::FinalizationTimeout(timeout.as_secs()))??;

        Ok(FlowReport {
            account,
            before,
            estimate,
            tx_hash,
            in_block: observation.in_block,
            finalized: observation.finalized,
            after: observation.after,
            statuses: observation.statuses,
        })
    }

    /// Query the read message; a failed call is logged, not raised.
    async fn read_state(&self, origin: &AccountId, label: &str) -> FlowResult<QueryResult> {
        let message = self.options.query_message.as_str();
        let result = self
            .contract
            .query(origin, message, &self.options.query_args, &self.options.query_options)
            .await?;

        match &result.result {
            Ok(value) => tracing::info!(label = label, call = message, value = %value, "Contract state"),
            Err(reason) => tracing::warn!(
                label = label,
                call = message,
                reason = %reason,
                debug_message = %result.debug_message,
                "Contract read returned an error"
            ),
        }
        Ok(result)
    }

    async fn observe(&self, mut progress: TxProgress, origin: &AccountId) -> FlowResult<Observation> {
        let mut in_block = None;
        let mut statuses = Vec::new();

        loop {
            let next = progress.next_status().await;
            let Some(status) = next else {
                return Err(FlowError::StatusStreamClosed);
            };
            let status = status?;
            metrics::record_tx_status(status.name());
            statuses.push(status.clone());

            match status {
                TxStatus::InBlock(block) => {
                    tracing::info!(block = %block, "Transaction in a block");
                    in_block = Some(block);
                }
                TxStatus::Finalized(block) => {
                    tracing::info!(block = %block, "Transaction finalized");
                    drop(progress);
                    let after = self.read_state(origin, "After").await?;
                    return Ok(Observation {
                        in_block,
                        finalized: block,
                        after,
                        statuses,
                    });
                }
                failed if failed.is_failure() => {
                    tracing::warn!(status = %failed, "Transaction will not be finalized");
                    return Err(FlowError::TxFailed(failed));
                }
                other => tracing::debug!(status = %other, "Transaction status"),
            }
        }
    }
}

fn describe(result: &QueryResult) -> String {
    match &result.result {
        Ok(Value::Null) => "()".to_string(),
        Ok(value) => value.to_string(),
        Err(e) => e.to_string(),
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("contract", &self.contract)
            .field("options", &self.options)
            .finish()
    }
}
