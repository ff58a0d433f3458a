//! Typed access to one deployed contract.
//!
//! # Responsibilities
//! - Look up messages by label and check argument counts
//! - Build call input (`selector ++ encoded args`)
//! - Dry-run messages and decode their output
//! - Prepare and submit signed calls
//!
//! # Data Flow
//! ```text
//! query / estimate → ContractCallRequest → NodeApi::call_contract
//!     → ContractExecResult → QueryResult (decoded output)
//! tx → PreparedTx → sign_and_send → NodeApi::sign_and_submit → TxProgress
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::chain::{
    AccountId, ContractCallRequest, ContractCallTx, DispatchError, ExecReturnValue, NodeApi,
    TxProgress,
};
use crate::contract::metadata::{ContractMetadata, MessageSpec};
use crate::contract::types::{CallError, ContractError, ContractResult, QueryOptions, QueryResult, TxOptions};
use crate::contract::value;
use crate::observability::metrics;
use crate::wallet::Signer;

/// A deployed contract: node access, interface description and address.
#[derive(Clone)]
pub struct ContractHandle {
    node: Arc<dyn NodeApi>,
    metadata: Arc<ContractMetadata>,
    address: AccountId,
}

impl ContractHandle {
    pub fn new(node: Arc<dyn NodeApi>, metadata: Arc<ContractMetadata>, address: AccountId) -> Self {
        Self {
            node,
            metadata,
            address,
        }
    }

    pub fn metadata(&self) -> &ContractMetadata {
        &self.metadata
    }

    fn encode_input(&self, message: &MessageSpec, args: &[Value]) -> ContractResult<Vec<u8>> {
        if args.len() != message.args.len() {
            return Err(ContractError::ArgumentCount {
                message: message.label.clone(),
                expected: message.args.len(),
                got: args.len(),
            });
        }

        let mut input = message.selector.to_vec();
        for (spec, arg) in message.args.iter().zip(args) {
            value::encode(self.metadata.registry(), spec.ty, arg, &mut input).map_err(|e| match e {
                ContractError::Encode(reason) => {
                    ContractError::Encode(format!("argument '{}': {}", spec.label, reason))
                }
                other => other,
            })?;
        }
        Ok(input)
    }

    /// Simulate `message` as `origin` without submitting anything.
    ///
    /// Contract-level failures are reported in [`QueryResult::result`]; only
    /// transport, encoding and decoding problems are errors.
    pub async fn query(
        &self,
        origin: &AccountId,
        message: &str,
        args: &[Value],
        options: &QueryOptions,
    ) -> ContractResult<QueryResult> {
        let spec = self.metadata.message(message)?;
        let request = ContractCallRequest {
            origin: *origin,
            dest: self.address,
            value: options.value,
            gas_limit: options.gas_limit,
            storage_deposit_limit: options.storage_deposit_limit,
            input_data: self.encode_input(spec, args)?,
        };

        let started = Instant::now();
        let exec = match self.node.call_contract(&request).await {
            Ok(exec) => exec,
            Err(e) => {
                metrics::record_contract_call(message, false, started);
                return Err(e.into());
            }
        };
        let result = self.decode_outcome(spec, exec.result)?;
        metrics::record_contract_call(message, result.is_ok(), started);

        tracing::debug!(
            call = message,
            gas_required = %exec.gas_required,
            storage_deposit = %exec.storage_deposit,
            ok = result.is_ok(),
            "Contract query"
        );

        Ok(QueryResult {
            gas_consumed: exec.gas_consumed,
            gas_required: exec.gas_required,
            storage_deposit: exec.storage_deposit,
            debug_message: String::from_utf8_lossy(&exec.debug_message).into_owned(),
            result,
        })
    }

    /// Dry-run `message` with no gas ceiling to learn what it needs.
    pub async fn estimate(&self, origin: &AccountId, message: &str, args: &[Value]) -> ContractResult<QueryResult> {
        self.query(origin, message, args, &QueryOptions::default()).await
    }

    /// Prepare a signed call of `message`.
    pub fn tx(&self, message: &str, args: &[Value], options: TxOptions) -> ContractResult<PreparedTx> {
        let spec = self.metadata.message(message)?;
        if !spec.mutates {
            tracing::warn!(call = message, "Submitting a transaction for a read-only message");
        }
        Ok(PreparedTx {
            node: Arc::clone(&self.node),
            message: spec.label.clone(),
            dest: self.address,
            data: self.encode_input(spec, args)?,
            options,
        })
    }

    fn decode_outcome(
        &self,
        spec: &MessageSpec,
        outcome: Result<ExecReturnValue, DispatchError>,
    ) -> ContractResult<Result<Value, CallError>> {
        let ret = match outcome {
            Ok(ret) => ret,
            Err(e) => return Ok(Err(CallError::Dispatch(e))),
        };
        let Some(ty) = spec.return_type else {
            return Ok(Ok(Value::Null));
        };
        let registry = self.metadata.registry();
        let wraps_lang_error = self.metadata.is_message_result(ty);

        if ret.did_revert() {
            let decoded = match value::decode_all(registry, ty, &ret.data) {
                Ok(decoded) => decoded,
                Err(_) => Value::String(format!("0x{}", hex::encode(&ret.data))),
            };
            return Ok(Err(match split_result(decoded) {
                (true, Err(lang)) if wraps_lang_error => CallError::Lang(lang),
                (_, Ok(data)) | (_, Err(data)) => CallError::Reverted(data),
            }));
        }

        let decoded = value::decode_all(registry, ty, &ret.data)?;
        if !wraps_lang_error {
            return Ok(Ok(decoded));
        }
        Ok(match split_result(decoded) {
            (_, Ok(value)) => Ok(value),
            (_, Err(lang)) => Err(CallError::Lang(lang)),
        })
    }
}

/// Split a decoded `{"Ok": v}` / `{"Err": e}`; anything else counts as `Ok`.
/// The flag tells whether the value had the `Result` shape.
fn split_result(decoded: Value) -> (bool, Result<Value, Value>) {
    if let Value::Object(object) = &decoded {
        if object.len() == 1 {
            if let Some(inner) = object.get("Ok") {
                return (true, Ok(inner.clone()));
            }
            if let Some(inner) = object.get("Err") {
                return (true, Err(inner.clone()));
            }
        }
    }
    (false, Ok(decoded))
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("contract", &self.metadata.name)
            .field("address", &self.address)
            .finish()
    }
}

/// A signed call ready to be submitted.
pub struct PreparedTx {
    node: Arc<dyn NodeApi>,
    message: String,
    dest: AccountId,
    data: Vec<u8>,
    options: TxOptions,
}

impl PreparedTx {
    /// Have `signer` sign the call as `origin` and submit it.
    pub async fn sign_and_send(&self, origin: &AccountId, signer: &dyn Signer) -> ContractResult<TxProgress> {
        let call = ContractCallTx {
            origin: *origin,
            dest: self.dest,
            value: self.options.value,
            gas_limit: self.options.gas_limit,
            storage_deposit_limit: self.options.storage_deposit_limit,
            data: self.data.clone(),
        };

        tracing::info!(
            call = %self.message,
            gas_limit = %self.options.gas_limit,
            "Signing and sending"
        );
        Ok(self.node.sign_and_submit(&call, signer).await?)
    }
}

impl std::fmt::Debug for PreparedTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedTx")
            .field("message", &self.message)
            .field("dest", &self.dest)
            .field("options", &self.options)
            .finish()
    }
}
