//! Contract call results and error definitions.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::chain::contracts::DispatchError;
use crate::chain::{Balance, ChainError, GasLimit, StorageDeposit, Weight};

/// Errors raised by the contract layer itself (not by contract execution).
#[derive(Debug, Error)]
pub enum ContractError {
    /// Interface description is malformed or incomplete.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// No message with that label.
    #[error("unknown message '{0}'")]
    UnknownMessage(String),

    /// Wrong number of arguments for a message.
    #[error("message '{message}' takes {expected} argument(s), got {got}")]
    ArgumentCount {
        message: String,
        expected: usize,
        got: usize,
    },

    /// An argument does not fit its declared type.
    #[error("cannot encode {0}")]
    Encode(String),

    /// Output bytes do not match the declared return type.
    #[error("cannot decode {0}")]
    Decode(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Why a simulated call did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// The runtime rejected the call.
    Dispatch(DispatchError),
    /// The contract reverted; carries the decoded revert payload.
    Reverted(Value),
    /// ink! could not dispatch the message (e.g. `CouldNotReadInput`).
    Lang(Value),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Dispatch(e) => write!(f, "{}", e),
            CallError::Reverted(data) => write!(f, "reverted: {}", data),
            CallError::Lang(e) => write!(f, "lang error: {}", e),
        }
    }
}

/// Outcome of a simulated call, decoded against the message's return type.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub gas_consumed: Weight,
    /// Gas a real call would need; feed this to the transaction.
    pub gas_required: Weight,
    pub storage_deposit: StorageDeposit,
    pub debug_message: String,
    pub result: Result<Value, CallError>,
}

impl QueryResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Decoded output when the call succeeded.
    pub fn output(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    /// `Ok` or `Error`, as printed in logs.
    pub fn outcome(&self) -> &'static str {
        if self.is_ok() {
            "Ok"
        } else {
            "Error"
        }
    }
}

/// Limits for a simulated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub gas_limit: GasLimit,
    pub storage_deposit_limit: Option<Balance>,
    /// Value transferred with payable messages.
    pub value: Balance,
}

/// Limits for a signed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub gas_limit: Weight,
    pub storage_deposit_limit: Option<Balance>,
    pub value: Balance,
}

impl TxOptions {
    pub fn with_gas_limit(gas_limit: Weight) -> Self {
        Self {
            gas_limit,
            storage_deposit_limit: None,
            value: 0,
        }
    }
}
