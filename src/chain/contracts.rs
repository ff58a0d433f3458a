//! `pallet-contracts` wire types.
//!
//! # Responsibilities
//! - Encode the arguments of the `ContractsApi_call` runtime API
//! - Decode its `ContractExecResult`
//! - Encode the `Contracts::call` dispatchable for signed transactions
//!
//! # Data Flow
//! ```text
//! ContractCallRequest → encode_args → state_call("ContractsApi_call")
//!     → ContractExecResult::decode
//! ContractCallTx → encode_call → signer → author_submitAndWatchExtrinsic
//! ```

use std::fmt;

use parity_scale_codec::{Compact, Decode, Encode};

use crate::chain::types::{AccountId, Balance, GasLimit, StorageDeposit, Weight};

/// Runtime API entry point for contract dry runs.
pub const CONTRACTS_API_CALL: &str = "ContractsApi_call";

/// `ReturnFlags::REVERT`.
pub const FLAG_REVERT: u32 = 0x0000_0001;

/// Arguments of a dry-run call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallRequest {
    pub origin: AccountId,
    pub dest: AccountId,
    pub value: Balance,
    pub gas_limit: GasLimit,
    pub storage_deposit_limit: Option<Balance>,
    pub input_data: Vec<u8>,
}

impl ContractCallRequest {
    /// SCALE-encoded runtime API arguments.
    pub fn encode_args(&self) -> Vec<u8> {
        (
            self.origin,
            self.dest,
            self.value,
            self.gas_limit.as_option(),
            self.storage_deposit_limit,
            &self.input_data,
        )
            .encode()
    }
}

/// Output of a contract execution.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ExecReturnValue {
    pub flags: u32,
    pub data: Vec<u8>,
}

impl ExecReturnValue {
    pub fn did_revert(&self) -> bool {
        self.flags & FLAG_REVERT != 0
    }
}

/// Module-level dispatch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct ModuleError {
    pub index: u8,
    pub error: [u8; 4],
}

/// `sp_runtime::DispatchError`. Nested error enums are kept as raw indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum DispatchError {
    Other,
    CannotLookup,
    BadOrigin,
    Module(ModuleError),
    ConsumerRemaining,
    NoProviders,
    TooManyConsumers,
    Token(u8),
    Arithmetic(u8),
    Transactional(u8),
    Exhausted,
    Corruption,
    Unavailable,
    RootNotAllowed,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Module(m) => write!(
                f,
                "module error (pallet {}, error 0x{})",
                m.index,
                hex::encode(m.error)
            ),
            DispatchError::Token(i) => write!(f, "token error {}", i),
            DispatchError::Arithmetic(i) => write!(f, "arithmetic error {}", i),
            DispatchError::Transactional(i) => write!(f, "transactional error {}", i),
            other => write!(f, "{:?}", other),
        }
    }
}

/// `ContractExecResult` as returned by `ContractsApi_call`.
///
/// Newer runtimes append an optional event list; it is left undecoded.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ContractExecResult {
    pub gas_consumed: Weight,
    pub gas_required: Weight,
    pub storage_deposit: StorageDeposit,
    pub debug_message: Vec<u8>,
    pub result: Result<ExecReturnValue, DispatchError>,
}

/// `MultiAddress<AccountId, ()>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
enum MultiAddress {
    Id(AccountId),
}

/// A signed `Contracts::call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallTx {
    pub origin: AccountId,
    pub dest: AccountId,
    pub value: Balance,
    pub gas_limit: Weight,
    pub storage_deposit_limit: Option<Balance>,
    pub data: Vec<u8>,
}

impl ContractCallTx {
    /// Encoded call: pallet and call index followed by the arguments.
    pub fn encode_call(&self, pallet_index: u8, call_index: u8) -> Vec<u8> {
        let mut out = vec![pallet_index, call_index];
        MultiAddress::Id(self.dest).encode_to(&mut out);
        Compact(self.value).encode_to(&mut out);
        self.gas_limit.encode_to(&mut out);
        self.storage_deposit_limit.map(Compact).encode_to(&mut out);
        self.data.encode_to(&mut out);
        out
    }
}
