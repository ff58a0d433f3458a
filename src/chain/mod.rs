//! Substrate chain access.
//!
//! # Data Flow
//! ```text
//! ContractHandle
//!     → NodeApi (trait)
//!         → NodeClient → RpcClient → node
//! ```

pub mod api;
pub mod client;
pub mod contracts;
pub mod ss58;
pub mod types;

pub use api::{NodeApi, TxProgress};
pub use client::{HeaderStream, NodeClient};
pub use contracts::{ContractCallRequest, ContractCallTx, ContractExecResult, DispatchError, ExecReturnValue};
pub use types::{
    blake2_256, AccountId, Balance, ChainError, ChainInfo, ChainResult, GasLimit, Header,
    RuntimeVersion, StorageDeposit, TxStatus, Weight, DEFAULT_SS58_PREFIX, H256,
};
