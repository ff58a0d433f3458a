//! ink! contract interface and calls.
//!
//! # Data Flow
//! ```text
//! artifacts/metadata.json (embedded) or metadata_path
//!     → metadata.rs (messages, type registry)
//!     → handle.rs (query / estimate / tx)
//!         → value.rs (JSON ⇄ SCALE by type id)
//! ```

pub mod handle;
pub mod metadata;
pub mod types;
pub mod value;

pub use handle::{ContractHandle, PreparedTx};
pub use metadata::{ContractMetadata, MessageSpec};
pub use types::{CallError, ContractError, ContractResult, QueryOptions, QueryResult, TxOptions};
