//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → sections handed to the node client, wallet bridge and flow
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the client runs against the public testnet
//!   without a config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    ChainConfig, ClientConfig, ContractConfig, EstimateFailurePolicy, ExtensionEndpoint,
    FlowSettings, LogFormat, NodeConfig, ObservabilityConfig, WalletConfig, WeightConfig,
};
pub use validation::{validate_config, validate_messages, ValidationError};
