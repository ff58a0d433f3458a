//! Orchestration of one contract interaction.
//!
//! # Data Flow
//! ```text
//! ClientConfig
//!     → Session::open (metadata, NodeClient, ExtensionBridge, ContractHandle)
//!     → Flow::run → FlowReport
//!     → Session::close
//! ```

pub mod runner;
pub mod session;
pub mod types;

pub use runner::{select_account, Flow};
pub use session::Session;
pub use types::{FlowError, FlowOptions, FlowReport, FlowResult};
