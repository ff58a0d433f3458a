//! Client for an ink! contract on a Substrate node.
//!
//! Reads contract state, estimates gas for a mutating message, submits it
//! through a wallet extension and follows the extrinsic to finalization.

pub mod chain;
pub mod config;
pub mod contract;
pub mod flow;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod rpc;
pub mod wallet;

pub use config::schema::ClientConfig;
pub use flow::{Flow, FlowError, FlowOptions, FlowReport, Session};
