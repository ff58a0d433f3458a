//! Node transport: JSON-RPC 2.0 over WebSocket.
//!
//! A single background task owns the socket; [`RpcClient`] is the frontend
//! handle and [`Subscription`] the per-subscription notification stream.

pub mod client;
pub mod types;

pub use client::{RpcClient, Subscription};
pub use types::{RpcError, RpcResult};
