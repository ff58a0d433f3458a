//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Node connection:
//!     → backoff.rs (bounded reconnect attempts with jittered backoff)
//!     → timeouts.rs (connect deadline per attempt)
//! RPC requests, bridge requests, finalization wait:
//!     → timeouts.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only connection establishment is retried; submissions never are

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, retry_with_backoff, BackoffPolicy};
pub use timeouts::{deadline, Elapsed};
