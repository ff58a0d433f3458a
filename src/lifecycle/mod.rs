//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the running command → close the session
//! ```

pub mod signals;

pub use signals::shutdown_signal;
