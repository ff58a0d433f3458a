//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! rpc, chain, contract, flow:
//!     → logging.rs (structured log events with a per-run span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
