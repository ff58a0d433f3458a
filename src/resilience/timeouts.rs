//! Timeout enforcement.
//!
//! Every call that leaves the process (socket connect, RPC round trip,
//! bridge request, finalization wait) goes through [`deadline`].

use std::future::Future;
use std::time::Duration;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Await `fut` for at most `limit`.
pub async fn deadline<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed(limit))
}
