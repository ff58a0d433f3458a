//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flipper_rpc_requests_total` (counter): node RPC calls by method, outcome
//! - `flipper_contract_calls_total` (counter): dry-run calls by message, outcome
//! - `flipper_query_duration_seconds` (histogram): dry-run latency
//! - `flipper_tx_status_total` (counter): observed extrinsic statuses
//! - `flipper_flow_runs_total` (counter): flow runs by outcome
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder it is a no-op
//! - Prometheus endpoint only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one RPC round trip.
pub fn record_rpc_request(method: &str, ok: bool) {
    counter!(
        "flipper_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome(ok),
    )
    .increment(1);
}

/// Record one simulated contract call.
pub fn record_contract_call(message: &str, ok: bool, started: Instant) {
    counter!(
        "flipper_contract_calls_total",
        "message" => message.to_string(),
        "outcome" => outcome(ok),
    )
    .increment(1);
    histogram!("flipper_query_duration_seconds", "message" => message.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record an observed extrinsic status.
pub fn record_tx_status(status: &'static str) {
    counter!("flipper_tx_status_total", "status" => status).increment(1);
}

/// Record the end of a flow run.
pub fn record_flow_run(ok: bool) {
    counter!("flipper_flow_runs_total", "outcome" => outcome(ok)).increment(1);
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}
