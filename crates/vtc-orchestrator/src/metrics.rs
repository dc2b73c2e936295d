//! Job tracker metrics.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Metric name constants for consistency.
pub mod names {
    /// Polls by outcome (`ok`, `transport_error`).
    pub const POLLS_TOTAL: &str = "vtc_tracker_polls_total";

    /// Jobs observed reaching a terminal state, by state.
    pub const JOBS_TERMINAL_TOTAL: &str = "vtc_tracker_jobs_terminal_total";

    /// Side-effect results by kind and outcome.
    pub const SIDE_EFFECTS_TOTAL: &str = "vtc_side_effects_total";
}

/// Count one status poll by outcome.
pub fn record_poll(outcome: &'static str) {
    counter!(names::POLLS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count a job reaching a terminal state.
pub fn record_terminal(state: &'static str) {
    counter!(names::JOBS_TERMINAL_TOTAL, "state" => state).increment(1);
}

/// Count a thumbnail or cleanup attempt.
pub fn record_side_effect(kind: &'static str, outcome: &'static str) {
    counter!(names::SIDE_EFFECTS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn install_prometheus(addr: SocketAddr) -> OrchestratorResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| OrchestratorError::config(format!("failed to install metrics exporter: {}", e)))
}
