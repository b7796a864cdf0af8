//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define breaker metrics (calls, rejections, latency, state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `breaker_calls_total` (counter): completed calls by breaker, outcome
//! - `breaker_rejected_total` (counter): calls denied while open
//! - `breaker_call_duration_seconds` (histogram): call latency
//! - `breaker_state` (gauge): 0=closed, 1=half_open, 2=open
//! - `breaker_transitions_total` (counter): state changes by target state
//!
//! # Design Decisions
//! - Emits through the `metrics` facade; without an installed recorder every
//!   call is a no-op
//! - Labels for breaker name and outcome only, to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::state::CircuitState;

/// How a protected call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    /// Operation error the classifier chose not to count.
    Ignored,
    Timeout,
}

impl CallOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Ignored => "ignored",
            CallOutcome::Timeout => "timeout",
        }
    }
}

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_call(breaker: &str, outcome: CallOutcome, latency: Duration) {
    ::metrics::counter!(
        "breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    ::metrics::histogram!("breaker_call_duration_seconds", "breaker" => breaker.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_rejected(breaker: &str) {
    ::metrics::counter!("breaker_rejected_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_transition(breaker: &str, to: CircuitState) {
    ::metrics::counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(breaker, to);
}

pub fn record_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    ::metrics::gauge!("breaker_state", "breaker" => breaker.to_string()).set(value);
}
