//! Configuration schema definitions.
//!
//! This module defines the configuration structure for breakers and the
//! `tripwire` binary. All types derive Serde traits for deserialization from
//! config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the `tripwire` binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Breaker thresholds and timings.
    pub breaker: BreakerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Synthetic dependency driven by `tripwire simulate`.
    pub simulation: SimulationConfig,
}

/// Breaker construction options. Immutable once a breaker is built.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Counted failures in the evaluation window that open the circuit.
    pub failure_count_threshold: u32,

    /// Failure ratio in the evaluation window (0.0 to 1.0) that opens the circuit.
    pub failure_rate_threshold: f64,

    /// Deadline for each protected call in milliseconds.
    pub operation_timeout_ms: u64,

    /// Time after the last failure before a probe is admitted, in milliseconds.
    pub open_to_probe_delay_ms: u64,

    /// Outcomes required in the evaluation window before any decision.
    pub minimum_sample_size: u32,

    /// Size of the reporting window behind `window_stats`.
    pub reporting_window_size: usize,

    /// Number of recent latencies averaged in snapshots.
    pub latency_sample_size: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_count_threshold: 5,
            failure_rate_threshold: 0.5,
            operation_timeout_ms: 3_000,
            open_to_probe_delay_ms: 60_000,
            minimum_sample_size: 10,
            reporting_window_size: 1_000,
            latency_sample_size: 100,
        }
    }
}

impl BreakerConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn open_to_probe_delay(&self) -> Duration {
        Duration::from_millis(self.open_to_probe_delay_ms)
    }

    /// Capacity of the window the open decision is made on.
    ///
    /// Twice the sample guard, and never smaller than the count threshold so
    /// that threshold stays reachable.
    pub fn evaluation_window_size(&self) -> usize {
        let doubled = (self.minimum_sample_size as usize).saturating_mul(2);
        doubled.max(self.failure_count_threshold as usize)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Synthetic flaky dependency used by `tripwire simulate`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of calls to attempt.
    pub calls: u64,

    /// Probability (0.0 to 1.0) that a call fails.
    pub failure_probability: f64,

    /// Lower bound of simulated latency in milliseconds.
    pub min_latency_ms: u64,

    /// Upper bound of simulated latency in milliseconds.
    pub max_latency_ms: u64,

    /// Pause between calls in milliseconds.
    pub interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            calls: 500,
            failure_probability: 0.3,
            min_latency_ms: 5,
            max_latency_ms: 50,
            interval_ms: 10,
        }
    }
}
