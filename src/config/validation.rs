//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, rates within [0, 1])
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: config → Result<(), Vec<ValidationError>>
//! - Runs before a breaker is constructed; never at call time

use thiserror::Error;

use crate::config::schema::{AppConfig, BreakerConfig, SimulationConfig};

/// A single violated constraint.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("min_latency_ms ({min}) exceeds max_latency_ms ({max})")]
    InvertedLatencyRange { min: u64, max: u64 },
}

/// Check every breaker constraint.
pub fn validate_breaker(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.failure_count_threshold == 0 {
        errors.push(ValidationError::NotPositive {
            field: "failure_count_threshold",
        });
    }
    check_unit_range(
        &mut errors,
        "failure_rate_threshold",
        config.failure_rate_threshold,
    );
    if config.operation_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "operation_timeout_ms",
        });
    }
    if config.open_to_probe_delay_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "open_to_probe_delay_ms",
        });
    }
    if config.minimum_sample_size == 0 {
        errors.push(ValidationError::NotPositive {
            field: "minimum_sample_size",
        });
    }
    if config.reporting_window_size == 0 {
        errors.push(ValidationError::NotPositive {
            field: "reporting_window_size",
        });
    }
    if config.latency_sample_size == 0 {
        errors.push(ValidationError::NotPositive {
            field: "latency_sample_size",
        });
    }

    into_result(errors)
}

fn validate_simulation(config: &SimulationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_unit_range(
        &mut errors,
        "failure_probability",
        config.failure_probability,
    );
    if config.min_latency_ms > config.max_latency_ms {
        errors.push(ValidationError::InvertedLatencyRange {
            min: config.min_latency_ms,
            max: config.max_latency_ms,
        });
    }

    into_result(errors)
}

/// Check the whole application config.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(mut e) = validate_breaker(&config.breaker) {
        errors.append(&mut e);
    }
    if let Err(mut e) = validate_simulation(&config.simulation) {
        errors.append(&mut e);
    }

    into_result(errors)
}

fn check_unit_range(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    // NaN fails both comparisons, so test for containment.
    if !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError::OutOfUnitRange { field, value });
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
