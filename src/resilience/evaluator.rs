//! Failure evaluation.
//!
//! # Responsibilities
//! - Record recent call outcomes in a bounded window
//! - Track the consecutive-failure streak
//! - Decide whether the failure pattern justifies opening the circuit
//!
//! # Design Decisions
//! - No decision before `minimum_sample_size` outcomes are in the window
//! - Count threshold OR rate threshold: a low-volume dependency failing every
//!   call and a busy dependency failing half its calls both trip the circuit
//! - Window size derives from the sample guard, independent of reporting

use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::resilience::history::{BoundedHistory, HistoryError, OutcomeRecord};

/// Decides when recent failures warrant opening the circuit.
#[derive(Debug, Clone)]
pub struct FailureEvaluator {
    window: BoundedHistory<OutcomeRecord>,
    consecutive_failures: u32,
    failure_count_threshold: u32,
    failure_rate_threshold: f64,
    minimum_sample_size: usize,
}

impl FailureEvaluator {
    pub fn new(config: &BreakerConfig) -> Result<Self, HistoryError> {
        Ok(Self {
            window: BoundedHistory::new(config.evaluation_window_size())?,
            consecutive_failures: 0,
            failure_count_threshold: config.failure_count_threshold,
            failure_rate_threshold: config.failure_rate_threshold,
            minimum_sample_size: config.minimum_sample_size as usize,
        })
    }

    pub fn record_success(&mut self, at: Instant, latency: Duration) {
        self.consecutive_failures = 0;
        self.window.add(OutcomeRecord::success(at, latency));
    }

    pub fn record_failure(&mut self, at: Instant, latency: Duration) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.window.add(OutcomeRecord::failure(at, latency));
    }

    /// An error the classifier chose not to count. The dependency answered,
    /// so the streak is broken.
    pub fn record_ignored_failure(&mut self, at: Instant, latency: Duration) {
        self.consecutive_failures = 0;
        self.window.add(OutcomeRecord::ignored_failure(at, latency));
    }

    /// Number of counted failures currently in the window.
    pub fn failures_in_window(&self) -> usize {
        self.window
            .iter()
            .filter(|record| record.classified_as_failure)
            .count()
    }

    pub fn should_open(&self) -> bool {
        let samples = self.window.len();
        if samples < self.minimum_sample_size {
            return false;
        }

        let failures = self.failures_in_window();
        let rate = failures as f64 / samples as f64;

        failures >= self.failure_count_threshold as usize || rate >= self.failure_rate_threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.window.clear();
    }
}
