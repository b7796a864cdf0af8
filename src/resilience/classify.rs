//! Failure classification hook.
//!
//! # Responsibilities
//! - Let callers decide whether an operation error counts against the circuit
//! - Provide a default category policy table
//!
//! # Design Decisions
//! - A strategy object, not inheritance: the breaker only reads `triggers_open`
//! - `CountAll` is the default and counts every error
//! - Client-side errors (bad input, not found) do not open the circuit

use serde::{Deserialize, Serialize};

/// Broad origin of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connection refused, reset, DNS.
    Network,
    /// The dependency did not answer in time.
    Timeout,
    /// The dependency asked us to slow down.
    RateLimited,
    /// The dependency answered with an internal error.
    Server,
    /// The request itself was wrong.
    Client,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Verdict for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ErrorCategory,
    /// Whether the failure counts toward opening the circuit.
    pub triggers_open: bool,
    /// Advisory for callers layering their own retries.
    pub retryable: bool,
    pub severity: Severity,
}

impl Classification {
    /// Default policy for each category.
    pub fn for_category(category: ErrorCategory) -> Self {
        let (triggers_open, retryable, severity) = match category {
            ErrorCategory::Network => (true, true, Severity::High),
            ErrorCategory::Timeout => (true, true, Severity::High),
            ErrorCategory::RateLimited => (true, true, Severity::Medium),
            ErrorCategory::Server => (true, true, Severity::High),
            ErrorCategory::Client => (false, false, Severity::Low),
            ErrorCategory::Unknown => (true, false, Severity::Medium),
        };
        Self {
            category,
            triggers_open,
            retryable,
            severity,
        }
    }

    /// Counted failure of unknown origin.
    pub fn counted() -> Self {
        Self::for_category(ErrorCategory::Unknown)
    }
}

/// Maps an operation error to a classification.
pub trait FailureClassifier<E> {
    fn classify(&self, error: &E) -> Classification;
}

/// Counts every error against the circuit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountAll;

impl<E> FailureClassifier<E> for CountAll {
    fn classify(&self, _error: &E) -> Classification {
        Classification::counted()
    }
}

impl<E, F> FailureClassifier<E> for F
where
    F: Fn(&E) -> Classification,
{
    fn classify(&self, error: &E) -> Classification {
        self(error)
    }
}

/// Classifies by HTTP-style status code, for callers whose errors carry one.
pub fn category_for_status(status: u16) -> ErrorCategory {
    match status {
        408 | 504 => ErrorCategory::Timeout,
        429 => ErrorCategory::RateLimited,
        400..=499 => ErrorCategory::Client,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}
