//! Errors surfaced by a protected call.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Details of a call denied while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenCircuit {
    /// Time until a probe will be admitted.
    pub retry_after: Duration,
    /// Unix epoch milliseconds at which a probe will be admitted.
    pub retry_at_ms: u64,
}

impl fmt::Display for OpenCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "circuit open, retry in {}ms (at {})",
            self.retry_after.as_millis(),
            self.retry_at_ms
        )
    }
}

/// Errors returned by `CircuitBreaker::execute`.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The call was denied; the operation was not invoked.
    #[error("{0}")]
    CircuitOpen(OpenCircuit),

    /// The operation did not finish within the configured timeout.
    #[error("operation timed out after {after:?}")]
    Timeout { after: Duration },

    /// The operation's own error, passed through unchanged.
    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BreakerError::CircuitOpen(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BreakerError::Timeout { .. })
    }

    /// The operation's error, if that is what failed.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for protected calls.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;
