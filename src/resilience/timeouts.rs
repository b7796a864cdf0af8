//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a protected operation against its deadline
//! - Discard the operation if the deadline wins
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from operation errors
//! - The losing operation future is dropped inside the race, so nothing it
//!   would have produced can reach breaker state afterwards

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};

/// The deadline fired before the operation completed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation timed out after {after:?}")]
pub struct TimedOut {
    pub after: Duration,
}

/// Result of a raced operation plus how long it ran.
#[derive(Debug)]
pub struct Raced<T> {
    pub outcome: Result<T, TimedOut>,
    pub elapsed: Duration,
}

/// Run `operation` until it completes or `limit` elapses.
pub async fn race<F>(limit: Duration, operation: F) -> Raced<F::Output>
where
    F: Future,
{
    let started = Instant::now();
    let outcome = time::timeout(limit, operation)
        .await
        .map_err(|_| TimedOut { after: limit });

    Raced {
        outcome,
        elapsed: started.elapsed(),
    }
}
