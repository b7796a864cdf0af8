//! Bounded outcome history.
//!
//! # Responsibilities
//! - Keep the most recent N entries in insertion order
//! - Evict the oldest entry when capacity is exceeded
//!
//! # Design Decisions
//! - Generic over the entry type; knows nothing about circuit semantics
//! - Backed by a `VecDeque` preallocated to capacity, so `add` never reallocates
//! - Callers serialize access; the buffer itself is not synchronized

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Errors from constructing a bounded history.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history capacity must be greater than zero")]
    ZeroCapacity,
}

/// Outcome of one protected call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeRecord {
    /// When the call finished.
    pub at: Instant,
    /// Whether the operation returned `Ok`.
    pub succeeded: bool,
    /// Time from admission to completion (or to the timeout).
    pub latency: Duration,
    /// Whether the outcome counts toward opening the circuit.
    pub classified_as_failure: bool,
}

impl OutcomeRecord {
    pub fn success(at: Instant, latency: Duration) -> Self {
        Self {
            at,
            succeeded: true,
            latency,
            classified_as_failure: false,
        }
    }

    pub fn failure(at: Instant, latency: Duration) -> Self {
        Self {
            at,
            succeeded: false,
            latency,
            classified_as_failure: true,
        }
    }

    /// A failed call the classifier decided not to count.
    pub fn ignored_failure(at: Instant, latency: Duration) -> Self {
        Self {
            at,
            succeeded: false,
            latency,
            classified_as_failure: false,
        }
    }
}

/// Fixed-capacity FIFO of recent entries.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append an entry, evicting the oldest one first when full.
    pub fn add(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Copy of every entry, oldest first.
    pub fn all(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// The last `n` entries, oldest to newest.
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
