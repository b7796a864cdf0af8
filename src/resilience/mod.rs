//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! CircuitBreaker::execute(operation):
//!     → state.rs (is the circuit open? is a probe due?)
//!     → timeouts.rs (race operation against its deadline)
//!     → classify.rs (does this error count?)
//!     → outcomes.rs (lifetime counters, latency, reporting window)
//!     → evaluator.rs (bounded window → should the circuit open?)
//!     → state.rs (transition if needed)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every protected call has a deadline
//! - No retries here; callers layer their own
//! - Decision window and reporting window are separate buffers
//! - Each breaker owns its state; there is no process-wide singleton

pub mod circuit_breaker;
pub mod classify;
pub mod clock;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod outcomes;
pub mod registry;
pub mod state;
pub mod timeouts;

pub use circuit_breaker::CircuitBreaker;
pub use classify::{Classification, CountAll, ErrorCategory, FailureClassifier, Severity};
pub use error::{BreakerError, BreakerResult, OpenCircuit};
pub use outcomes::{MetricsExport, MetricsSnapshot, WindowStats};
pub use registry::BreakerRegistry;
pub use state::CircuitState;
