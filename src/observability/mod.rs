//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker events (open, half-open, close, reject, timeout):
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Breaker name is a field on every event and a label on every metric
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
