//! Circuit breaker for async operations.
//!
//! Wraps calls to a dependency, stops calling it while it keeps failing,
//! admits a single probe after a cool-down, and closes again once the probe
//! succeeds.
//!
//! ```no_run
//! use tripwire::{BreakerConfig, CircuitBreaker};
//!
//! # async fn fetch() -> Result<String, std::io::Error> { Ok(String::new()) }
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("inventory", BreakerConfig::default())?;
//! match breaker.execute(|| fetch()).await {
//!     Ok(body) => println!("{body}"),
//!     Err(e) if e.is_circuit_open() => println!("inventory unavailable: {e}"),
//!     Err(e) => println!("call failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod observability;
pub mod resilience;
pub mod simulation;

pub use config::{AppConfig, BreakerConfig, ConfigError};
pub use resilience::{
    BreakerError, BreakerRegistry, CircuitBreaker, CircuitState, MetricsSnapshot, WindowStats,
};
