//! Named breakers, one per dependency.

use dashmap::DashMap;

use crate::config::validation::validate_breaker;
use crate::config::{BreakerConfig, ConfigError};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::outcomes::MetricsSnapshot;

/// Collection of circuit breakers keyed by dependency name.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, CircuitBreaker>,
    default_config: BreakerConfig,
}

impl BreakerRegistry {
    /// Create a registry whose breakers use `default_config` unless told otherwise.
    pub fn new(default_config: BreakerConfig) -> Result<Self, ConfigError> {
        validate_breaker(&default_config).map_err(ConfigError::Validation)?;
        Ok(Self {
            breakers: DashMap::new(),
            default_config,
        })
    }

    /// Get or create the breaker for `name`.
    pub fn get(&self, name: &str) -> Result<CircuitBreaker, ConfigError> {
        self.get_with_config(name, self.default_config.clone())
    }

    /// Get or create the breaker for `name`. `config` applies only when the
    /// breaker does not exist yet.
    pub fn get_with_config(
        &self,
        name: &str,
        config: BreakerConfig,
    ) -> Result<CircuitBreaker, ConfigError> {
        let entry = self
            .breakers
            .entry(name.to_string())
            .or_try_insert_with(|| CircuitBreaker::new(name, config))?;
        Ok(entry.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Metrics for every breaker, sorted by name.
    pub fn all_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut all: Vec<_> = self
            .breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().metrics()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
