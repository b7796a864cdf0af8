//! Circuit state machine.
//!
//! # States
//! - Closed: calls pass through
//! - Open: calls fail fast
//! - HalfOpen: one probe call tests recovery
//!
//! # State Transitions
//! ```text
//! Closed   → Open
//! Open     → HalfOpen
//! HalfOpen → Closed
//! HalfOpen → Open
//! ```
//!
//! # Design Decisions
//! - Same-state transitions are accepted as no-ops and keep the old timestamp
//! - State and transition time are one value; they cannot be observed apart
//! - `reset` is an administrative override and skips edge validation

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Current position of the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// States reachable from `self` in one step.
    pub fn successors(self) -> &'static [CircuitState] {
        match self {
            CircuitState::Closed => &[CircuitState::Open],
            CircuitState::Open => &[CircuitState::HalfOpen],
            CircuitState::HalfOpen => &[CircuitState::Closed, CircuitState::Open],
        }
    }

    pub fn can_transition_to(self, target: CircuitState) -> bool {
        self == target || self.successors().contains(&target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid circuit transition from {from} to {to}")]
    Invalid { from: CircuitState, to: CircuitState },
}

/// Owner of the single circuit state and its transition time.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: CircuitState,
    last_transition: Instant,
}

impl StateMachine {
    pub fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            last_transition: now,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn last_transition(&self) -> Instant {
        self.last_transition
    }

    /// Move to `target`. Returns `Ok(true)` when the state actually changed.
    pub fn transition_to(
        &mut self,
        target: CircuitState,
        now: Instant,
    ) -> Result<bool, TransitionError> {
        if self.state == target {
            return Ok(false);
        }
        if !self.state.can_transition_to(target) {
            return Err(TransitionError::Invalid {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.last_transition = now;
        Ok(true)
    }

    /// Force Closed regardless of the current state.
    pub fn reset(&mut self, now: Instant) {
        self.state = CircuitState::Closed;
        self.last_transition = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_closed() {
        let now = Instant::now();
        let machine = StateMachine::new(now);
        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.last_transition(), now);
    }

    #[test]
    fn test_legal_cycle() {
        let t0 = Instant::now();
        let mut machine = StateMachine::new(t0);

        let t1 = t0 + Duration::from_millis(1);
        assert_eq!(machine.transition_to(CircuitState::Open, t1), Ok(true));
        assert_eq!(machine.last_transition(), t1);

        let t2 = t0 + Duration::from_millis(2);
        assert_eq!(machine.transition_to(CircuitState::HalfOpen, t2), Ok(true));

        let t3 = t0 + Duration::from_millis(3);
        assert_eq!(machine.transition_to(CircuitState::Open, t3), Ok(true));
        machine.transition_to(CircuitState::HalfOpen, t3).unwrap();
        assert_eq!(machine.transition_to(CircuitState::Closed, t3), Ok(true));
        assert_eq!(machine.state(), CircuitState::Closed);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let t0 = Instant::now();
        let mut machine = StateMachine::new(t0);

        let err = machine
            .transition_to(CircuitState::HalfOpen, t0 + Duration::from_millis(1))
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: CircuitState::Closed,
                to: CircuitState::HalfOpen,
            }
        );
        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.last_transition(), t0);

        machine.transition_to(CircuitState::Open, t0).unwrap();
        assert!(machine.transition_to(CircuitState::Closed, t0).is_err());
    }

    #[test]
    fn test_same_state_is_noop() {
        let t0 = Instant::now();
        let mut machine = StateMachine::new(t0);

        let later = t0 + Duration::from_secs(1);
        assert_eq!(machine.transition_to(CircuitState::Closed, later), Ok(false));
        assert_eq!(machine.last_transition(), t0);
    }

    #[test]
    fn test_reset_bypasses_validation() {
        let t0 = Instant::now();
        let mut machine = StateMachine::new(t0);
        machine.transition_to(CircuitState::Open, t0).unwrap();

        let later = t0 + Duration::from_secs(1);
        machine.reset(later);
        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.last_transition(), later);
    }

    #[test]
    fn test_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
        assert_eq!(
            serde_json::to_string(&CircuitState::Open).unwrap(),
            "\"open\""
        );
    }
}
