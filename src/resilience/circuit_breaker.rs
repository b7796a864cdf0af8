//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: evaluator reports count or rate threshold breached
//! Open → Half-Open: first call after open_to_probe_delay since last failure
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - Per-dependency breaker (not global); each instance is its own arena
//! - Fail fast in Open state (operation is never invoked)
//! - Single probe in Half-Open; concurrent callers are denied until it resolves
//! - Only the probe's own outcome closes or reopens a Half-Open circuit; calls
//!   admitted earlier report normally
//! - One mutex guards all mutable state; it is never held across an await
//! - A call abandoned by its caller is still booked as a timeout once its
//!   deadline passes

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::{self, Instant};

use crate::config::validation::validate_breaker;
use crate::config::{BreakerConfig, ConfigError};
use crate::observability::metrics::{self, CallOutcome};
use crate::resilience::classify::{CountAll, FailureClassifier};
use crate::resilience::clock::{duration_millis, WallClock};
use crate::resilience::error::{BreakerError, BreakerResult, OpenCircuit};
use crate::resilience::evaluator::FailureEvaluator;
use crate::resilience::outcomes::{MetricsSnapshot, OutcomeAggregator, WindowStats};
use crate::resilience::state::{CircuitState, StateMachine};
use crate::resilience::timeouts;

/// Circuit breaker wrapping calls to one dependency.
///
/// Cloning is cheap and yields a handle to the same breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    name: String,
    config: BreakerConfig,
    clock: WallClock,
    core: Mutex<Core>,
}

#[derive(Debug)]
struct Core {
    machine: StateMachine,
    evaluator: FailureEvaluator,
    outcomes: OutcomeAggregator,
    last_failure: Option<Instant>,
    /// Id of the probe currently allowed to decide the Half-Open outcome.
    probe_in_flight: Option<u64>,
    next_probe_id: u64,
    /// Bumped by `reset`; outcomes from an older epoch are dropped.
    epoch: u64,
}

/// Permission to run one call.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    probe: Option<u64>,
    epoch: u64,
}

impl CircuitBreaker {
    /// Build a breaker after validating `config`.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Result<Self, ConfigError> {
        validate_breaker(&config).map_err(ConfigError::Validation)?;

        let now = Instant::now();
        let core = Core {
            machine: StateMachine::new(now),
            evaluator: FailureEvaluator::new(&config)?,
            outcomes: OutcomeAggregator::new(&config)?,
            last_failure: None,
            probe_in_flight: None,
            next_probe_id: 0,
            epoch: 0,
        };
        let name = name.into();

        tracing::debug!(
            breaker = %name,
            failure_count_threshold = config.failure_count_threshold,
            failure_rate_threshold = config.failure_rate_threshold,
            operation_timeout_ms = config.operation_timeout_ms,
            open_to_probe_delay_ms = config.open_to_probe_delay_ms,
            minimum_sample_size = config.minimum_sample_size,
            "Circuit breaker created"
        );
        metrics::record_state(&name, CircuitState::Closed);

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                config,
                clock: WallClock::new(),
                core: Mutex::new(core),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Copy of the construction options.
    pub fn config(&self) -> BreakerConfig {
        self.shared.config.clone()
    }

    pub fn state(&self) -> CircuitState {
        self.shared.core.lock().machine.state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.shared.core.lock().evaluator.consecutive_failures()
    }

    /// Run `operation` under circuit protection, counting every error.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(operation, &CountAll).await
    }

    /// Run `operation` under circuit protection, asking `classifier` whether
    /// an operation error counts against the circuit.
    ///
    /// Errors that do not count are still returned to the caller; they are
    /// recorded as failed calls for reporting but treated as a live answer
    /// from the dependency.
    pub async fn execute_with<T, E, F, Fut, C>(
        &self,
        operation: F,
        classifier: &C,
    ) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FailureClassifier<E> + ?Sized,
    {
        let ticket = self.shared.admit().map_err(BreakerError::CircuitOpen)?;

        let timeout = self.shared.config.operation_timeout();
        let deadline = Instant::now().checked_add(timeout);
        let call = InFlight::new(Arc::clone(&self.shared), ticket, deadline);

        let raced = timeouts::race(timeout, operation()).await;

        match raced.outcome {
            Ok(Ok(value)) => {
                call.complete(CallOutcome::Success, raced.elapsed);
                Ok(value)
            }
            Ok(Err(error)) => {
                let outcome = if classifier.classify(&error).triggers_open {
                    CallOutcome::Failure
                } else {
                    CallOutcome::Ignored
                };
                call.complete(outcome, raced.elapsed);
                Err(BreakerError::Operation(error))
            }
            Err(timed_out) => {
                tracing::debug!(
                    breaker = %self.shared.name,
                    timeout_ms = duration_millis(timed_out.after),
                    "Protected call timed out"
                );
                call.complete(CallOutcome::Timeout, raced.elapsed);
                Err(BreakerError::Timeout {
                    after: timed_out.after,
                })
            }
        }
    }

    /// Point-in-time metrics. `next_probe_time` is set only while open.
    pub fn metrics(&self) -> MetricsSnapshot {
        let core = self.shared.core.lock();
        let (last_transition, next_probe) = self.shared.report_times(&core);
        core.outcomes
            .snapshot(core.machine.state(), last_transition, next_probe)
    }

    /// Metrics snapshot stamped with the export time, as JSON.
    pub fn export_metrics(&self) -> Result<String, serde_json::Error> {
        let core = self.shared.core.lock();
        let (last_transition, next_probe) = self.shared.report_times(&core);
        core.outcomes.export(
            core.machine.state(),
            last_transition,
            next_probe,
            self.shared.clock.now_unix_millis(),
        )
    }

    pub fn window_stats(&self) -> WindowStats {
        self.shared.core.lock().outcomes.window_stats()
    }

    /// Return to a fresh Closed breaker. Calls still in flight are not
    /// counted when they finish.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut core = self.shared.core.lock();
        core.machine.reset(now);
        core.evaluator.reset();
        core.outcomes.reset();
        core.last_failure = None;
        core.probe_in_flight = None;
        core.epoch = core.epoch.wrapping_add(1);

        tracing::info!(breaker = %self.shared.name, "Circuit breaker reset");
        metrics::record_state(&self.shared.name, CircuitState::Closed);
    }

    /// Force the circuit open as if a failure had just occurred.
    pub fn trip(&self) {
        let now = Instant::now();
        let mut core = self.shared.core.lock();
        if core.machine.state() == CircuitState::Closed
            || core.machine.state() == CircuitState::HalfOpen
        {
            self.shared.transition(&mut core, CircuitState::Open, now);
        }
        core.last_failure = Some(now);
        core.probe_in_flight = None;

        tracing::warn!(breaker = %self.shared.name, "Circuit breaker tripped manually");
    }
}

impl Shared {
    fn admit(&self) -> Result<Ticket, OpenCircuit> {
        let now = Instant::now();
        let mut core = self.core.lock();
        let epoch = core.epoch;

        match core.machine.state() {
            CircuitState::Closed => Ok(Ticket { probe: None, epoch }),
            CircuitState::Open => {
                let since_failure = now.saturating_duration_since(Self::open_since(&core));
                let remaining = self
                    .config
                    .open_to_probe_delay()
                    .saturating_sub(since_failure);
                if !remaining.is_zero() {
                    return Err(self.reject(&mut core, remaining, now));
                }

                self.transition(&mut core, CircuitState::HalfOpen, now);
                Ok(Self::start_probe(&mut core, epoch))
            }
            CircuitState::HalfOpen => {
                if core.probe_in_flight.is_some() {
                    // The probe resolves by its deadline at the latest.
                    let retry_after = self.config.operation_timeout();
                    return Err(self.reject(&mut core, retry_after, now));
                }
                Ok(Self::start_probe(&mut core, epoch))
            }
        }
    }

    fn start_probe(core: &mut Core, epoch: u64) -> Ticket {
        let id = core.next_probe_id;
        core.next_probe_id = core.next_probe_id.wrapping_add(1);
        core.probe_in_flight = Some(id);
        Ticket {
            probe: Some(id),
            epoch,
        }
    }

    /// Start of the open-to-probe delay.
    fn open_since(core: &Core) -> Instant {
        core.last_failure
            .unwrap_or_else(|| core.machine.last_transition())
    }

    fn reject(&self, core: &mut Core, retry_after: Duration, now: Instant) -> OpenCircuit {
        core.outcomes.record_rejection();
        metrics::record_rejected(&self.name);

        tracing::debug!(
            breaker = %self.name,
            state = %core.machine.state(),
            retry_after_ms = duration_millis(retry_after),
            "Call rejected"
        );

        OpenCircuit {
            retry_after,
            retry_at_ms: self
                .clock
                .unix_millis(now)
                .saturating_add(duration_millis(retry_after)),
        }
    }

    fn complete(&self, ticket: &Ticket, outcome: CallOutcome, latency: Duration) {
        let now = Instant::now();
        let mut core = self.core.lock();
        if ticket.epoch != core.epoch {
            return;
        }
        // A probe superseded by `trip` or by a reopen reports like any other call.
        let deciding_probe = ticket.probe.is_some() && ticket.probe == core.probe_in_flight;
        if deciding_probe {
            core.probe_in_flight = None;
        }
        metrics::record_call(&self.name, outcome, latency);

        match outcome {
            CallOutcome::Success | CallOutcome::Ignored => {
                if outcome == CallOutcome::Success {
                    core.outcomes.record_success(now, latency);
                    core.evaluator.record_success(now, latency);
                } else {
                    core.outcomes.record_ignored_failure(now, latency);
                    core.evaluator.record_ignored_failure(now, latency);
                }

                if deciding_probe && core.machine.state() == CircuitState::HalfOpen {
                    self.transition(&mut core, CircuitState::Closed, now);
                    core.evaluator.reset();
                }
            }
            CallOutcome::Failure | CallOutcome::Timeout => {
                core.outcomes.record_failure(now, latency);
                core.evaluator.record_failure(now, latency);
                core.last_failure = Some(now);

                if deciding_probe || core.evaluator.should_open() {
                    self.transition(&mut core, CircuitState::Open, now);
                    core.probe_in_flight = None;
                }
            }
        }
    }

    fn transition(&self, core: &mut Core, target: CircuitState, now: Instant) {
        let from = core.machine.state();
        match core.machine.transition_to(target, now) {
            Ok(true) => {
                match target {
                    CircuitState::Open => tracing::warn!(
                        breaker = %self.name,
                        %from,
                        failures = core.evaluator.failures_in_window(),
                        consecutive_failures = core.evaluator.consecutive_failures(),
                        "Circuit breaker opened"
                    ),
                    CircuitState::HalfOpen => tracing::info!(
                        breaker = %self.name,
                        "Circuit breaker half-open, admitting probe"
                    ),
                    CircuitState::Closed => tracing::info!(
                        breaker = %self.name,
                        "Circuit breaker closed"
                    ),
                }
                metrics::record_transition(&self.name, target);
            }
            Ok(false) => {}
            Err(e) => tracing::error!(breaker = %self.name, error = %e, "Circuit transition rejected"),
        }
    }

    /// Last transition and next probe time, as Unix milliseconds.
    fn report_times(&self, core: &Core) -> (u64, Option<u64>) {
        let last_transition = self.clock.unix_millis(core.machine.last_transition());
        let next_probe = match core.machine.state() {
            CircuitState::Open => Some(
                self.clock
                    .unix_millis(Self::open_since(core))
                    .saturating_add(duration_millis(self.config.open_to_probe_delay())),
            ),
            _ => None,
        };
        (last_transition, next_probe)
    }
}

/// Bookkeeping for an admitted call.
///
/// If dropped before `complete` (the caller abandoned the call, or the
/// operation panicked), the call is booked as a timeout once its deadline
/// passes. A deadline past the end of the clock books it immediately.
struct InFlight {
    shared: Arc<Shared>,
    ticket: Ticket,
    deadline: Option<Instant>,
    done: bool,
}

impl InFlight {
    fn new(shared: Arc<Shared>, ticket: Ticket, deadline: Option<Instant>) -> Self {
        Self {
            shared,
            ticket,
            deadline,
            done: false,
        }
    }

    fn complete(mut self, outcome: CallOutcome, latency: Duration) {
        self.done = true;
        self.shared.complete(&self.ticket, outcome, latency);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let ticket = self.ticket;
        let deadline = self.deadline;
        let latency = shared.config.operation_timeout();

        tracing::debug!(breaker = %shared.name, "Protected call abandoned before completion");

        match (deadline, Handle::try_current()) {
            (Some(deadline), Ok(handle)) => {
                handle.spawn(async move {
                    time::sleep_until(deadline).await;
                    shared.complete(&ticket, CallOutcome::Timeout, latency);
                });
            }
            _ => shared.complete(&ticket, CallOutcome::Timeout, latency),
        }
    }
}
