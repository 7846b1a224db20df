//! Circuit breaker guarding a single upstream dependency.
//!
//! Implements the circuit breaker pattern to stop hammering an upstream
//! that keeps failing. The circuit has three states:
//!
//! - **Closed**: Normal operation, requests are allowed through.
//! - **Open**: Upstream is failing, requests are short-circuited.
//! - **HalfOpen**: Cool-down elapsed, trial requests decide whether to close.
//!
//! Failures are counted over a rolling window: a failure older than
//! `failure_window` no longer counts towards the threshold.
//!
//! The circuit breaker is in-memory and resets on process restart.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::models::ProviderId;

/// Default number of failures before opening the circuit.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default rolling window over which failures are counted.
const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(60);

/// Default time to wait before transitioning from Open to HalfOpen.
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of successful trial requests needed to close the circuit from HalfOpen.
const HALF_OPEN_SUCCESS_THRESHOLD: u32 = 1;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    /// Normal operation - requests are allowed.
    Closed,
    /// Upstream is failing - requests are blocked.
    Open,
    /// Testing recovery - trial requests allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    /// Failure timestamps inside the rolling window, oldest first.
    failures: VecDeque<Instant>,
    /// Consecutive successes while HalfOpen.
    half_open_successes: u32,
    /// When the circuit last opened (start of the cool-down).
    opened_at: Option<Instant>,
    last_failure: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            half_open_successes: 0,
            opened_at: None,
            last_failure: None,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.half_open_successes = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failures.clear();
        self.half_open_successes = 0;
        self.opened_at = None;
        self.last_failure = None;
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of failures inside `failure_window` before opening the circuit.
    pub failure_threshold: u32,
    /// Rolling window over which failures are counted.
    pub failure_window: Duration,
    /// Cool-down before a trial request is let through.
    pub recovery_timeout: Duration,
    /// Number of trial successes needed to close from HalfOpen.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_window: DEFAULT_FAILURE_WINDOW,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            half_open_success_threshold: HALF_OPEN_SUCCESS_THRESHOLD,
        }
    }
}

/// Circuit breaker for one upstream.
///
/// Thread-safe; all transitions happen under an internal mutex and callers
/// only ever report outcomes.
pub struct CircuitBreaker {
    provider: ProviderId,
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default settings.
    pub fn new(provider: impl Into<ProviderId>) -> Self {
        Self::with_config(provider, CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(provider: impl Into<ProviderId>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider: provider.into(),
            circuit: Mutex::new(Circuit::new()),
            config,
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Lock the circuit mutex, recovering from poison if necessary.
    ///
    /// The worst case after a poisoned lock is a slightly wrong failure
    /// count, which is preferable to panicking on every later request.
    fn lock_circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Check if a request may go to the upstream.
    ///
    /// Returns true if the circuit is Closed or HalfOpen (allowing trial requests).
    /// Returns false if the circuit is Open.
    ///
    /// This method also handles state transitions:
    /// - Open -> HalfOpen when the recovery timeout has elapsed
    pub fn is_allowed(&self) -> bool {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = circuit
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.recovery_timeout);
                if cooled_down {
                    info!(
                        "Circuit breaker: transitioning '{}' from Open to HalfOpen",
                        self.provider
                    );
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_successes = 0;
                }
                cooled_down
            }
        }
    }

    /// Record a successful request.
    ///
    /// In Closed state: clears the failure window.
    /// In HalfOpen state: counts the trial success, may close the circuit.
    pub fn record_success(&self) {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed => {
                circuit.failures.clear();
                debug!(
                    "Circuit breaker: success for '{}', failure count reset",
                    self.provider
                );
            }
            CircuitState::HalfOpen => {
                circuit.half_open_successes += 1;
                debug!(
                    "Circuit breaker: success for '{}' in HalfOpen ({}/{})",
                    self.provider,
                    circuit.half_open_successes,
                    self.config.half_open_success_threshold
                );

                if circuit.half_open_successes >= self.config.half_open_success_threshold {
                    info!(
                        "Circuit breaker: closing circuit for '{}' after {} trial successes",
                        self.provider, circuit.half_open_successes
                    );
                    circuit.close();
                }
            }
            CircuitState::Open => {
                // A request admitted before the circuit opened finished late
                debug!(
                    "Circuit breaker: late success for '{}' in Open state",
                    self.provider
                );
            }
        }
    }

    /// Record a failed request.
    ///
    /// Adds the failure to the rolling window and may open the circuit.
    /// In HalfOpen state, any failure immediately reopens the circuit.
    pub fn record_failure(&self) {
        let mut circuit = self.lock_circuit();
        let now = Instant::now();

        circuit.prune(now, self.config.failure_window);
        circuit.failures.push_back(now);
        circuit.last_failure = Some(now);

        match circuit.state {
            CircuitState::Closed => {
                let failures = circuit.failures.len() as u32;
                if failures >= self.config.failure_threshold {
                    info!(
                        "Circuit breaker: opening circuit for '{}' after {} failures in {:?}",
                        self.provider, failures, self.config.failure_window
                    );
                    circuit.open(now);
                } else {
                    debug!(
                        "Circuit breaker: failure for '{}' ({}/{})",
                        self.provider, failures, self.config.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                info!(
                    "Circuit breaker: reopening circuit for '{}' after failed trial request",
                    self.provider
                );
                circuit.open(now);
            }
            CircuitState::Open => {
                debug!(
                    "Circuit breaker: additional failure for '{}' (already open)",
                    self.provider
                );
            }
        }
    }

    /// Get the current state.
    pub fn state(&self) -> CircuitState {
        self.lock_circuit().state
    }

    /// Number of failures still inside the rolling window.
    pub fn failure_count(&self) -> u32 {
        let mut circuit = self.lock_circuit();
        circuit.prune(Instant::now(), self.config.failure_window);
        circuit.failures.len() as u32
    }

    /// Time left before the open circuit lets a trial request through.
    ///
    /// `None` unless the circuit is Open.
    pub fn retry_after(&self) -> Option<Duration> {
        let circuit = self.lock_circuit();
        match (circuit.state, circuit.opened_at) {
            (CircuitState::Open, Some(opened)) => {
                Some(self.config.recovery_timeout.saturating_sub(opened.elapsed()))
            }
            _ => None,
        }
    }

    /// Reset the circuit to Closed state.
    pub fn reset(&self) {
        let mut circuit = self.lock_circuit();
        info!(
            "Circuit breaker: manually resetting circuit for '{}'",
            self.provider
        );
        circuit.close();
    }

    /// Get a point-in-time snapshot of the circuit.
    pub fn metrics(&self) -> CircuitMetrics {
        let mut circuit = self.lock_circuit();
        circuit.prune(Instant::now(), self.config.failure_window);

        let retry_after = match (circuit.state, circuit.opened_at) {
            (CircuitState::Open, Some(opened)) => {
                Some(self.config.recovery_timeout.saturating_sub(opened.elapsed()))
            }
            _ => None,
        };

        CircuitMetrics {
            provider: self.provider.to_string(),
            state: circuit.state,
            failure_count: circuit.failures.len() as u32,
            last_failure: circuit.last_failure,
            retry_after,
        }
    }
}

/// Metrics for a circuit.
#[derive(Clone, Debug)]
pub struct CircuitMetrics {
    /// Provider identifier.
    pub provider: String,
    /// Current circuit state.
    pub state: CircuitState,
    /// Number of failures inside the rolling window.
    pub failure_count: u32,
    /// Time of the last failure.
    pub last_failure: Option<Instant>,
    /// Remaining cool-down when Open.
    pub retry_after: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, recovery: Duration, half_open: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            failure_window: Duration::from_secs(60),
            recovery_timeout: recovery,
            half_open_success_threshold: half_open,
        }
    }

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::new("TEST_PROVIDER");

        assert!(cb.is_allowed());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.retry_after(), None);
    }

    #[test]
    fn test_circuit_opens_after_threshold() {
        let cb = CircuitBreaker::with_config(
            "FAILING_PROVIDER",
            config(3, Duration::from_secs(60), 1),
        );

        // First two failures don't open circuit
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        assert_eq!(cb.state(), CircuitState::Closed);

        // Third failure opens circuit
        cb.record_failure();
        assert!(!cb.is_allowed());
        assert_eq!(cb.state(), CircuitState::Open);

        let remaining = cb.retry_after().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
    }

    #[test]
    fn test_failures_outside_window_are_forgotten() {
        let cb = CircuitBreaker::with_config(
            "SLOW_BURN_PROVIDER",
            CircuitBreakerConfig {
                failure_threshold: 2,
                failure_window: Duration::from_millis(20),
                ..Default::default()
            },
        );

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cb.failure_count(), 0);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = CircuitBreaker::with_config(
            "INTERMITTENT_PROVIDER",
            CircuitBreakerConfig {
                failure_threshold: 3,
                ..Default::default()
            },
        );

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.failure_count(), 2);

        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_circuit_transitions_to_half_open() {
        let cb = CircuitBreaker::with_config(
            "RECOVERING_PROVIDER",
            config(1, Duration::from_millis(10), 1),
        );

        // Open the circuit
        cb.record_failure();
        assert!(!cb.is_allowed());
        assert_eq!(cb.state(), CircuitState::Open);

        // Wait for recovery timeout
        std::thread::sleep(Duration::from_millis(20));

        // Should transition to HalfOpen
        assert!(cb.is_allowed());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.retry_after(), None);
    }

    #[test]
    fn test_half_open_closes_on_success() {
        let cb = CircuitBreaker::with_config(
            "HEALING_PROVIDER",
            config(1, Duration::from_millis(10), 2),
        );

        // Open and transition to HalfOpen
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        cb.is_allowed(); // Triggers transition

        // First success
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // Second success closes circuit
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_half_open_reopens_on_failure() {
        let cb = CircuitBreaker::with_config(
            "RELAPSING_PROVIDER",
            config(1, Duration::from_millis(10), 2),
        );

        // Open and transition to HalfOpen
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        cb.is_allowed();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // Failure reopens circuit and restarts the cool-down
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn test_manual_reset() {
        let cb = CircuitBreaker::with_config(
            "RESET_PROVIDER",
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
        );

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_metrics() {
        let cb = CircuitBreaker::new("METRIC_PROVIDER");

        cb.record_failure();
        cb.record_failure();

        let metrics = cb.metrics();
        assert_eq!(metrics.provider, "METRIC_PROVIDER");
        assert_eq!(metrics.failure_count, 2);
        assert_eq!(metrics.state, CircuitState::Closed);
        assert!(metrics.last_failure.is_some());
        assert!(metrics.retry_after.is_none());
    }
}
