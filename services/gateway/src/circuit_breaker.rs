//! Circuit breaker pattern for fault tolerance.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{GatewayError, Result};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - requests pass through.
    Closed,
    /// Failing - requests are rejected without executing.
    Open,
    /// Testing recovery - limited probe requests allowed.
    HalfOpen,
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub max_failures: u32,
    /// Time to wait in open before allowing a recovery probe.
    pub timeout: Duration,
    /// Maximum concurrent probes allowed in half-open.
    pub max_requests_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            timeout: Duration::from_secs(30),
            max_requests_half_open: 1,
        }
    }
}

/// Everything the breaker tracks, guarded by one mutex so observers always
/// see a consistent `(state, counters, opened_at)` triple.
#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_in_flight: u32,
    opened_at: Option<Instant>,

    // Metrics
    total_requests: u64,
    total_failures: u64,
    circuit_opens: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_in_flight: 0,
            opened_at: None,
            total_requests: 0,
            total_failures: 0,
            circuit_opens: 0,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.consecutive_failures = 0;
        self.half_open_in_flight = 0;
        self.circuit_opens += 1;
    }
}

/// How a call was admitted; probes carry extra bookkeeping on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// Thread-safe three-state circuit breaker.
///
/// One instance per gateway; every caller through that gateway shares it.
/// Declines do not trip it: only errors the transport layer classifies as
/// channel failures count (see `GatewayError::counts_against_breaker`).
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            config,
        }
    }

    /// Execute an operation through the circuit breaker.
    ///
    /// Rejected calls fail fast with `CircuitOpen` or `TooManyRequests`
    /// without invoking the operation.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.admit()?;
        let result = operation().await;
        match &result {
            Ok(_) => self.on_success(admission),
            Err(err) if err.counts_against_breaker() => self.on_failure(admission),
            // Cancellations and local rejections say nothing about channel
            // health; release the probe slot and leave the state alone.
            Err(_) => self.on_neutral(admission),
        }
        result
    }

    fn admit(&self) -> Result<Admission> {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        match inner.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 1;
                    tracing::info!("circuit breaker transitioning to half-open");
                    Ok(Admission::Probe)
                } else {
                    Err(GatewayError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.max_requests_half_open {
                    inner.half_open_in_flight += 1;
                    Ok(Admission::Probe)
                } else {
                    Err(GatewayError::TooManyRequests)
                }
            }
        }
    }

    fn on_success(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        if admission == Admission::Probe {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.half_open_in_flight = 0;
                inner.opened_at = None;
                tracing::info!("circuit breaker closed after successful probe");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        inner.total_failures += 1;
        if admission == Admission::Probe {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.max_failures {
                    let failures = inner.consecutive_failures;
                    inner.open(Instant::now());
                    tracing::warn!(failures, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                inner.open(Instant::now());
                tracing::warn!("circuit breaker reopened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    fn on_neutral(&self, admission: Admission) {
        if admission == Admission::Probe {
            let mut inner = self.inner.lock();
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    /// Current circuit state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Breaker metrics for monitoring.
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            circuit_opens: inner.circuit_opens,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    /// Return the breaker to closed with zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_in_flight = 0;
        inner.opened_at = None;
    }
}

/// Snapshot of breaker counters for monitoring.
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    /// State at snapshot time.
    pub state: CircuitState,
    /// Total calls offered, including rejected ones.
    pub total_requests: u64,
    /// Total failed executions.
    pub total_failures: u64,
    /// Number of times the circuit opened.
    pub circuit_opens: u64,
    /// Consecutive failures at snapshot time.
    pub consecutive_failures: u32,
}
