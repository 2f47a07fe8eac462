//! Circuit breaker protecting against upstream failure cascades.
//!
//! States: CLOSED (normal), OPEN (calls blocked), HALF_OPEN (recovery probe).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// Per-endpoint-family circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    success_threshold: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, 5, Duration::from_secs(60), 2)
    }

    pub fn with_settings(
        name: impl Into<String>,
        failure_threshold: u32,
        reset_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            reset_timeout,
            success_threshold,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    /// Check whether a call may proceed. Returns the seconds until the next
    /// recovery attempt when the circuit is open.
    pub fn check(&self) -> Result<(), u64> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == CircuitState::Open {
            let elapsed = inner
                .last_failure
                .map(|t| t.elapsed())
                .unwrap_or(self.reset_timeout);

            if elapsed >= self.reset_timeout {
                info!(circuit = %self.name, "attempting recovery (half-open)");
                inner.state = CircuitState::HalfOpen;
                inner.successes = 0;
            } else {
                return Err((self.reset_timeout - elapsed).as_secs().max(1));
            }
        }

        Ok(())
    }

    pub fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.successes += 1;
            if inner.successes >= self.success_threshold {
                info!(circuit = %self.name, "recovered, closing circuit");
                inner.state = CircuitState::Closed;
                inner.successes = 0;
            }
        }
    }

    pub fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures += 1;
        inner.last_failure = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                warn!(circuit = %self.name, "failure in half-open, reopening");
                inner.state = CircuitState::Open;
                inner.successes = 0;
            }
            CircuitState::Closed if inner.failures >= self.failure_threshold => {
                warn!(
                    circuit = %self.name,
                    failures = inner.failures,
                    "failure threshold reached, opening circuit"
                );
                inner.state = CircuitState::Open;
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
