// Circuit breaker guarding the graph-metadata upstream
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

/// CLOSED -> OPEN -> HALF-OPEN breaker. Repeated upstream failures must
/// not multiply into retry storms against a degraded dependency, so once
/// the failure threshold is reached calls short-circuit until the
/// cooldown elapses, after which a single trial call is let through.
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Whether a call may proceed. While open within the cooldown this
    /// fails fast; after the cooldown it admits exactly one trial call
    /// and holds further callers until the trial outcome is recorded.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { since } => {
                if since.elapsed() >= self.cooldown {
                    *state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => false,
        }
    }

    pub fn on_success(&self) {
        let mut state = self.state.lock().unwrap();
        *state = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    pub fn on_failure(&self) {
        let mut state = self.state.lock().unwrap();
        *state = match *state {
            BreakerState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    tracing::warn!(failures, "circuit breaker opened");
                    BreakerState::Open {
                        since: Instant::now(),
                    }
                } else {
                    BreakerState::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            BreakerState::Open { .. } | BreakerState::HalfOpen => BreakerState::Open {
                since: Instant::now(),
            },
        };
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock().unwrap(), BreakerState::Open { .. })
    }
}
