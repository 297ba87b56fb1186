/*!
 * # Circuit Breaker
 *
 * Guards calls to remote collaborators (the route optimizer) so that a dead
 * dependency is failed fast instead of tying up request handlers until their
 * timeouts fire.
 */

use metrics::{counter, gauge};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing trial requests to test recovery
    HalfOpen,
}

impl CircuitState {
    fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Duration to wait before transitioning from Open to HalfOpen
    pub timeout: Duration,
    /// Successful trial calls needed in HalfOpen to close the circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 1,
        }
    }
}

#[derive(Debug)]
struct CircuitBreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    /// Set while the single half-open trial call is running
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
}

#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    CircuitOpen,
    #[error("Service call failed: {0}")]
    ServiceFailure(E),
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Run `f` unless the circuit is open. An `Err` from the future counts as a failure.
    pub async fn call<F, Fut, R, E>(&self, f: F) -> Result<R, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let admission = match self.admit() {
            Some(admission) => admission,
            None => {
                counter!("fleetmatch.circuit_breaker.rejected", 1, "breaker" => self.name);
                return Err(CircuitBreakerError::CircuitOpen);
            }
        };
        // frees the trial slot even if the caller drops this future mid-flight
        let _trial = (admission == Admission::Trial).then(|| TrialGuard(self));

        match f().await {
            Ok(result) => {
                self.on_success();
                Ok(result)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::ServiceFailure(err))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitBreakerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn admit(&self) -> Option<Admission> {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::HalfOpen if state.trial_in_flight => None,
            CircuitState::HalfOpen => {
                state.trial_in_flight = true;
                Some(Admission::Trial)
            }
            CircuitState::Open => match state.last_failure_time {
                Some(last_failure) if last_failure.elapsed() >= self.config.timeout => {
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                    state.trial_in_flight = true;
                    gauge!("fleetmatch.circuit_breaker.state", CircuitState::HalfOpen.as_gauge(), "breaker" => self.name);
                    Some(Admission::Trial)
                }
                _ => None,
            },
        }
    }

    fn on_success(&self) {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.last_failure_time = None;
                    gauge!("fleetmatch.circuit_breaker.state", CircuitState::Closed.as_gauge(), "breaker" => self.name);
                }
            }
            CircuitState::Open => {
                state.state = CircuitState::Closed;
                state.failure_count = 0;
                state.success_count = 0;
                state.last_failure_time = None;
            }
        }
    }

    fn on_failure(&self) {
        let mut state = self.lock();

        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        let opens = match state.state {
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            // any failure during a trial reopens
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if opens {
            state.state = CircuitState::Open;
            state.success_count = 0;
            gauge!("fleetmatch.circuit_breaker.state", CircuitState::Open.as_gauge(), "breaker" => self.name);
            warn!(
                breaker = self.name,
                failures = state.failure_count,
                "Circuit breaker opened"
            );
        }
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    /// The one call allowed through while half-open
    Trial,
}

struct TrialGuard<'a>(&'a CircuitBreaker);

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().trial_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                timeout,
                success_threshold: 1,
            },
        )
    }

    #[tokio::test]
    async fn stays_closed_on_success() {
        let cb = breaker(3, Duration::from_millis(100));

        let result = cb.call(|| async { Ok::<i32, &str>(42) }).await;
        assert_eq!(result.ok(), Some(42));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_threshold_and_rejects() {
        let cb = breaker(2, Duration::from_secs(60));

        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(|| async { Ok::<i32, &str>(42) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn half_open_trial_closes_the_circuit() {
        let cb = breaker(1, Duration::from_millis(20));

        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let result = cb.call(|| async { Ok::<i32, &str>(7) }).await;
        assert_eq!(result.ok(), Some(7));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn failed_trial_reopens() {
        let cb = breaker(1, Duration::from_millis(20));

        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let result = cb.call(|| async { Err::<i32, &str>("still down") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::ServiceFailure("still down"))));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_lets_one_trial_through_at_a_time() {
        let cb = breaker(1, Duration::from_millis(20));

        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = cb.call(|| async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok::<i32, &str>(1)
        });
        let rival = async {
            let _ = started_rx.await;
            let rejected = cb.call(|| async { Ok::<i32, &str>(2) }).await;
            let _ = release_tx.send(());
            rejected
        };

        let (trial, rival) = tokio::join!(trial, rival);
        assert_eq!(trial.ok(), Some(1));
        assert!(matches!(rival, Err(CircuitBreakerError::CircuitOpen)));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn abandoned_trial_frees_the_slot() {
        let cb = breaker(1, Duration::from_millis(20));

        let _ = cb.call(|| async { Err::<i32, &str>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let stuck = cb.call(futures::future::pending::<Result<i32, &str>>);
        assert!(tokio::time::timeout(Duration::from_millis(10), stuck)
            .await
            .is_err());

        let result = cb.call(|| async { Ok::<i32, &str>(3) }).await;
        assert_eq!(result.ok(), Some(3));
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
