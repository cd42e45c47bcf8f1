//! Circuit breaker guarding calls to the cache backend.
//!
//! The state machine itself lives in `readthrough_core::breaker`; this type
//! wraps it in a lock, feeds it the clock, and reports transitions to the
//! log and to the configured hook.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;

use readthrough_core::breaker::{
    Breaker, BreakerError, BreakerMachine, BreakerSettings, CircuitState, Counts, Rejection,
    Result, Transition,
};
use readthrough_core::cache;

/// Rolling-window circuit breaker.
///
/// Trips once the window holds at least `min_requests` calls and the failure
/// ratio reaches `failure_ratio`; probes recovery after `open_timeout`.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    machine: Mutex<BreakerMachine>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    pub fn new(settings: BreakerSettings) -> Self {
        tracing::info!(
            breaker = %settings.name,
            min_requests = settings.min_requests,
            failure_ratio = settings.failure_ratio,
            open_timeout_ms = settings.open_timeout.as_millis() as u64,
            max_half_open_requests = settings.max_half_open_requests,
            "Circuit breaker initialized"
        );
        let machine = BreakerMachine::new(&settings, Instant::now());
        Self {
            settings,
            machine: Mutex::new(machine),
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Current state, after applying any elapsed timeout.
    pub fn state(&self) -> CircuitState {
        let (state, transition) = self
            .lock()
            .current_state(&self.settings, Instant::now());
        self.report(transition);
        state
    }

    /// Counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.lock().counts()
    }

    fn lock(&self) -> MutexGuard<'_, BreakerMachine> {
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, generation: u64, success: bool) {
        let transition =
            self.lock()
                .after_request(&self.settings, generation, success, Instant::now());
        self.report(transition);
    }

    fn report(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.settings.name,
                %from,
                %to,
                "Circuit breaker opened, failing fast"
            ),
            CircuitState::HalfOpen => tracing::info!(
                breaker = %self.settings.name,
                %from,
                %to,
                "Circuit breaker half-open, probing recovery"
            ),
            CircuitState::Closed => tracing::info!(
                breaker = %self.settings.name,
                %from,
                %to,
                "Circuit breaker closed"
            ),
        }

        if let Some(hook) = &self.settings.on_state_change {
            hook(&self.settings.name, from, to);
        }
    }
}

/// Records a failure if an admitted call is dropped before it finishes, so
/// an abandoned half-open probe cannot hold the breaker half-open forever.
struct InFlight<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    done: bool,
}

impl InFlight<'_> {
    fn finish(mut self, success: bool) {
        self.done = true;
        self.breaker.record(self.generation, success);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.breaker.record(self.generation, false);
        }
    }
}

#[async_trait]
impl Breaker for CircuitBreaker {
    async fn execute<V, F, Fut>(&self, operation: F) -> Result<V>
    where
        V: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = cache::Result<V>> + Send,
    {
        let admission = self
            .lock()
            .before_request(&self.settings, Instant::now());

        let admission = match admission {
            Ok(admission) => admission,
            Err(Rejection::Open) => {
                return Err(BreakerError::Open {
                    name: self.settings.name.clone(),
                })
            }
            Err(Rejection::TooManyRequests) => {
                return Err(BreakerError::TooManyRequests {
                    name: self.settings.name.clone(),
                })
            }
        };
        self.report(admission.transition);

        let in_flight = InFlight {
            breaker: self,
            generation: admission.generation,
            done: false,
        };

        let result = operation().await;
        in_flight.finish(result.is_ok());

        if let Err(err) = &result {
            tracing::debug!(breaker = %self.settings.name, error = %err, "Guarded call failed");
        }
        result.map_err(BreakerError::Operation)
    }
}
