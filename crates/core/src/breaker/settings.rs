use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{CircuitState, Counts};

/// Callback invoked on every state transition with `(name, from, to)`.
pub type StateChangeHook = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

/// Tuning for a circuit breaker.
#[derive(Clone)]
pub struct BreakerSettings {
    /// Name used in logs and errors.
    pub name: String,
    /// Probe calls allowed while half-open; this many consecutive successes
    /// close the breaker.
    pub max_half_open_requests: u32,
    /// Length of the rolling window in which closed-state counts accumulate.
    /// Zero keeps counting forever.
    pub interval: Duration,
    /// How long the breaker stays open before allowing probes.
    pub open_timeout: Duration,
    /// Minimum requests in the window before the failure ratio is considered.
    pub min_requests: u32,
    /// Failure ratio (failures / requests) at or above which the breaker trips.
    pub failure_ratio: f64,
    /// Observability hook for state transitions.
    pub on_state_change: Option<StateChangeHook>,
}

impl BreakerSettings {
    /// Creates settings with the given name and default tuning.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the state change hook.
    pub fn with_state_change_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Trip predicate evaluated after each closed-state failure.
    pub fn ready_to_trip(&self, counts: &Counts) -> bool {
        if counts.requests == 0 || counts.requests < self.min_requests {
            return false;
        }
        let ratio = f64::from(counts.total_failures) / f64::from(counts.requests);
        ratio >= self.failure_ratio
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: "cache".to_string(),
            max_half_open_requests: 3,
            interval: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            min_requests: 10,
            failure_ratio: 0.6,
            on_state_change: None,
        }
    }
}

impl fmt::Debug for BreakerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerSettings")
            .field("name", &self.name)
            .field("max_half_open_requests", &self.max_half_open_requests)
            .field("interval", &self.interval)
            .field("open_timeout", &self.open_timeout)
            .field("min_requests", &self.min_requests)
            .field("failure_ratio", &self.failure_ratio)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
