//! Pure circuit breaker state machine.
//!
//! Time is passed in explicitly so every transition can be tested without a
//! clock. The caller holds the machine behind a lock and reports transitions
//! to logs and hooks after releasing it.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::BreakerSettings;

/// Circuit breaker states representing the current operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(name)
    }
}

/// Request outcomes counted within the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}

/// A state change, reported so the caller can log it and run the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Why a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Open,
    TooManyRequests,
}

/// Ticket for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Generation the request was admitted in; outcomes from an older
    /// generation are discarded.
    pub generation: u64,
    pub transition: Option<Transition>,
}

/// Breaker state plus the counts of the current generation.
///
/// A new generation starts on every state change and on every rolling
/// window boundary while closed.
#[derive(Debug, Clone)]
pub struct BreakerMachine {
    state: CircuitState,
    counts: Counts,
    generation: u64,
    expiry: Option<Instant>,
}

impl BreakerMachine {
    /// Creates a closed machine whose first window starts at `now`.
    pub fn new(settings: &BreakerSettings, now: Instant) -> Self {
        let mut machine = Self {
            state: CircuitState::Closed,
            counts: Counts::default(),
            generation: 0,
            expiry: None,
        };
        machine.new_generation(settings, now);
        machine
    }

    /// Returns the state without advancing time.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns the counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Advances time: rolls the closed window or moves open to half-open.
    pub fn current_state(
        &mut self,
        settings: &BreakerSettings,
        now: Instant,
    ) -> (CircuitState, Option<Transition>) {
        let expired = self.expiry.is_some_and(|expiry| expiry <= now);
        let transition = match self.state {
            CircuitState::Closed if expired => {
                self.new_generation(settings, now);
                None
            }
            CircuitState::Open if expired => {
                self.set_state(CircuitState::HalfOpen, settings, now)
            }
            _ => None,
        };
        (self.state, transition)
    }

    /// Decides whether a request may run.
    pub fn before_request(
        &mut self,
        settings: &BreakerSettings,
        now: Instant,
    ) -> Result<Admission, Rejection> {
        let (state, transition) = self.current_state(settings, now);

        match state {
            CircuitState::Open => return Err(Rejection::Open),
            CircuitState::HalfOpen if self.counts.requests >= settings.max_half_open_requests => {
                return Err(Rejection::TooManyRequests)
            }
            _ => {}
        }

        self.counts.on_request();
        Ok(Admission {
            generation: self.generation,
            transition,
        })
    }

    /// Records the outcome of an admitted request.
    pub fn after_request(
        &mut self,
        settings: &BreakerSettings,
        generation: u64,
        success: bool,
        now: Instant,
    ) -> Option<Transition> {
        let (state, transition) = self.current_state(settings, now);
        if generation != self.generation {
            return transition;
        }

        if success {
            self.on_success(state, settings, now)
        } else {
            self.on_failure(state, settings, now)
        }
    }

    fn on_success(
        &mut self,
        state: CircuitState,
        settings: &BreakerSettings,
        now: Instant,
    ) -> Option<Transition> {
        self.counts.on_success();
        match state {
            CircuitState::HalfOpen
                if self.counts.consecutive_successes >= settings.max_half_open_requests =>
            {
                self.set_state(CircuitState::Closed, settings, now)
            }
            _ => None,
        }
    }

    fn on_failure(
        &mut self,
        state: CircuitState,
        settings: &BreakerSettings,
        now: Instant,
    ) -> Option<Transition> {
        self.counts.on_failure();
        match state {
            CircuitState::Closed if settings.ready_to_trip(&self.counts) => {
                self.set_state(CircuitState::Open, settings, now)
            }
            CircuitState::HalfOpen => self.set_state(CircuitState::Open, settings, now),
            _ => None,
        }
    }

    fn set_state(
        &mut self,
        to: CircuitState,
        settings: &BreakerSettings,
        now: Instant,
    ) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.new_generation(settings, now);
        Some(Transition { from, to })
    }

    fn new_generation(&mut self, settings: &BreakerSettings, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        self.counts = Counts::default();
        self.expiry = match self.state {
            CircuitState::Closed if settings.interval.is_zero() => None,
            CircuitState::Closed => Some(now + settings.interval),
            CircuitState::Open => Some(now + settings.open_timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> BreakerSettings {
        BreakerSettings {
            name: "test".to_string(),
            max_half_open_requests: 2,
            interval: Duration::from_secs(10),
            open_timeout: Duration::from_secs(5),
            min_requests: 4,
            failure_ratio: 0.5,
            on_state_change: None,
        }
    }

    fn run(
        machine: &mut BreakerMachine,
        settings: &BreakerSettings,
        success: bool,
        now: Instant,
    ) -> Option<Transition> {
        let admission = machine
            .before_request(settings, now)
            .expect("request should be admitted");
        machine.after_request(settings, admission.generation, success, now)
    }

    fn trip(machine: &mut BreakerMachine, settings: &BreakerSettings, now: Instant) {
        for _ in 0..settings.min_requests {
            if machine.state() == CircuitState::Open {
                break;
            }
            run(machine, settings, false, now);
        }
        assert_eq!(machine.state(), CircuitState::Open);
    }

    #[test]
    fn test_starts_closed() {
        let machine = BreakerMachine::new(&settings(), Instant::now());
        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.counts(), Counts::default());
    }

    #[test]
    fn test_does_not_trip_below_min_requests() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);

        for _ in 0..3 {
            assert_eq!(run(&mut machine, &settings, false, now), None);
        }

        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.counts().consecutive_failures, 3);
    }

    #[test]
    fn test_trips_when_ratio_reached() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);

        run(&mut machine, &settings, true, now);
        run(&mut machine, &settings, true, now);
        run(&mut machine, &settings, false, now);
        let transition = run(&mut machine, &settings, false, now);

        assert_eq!(
            transition,
            Some(Transition {
                from: CircuitState::Closed,
                to: CircuitState::Open
            })
        );
    }

    #[test]
    fn test_open_rejects() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);
        trip(&mut machine, &settings, now);

        let rejected = machine.before_request(&settings, now + Duration::from_secs(1));
        assert_eq!(rejected, Err(Rejection::Open));
    }

    #[test]
    fn test_open_moves_to_half_open_after_timeout() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);
        trip(&mut machine, &settings, now);

        let admission = machine
            .before_request(&settings, now + Duration::from_secs(5))
            .unwrap();

        assert_eq!(
            admission.transition,
            Some(Transition {
                from: CircuitState::Open,
                to: CircuitState::HalfOpen
            })
        );
        assert_eq!(machine.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_limits_probes() {
        let settings = settings();
        let now = Instant::now();
        let later = now + Duration::from_secs(6);
        let mut machine = BreakerMachine::new(&settings, now);
        trip(&mut machine, &settings, now);

        machine.before_request(&settings, later).unwrap();
        machine.before_request(&settings, later).unwrap();

        assert_eq!(
            machine.before_request(&settings, later),
            Err(Rejection::TooManyRequests)
        );
    }

    #[test]
    fn test_half_open_closes_after_consecutive_successes() {
        let settings = settings();
        let now = Instant::now();
        let later = now + Duration::from_secs(6);
        let mut machine = BreakerMachine::new(&settings, now);
        trip(&mut machine, &settings, now);

        assert_eq!(run(&mut machine, &settings, true, later), None);
        let transition = run(&mut machine, &settings, true, later);

        assert_eq!(
            transition,
            Some(Transition {
                from: CircuitState::HalfOpen,
                to: CircuitState::Closed
            })
        );
        assert_eq!(machine.counts(), Counts::default());
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let settings = settings();
        let now = Instant::now();
        let later = now + Duration::from_secs(6);
        let mut machine = BreakerMachine::new(&settings, now);
        trip(&mut machine, &settings, now);

        run(&mut machine, &settings, true, later);
        let transition = run(&mut machine, &settings, false, later);

        assert_eq!(
            transition,
            Some(Transition {
                from: CircuitState::HalfOpen,
                to: CircuitState::Open
            })
        );
        assert_eq!(
            machine.before_request(&settings, later),
            Err(Rejection::Open)
        );
    }

    #[test]
    fn test_closed_window_resets_counts() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);

        for _ in 0..3 {
            run(&mut machine, &settings, false, now);
        }

        // The fourth failure lands in a fresh window and cannot trip alone.
        let later = now + Duration::from_secs(11);
        run(&mut machine, &settings, false, later);

        assert_eq!(machine.state(), CircuitState::Closed);
        assert_eq!(machine.counts().requests, 1);
    }

    #[test]
    fn test_zero_interval_never_resets() {
        let settings = BreakerSettings {
            interval: Duration::ZERO,
            ..settings()
        };
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);

        run(&mut machine, &settings, true, now);
        run(&mut machine, &settings, true, now + Duration::from_secs(3600));

        assert_eq!(machine.counts().requests, 2);
    }

    #[test]
    fn test_stale_generation_outcome_ignored() {
        let settings = settings();
        let now = Instant::now();
        let mut machine = BreakerMachine::new(&settings, now);

        let stale = machine.before_request(&settings, now).unwrap();
        trip(&mut machine, &settings, now);

        let transition = machine.after_request(&settings, stale.generation, true, now);

        assert_eq!(transition, None);
        assert_eq!(machine.state(), CircuitState::Open);
        assert_eq!(machine.counts(), Counts::default());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
    }
}
