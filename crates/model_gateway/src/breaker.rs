//! Circuit breaker for outbound provider calls.
//!
//! Explicit `Closed -> Open -> HalfOpen -> Closed` state machine with a
//! count-based sliding window, evaluated per provider/model key. Replaces
//! the declarative annotations of annotation-driven resilience frameworks
//! with a state machine the router drives directly.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use triage_core::config::ResilienceConfig;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
enum State {
    Closed,
    Open { until: Instant },
    HalfOpen { admitted: u32, successes: u32 },
}

#[derive(Debug)]
struct Entry {
    state: State,
    /// Recent outcomes, newest last; true = success.
    window: VecDeque<bool>,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: State::Closed,
            window: VecDeque::new(),
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }
}

/// Breaker settings derived from the resilience configuration.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub window_size: usize,
    pub min_calls: usize,
    pub failure_rate_threshold: f64,
    pub open_cooldown: Duration,
    pub half_open_probes: u32,
}

impl From<&ResilienceConfig> for BreakerSettings {
    fn from(cfg: &ResilienceConfig) -> Self {
        Self {
            window_size: cfg.window_size,
            min_calls: cfg.min_calls,
            failure_rate_threshold: cfg.failure_rate_threshold,
            open_cooldown: Duration::from_secs(cfg.open_cooldown_secs),
            half_open_probes: cfg.half_open_probes,
        }
    }
}

/// Per-key circuit breaker table. Entries live behind a concurrent map, so
/// independent keys never block each other.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    entries: DashMap<String, Entry>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            entries: DashMap::new(),
        }
    }

    /// Whether a call for this key may proceed. An expired open state
    /// transitions to half-open and admits the caller as a probe.
    pub fn try_acquire(&self, key: &str) -> bool {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(Entry::new);

        match entry.state {
            State::Closed => true,
            State::Open { until } => {
                if Instant::now() >= until {
                    tracing::info!(key = key, "circuit half-open, admitting probe");
                    entry.state = State::HalfOpen {
                        admitted: 1,
                        successes: 0,
                    };
                    true
                } else {
                    false
                }
            }
            State::HalfOpen {
                ref mut admitted, ..
            } => {
                if *admitted < self.settings.half_open_probes {
                    *admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call outcome.
    pub fn record_success(&self, key: &str) {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(Entry::new);

        match entry.state {
            State::Closed => {
                Self::push_outcome(&mut entry, &self.settings, true);
            }
            State::HalfOpen {
                ref mut successes, ..
            } => {
                *successes += 1;
                if *successes >= self.settings.half_open_probes {
                    tracing::info!(key = key, "circuit closed after successful probes");
                    entry.state = State::Closed;
                    entry.window.clear();
                }
            }
            // Late result from before the circuit opened; ignore.
            State::Open { .. } => {}
        }
    }

    /// Record a failed call outcome.
    pub fn record_failure(&self, key: &str) {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(Entry::new);

        match entry.state {
            State::Closed => {
                Self::push_outcome(&mut entry, &self.settings, false);
                if entry.window.len() >= self.settings.min_calls
                    && entry.failure_rate() >= self.settings.failure_rate_threshold
                {
                    tracing::warn!(
                        key = key,
                        failure_rate = entry.failure_rate(),
                        "circuit OPENED"
                    );
                    entry.state = State::Open {
                        until: Instant::now() + self.settings.open_cooldown,
                    };
                    entry.window.clear();
                }
            }
            State::HalfOpen { .. } => {
                tracing::warn!(key = key, "probe failed, circuit re-opened");
                entry.state = State::Open {
                    until: Instant::now() + self.settings.open_cooldown,
                };
            }
            State::Open { .. } => {}
        }
    }

    /// Observable state for a key. Keys never seen are closed.
    pub fn state(&self, key: &str) -> BreakerState {
        match self.entries.get(key).map(|e| e.state.clone()) {
            None | Some(State::Closed) => BreakerState::Closed,
            Some(State::Open { .. }) => BreakerState::Open,
            Some(State::HalfOpen { .. }) => BreakerState::HalfOpen,
        }
    }

    fn push_outcome(entry: &mut Entry, settings: &BreakerSettings, ok: bool) {
        entry.window.push_back(ok);
        while entry.window.len() > settings.window_size {
            entry.window.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(cooldown: Duration, probes: u32) -> BreakerSettings {
        BreakerSettings {
            window_size: 10,
            min_calls: 5,
            failure_rate_threshold: 0.5,
            open_cooldown: cooldown,
            half_open_probes: probes,
        }
    }

    #[test]
    fn opens_after_failure_rate_exceeded() {
        let breaker = CircuitBreaker::new(settings(Duration::from_secs(30), 3));

        for _ in 0..4 {
            assert!(breaker.try_acquire("p:m"));
            breaker.record_failure("p:m");
        }
        assert_eq!(breaker.state("p:m"), BreakerState::Closed);

        breaker.record_failure("p:m");
        assert_eq!(breaker.state("p:m"), BreakerState::Open);
        assert!(!breaker.try_acquire("p:m"));
    }

    #[test]
    fn successes_keep_circuit_closed() {
        let breaker = CircuitBreaker::new(settings(Duration::from_secs(30), 3));

        for _ in 0..20 {
            assert!(breaker.try_acquire("p:m"));
            breaker.record_success("p:m");
        }
        assert_eq!(breaker.state("p:m"), BreakerState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(settings(Duration::from_millis(10), 3));

        for _ in 0..5 {
            breaker.record_failure("p:m");
        }
        assert_eq!(breaker.state("p:m"), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.try_acquire("p:m"));
        assert_eq!(breaker.state("p:m"), BreakerState::HalfOpen);

        breaker.record_failure("p:m");
        assert_eq!(breaker.state("p:m"), BreakerState::Open);
    }

    #[test]
    fn half_open_probes_close_the_circuit() {
        let breaker = CircuitBreaker::new(settings(Duration::from_millis(10), 2));

        for _ in 0..5 {
            breaker.record_failure("p:m");
        }
        std::thread::sleep(Duration::from_millis(20));

        assert!(breaker.try_acquire("p:m"));
        breaker.record_success("p:m");
        assert!(breaker.try_acquire("p:m"));
        breaker.record_success("p:m");

        assert_eq!(breaker.state("p:m"), BreakerState::Closed);
        assert!(breaker.try_acquire("p:m"));
    }

    #[test]
    fn probe_admission_is_bounded() {
        let breaker = CircuitBreaker::new(settings(Duration::from_millis(10), 2));

        for _ in 0..5 {
            breaker.record_failure("p:m");
        }
        std::thread::sleep(Duration::from_millis(20));

        assert!(breaker.try_acquire("p:m"));
        assert!(breaker.try_acquire("p:m"));
        // Third concurrent probe is rejected while the first two are pending.
        assert!(!breaker.try_acquire("p:m"));
    }

    #[test]
    fn keys_are_independent() {
        let breaker = CircuitBreaker::new(settings(Duration::from_secs(30), 3));

        for _ in 0..5 {
            breaker.record_failure("azure-openai:gpt-4o");
        }
        assert_eq!(breaker.state("azure-openai:gpt-4o"), BreakerState::Open);
        assert!(breaker.try_acquire("azure-openai:gpt-4o-mini"));
    }
}
