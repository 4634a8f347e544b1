//! Circuit Breaker
//!
//! Upstream health protection that stops issuing calls to a degraded market
//! data source after repeated failures, then lets a single trial call through
//! once the cooldown has elapsed. Other callers fail fast until the trial
//! settles, or until a trial left unsettled for a full cooldown is abandoned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default consecutive failures before the breaker opens
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default cooldown period in seconds
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitBreakerError {
    #[error("Circuit open - upstream unhealthy, retry in {0}s")]
    Open(u64),

    #[error("Circuit half-open - trial call already in flight")]
    TrialInFlight,
}

/// Status of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitBreakerStatus {
    /// Calls flow normally
    Closed,
    /// Calls fail fast
    Open,
    /// Cooldown elapsed, the next call is a trial
    HalfOpen,
}

impl CircuitBreakerStatus {
    pub fn allows_calls(&self) -> bool {
        !matches!(self, CircuitBreakerStatus::Open)
    }

    pub fn description(&self) -> &'static str {
        match self {
            CircuitBreakerStatus::Closed => "Upstream healthy - calls allowed",
            CircuitBreakerStatus::Open => "Circuit OPEN - failing fast",
            CircuitBreakerStatus::HalfOpen => "Cooldown elapsed - trial call allowed",
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

/// Snapshot for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub status: CircuitBreakerStatus,
    pub consecutive_failures: u32,
    pub total_trips: u64,
    pub cooldown_remaining_secs: Option<u64>,
}

/// Consecutive-failure circuit breaker with cooldown
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    consecutive_failures: u32,
    /// Unix seconds when the breaker last opened
    opened_at: Option<u64>,
    /// Unix seconds when the pending half-open trial was admitted
    trial_started_at: Option<u64>,
    total_trips: u64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            opened_at: None,
            trial_started_at: None,
            total_trips: 0,
        }
    }

    /// Gate a call at `now` (unix seconds).
    ///
    /// In half-open state only the first caller is admitted; the outcome must
    /// be reported through `record_success` or `record_failure`.
    pub fn check(&mut self, now: u64) -> Result<(), CircuitBreakerError> {
        match self.cooldown_remaining(now) {
            None => Ok(()),
            Some(remaining) if remaining > 0 => Err(CircuitBreakerError::Open(remaining)),
            Some(_) => {
                let abandoned = self
                    .trial_started_at
                    .map(|started| now >= started + self.config.cooldown_secs)
                    .unwrap_or(true);
                if !abandoned {
                    return Err(CircuitBreakerError::TrialInFlight);
                }
                self.trial_started_at = Some(now);
                tracing::info!("Circuit breaker half-open, admitting trial call");
                Ok(())
            }
        }
    }

    pub fn record_success(&mut self) {
        if self.opened_at.is_some() {
            tracing::info!("Circuit breaker closed after successful trial call");
        }
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.trial_started_at = None;
    }

    pub fn record_failure(&mut self, now: u64) {
        self.consecutive_failures += 1;
        self.trial_started_at = None;

        // A failed trial call re-opens immediately
        let half_open = self.status(now) == CircuitBreakerStatus::HalfOpen;
        if half_open || self.consecutive_failures >= self.config.failure_threshold {
            if self.opened_at.is_none() || half_open {
                self.total_trips += 1;
                tracing::warn!(
                    consecutive_failures = self.consecutive_failures,
                    cooldown_secs = self.config.cooldown_secs,
                    "Circuit breaker OPEN"
                );
            }
            self.opened_at = Some(now);
        }
    }

    pub fn status(&self, now: u64) -> CircuitBreakerStatus {
        match self.cooldown_remaining(now) {
            None => CircuitBreakerStatus::Closed,
            Some(0) => CircuitBreakerStatus::HalfOpen,
            Some(_) => CircuitBreakerStatus::Open,
        }
    }

    pub fn state(&self, now: u64) -> CircuitBreakerState {
        CircuitBreakerState {
            status: self.status(now),
            consecutive_failures: self.consecutive_failures,
            total_trips: self.total_trips,
            cooldown_remaining_secs: self.cooldown_remaining(now),
        }
    }

    /// Seconds until a trial call is allowed, `None` when closed
    pub fn cooldown_remaining(&self, now: u64) -> Option<u64> {
        self.opened_at.map(|opened| {
            (opened + self.config.cooldown_secs).saturating_sub(now)
        })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_breaker() -> CircuitBreaker {
        CircuitBreaker::with_config(CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 60,
        })
    }

    #[test]
    fn test_new_breaker_is_closed() {
        let mut breaker = CircuitBreaker::new();
        assert!(breaker.check(1000).is_ok());
        assert_eq!(breaker.status(1000), CircuitBreakerStatus::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_opens_after_threshold() {
        let mut breaker = create_test_breaker();

        breaker.record_failure(1000);
        breaker.record_failure(1001);
        assert!(breaker.check(1001).is_ok());

        breaker.record_failure(1002);
        assert_eq!(breaker.status(1002), CircuitBreakerStatus::Open);
        assert_eq!(breaker.check(1010), Err(CircuitBreakerError::Open(52)));
    }

    #[test]
    fn test_success_resets_failures() {
        let mut breaker = create_test_breaker();

        breaker.record_failure(1000);
        breaker.record_failure(1001);
        breaker.record_success();
        breaker.record_failure(1002);

        assert_eq!(breaker.consecutive_failures(), 1);
        assert!(breaker.check(1002).is_ok());
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        assert!(breaker.check(1002 + 30).is_err());
        assert_eq!(breaker.status(1002 + 60), CircuitBreakerStatus::HalfOpen);
        assert!(breaker.check(1002 + 60).is_ok());
    }

    #[test]
    fn test_failed_trial_reopens() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        breaker.record_failure(1100);
        assert_eq!(breaker.status(1100), CircuitBreakerStatus::Open);
        assert_eq!(breaker.cooldown_remaining(1100), Some(60));
        assert_eq!(breaker.state(1100).total_trips, 2);
    }

    #[test]
    fn test_successful_trial_closes() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        breaker.record_success();
        assert_eq!(breaker.status(1070), CircuitBreakerStatus::Closed);
        assert!(breaker.cooldown_remaining(1070).is_none());
    }

    #[test]
    fn test_state_snapshot() {
        let mut breaker = create_test_breaker();
        breaker.record_failure(1000);

        let state = breaker.state(1001);
        assert_eq!(state.status, CircuitBreakerStatus::Closed);
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.total_trips, 0);
        assert!(state.cooldown_remaining_secs.is_none());
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        assert!(breaker.check(1062).is_ok());
        assert_eq!(breaker.check(1062), Err(CircuitBreakerError::TrialInFlight));
        assert_eq!(breaker.check(1063), Err(CircuitBreakerError::TrialInFlight));

        breaker.record_success();
        assert!(breaker.check(1064).is_ok());
        assert!(breaker.check(1064).is_ok());
    }

    #[test]
    fn test_failed_trial_blocks_until_next_cooldown() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        assert!(breaker.check(1062).is_ok());
        breaker.record_failure(1062);
        assert_eq!(breaker.check(1063), Err(CircuitBreakerError::Open(59)));

        // next cooldown admits a fresh trial
        assert!(breaker.check(1122).is_ok());
        assert_eq!(breaker.check(1122), Err(CircuitBreakerError::TrialInFlight));
    }

    #[test]
    fn test_abandoned_trial_is_replaced() {
        let mut breaker = create_test_breaker();
        for t in 0..3 {
            breaker.record_failure(1000 + t);
        }

        assert!(breaker.check(1062).is_ok());
        assert!(breaker.check(1100).is_err());
        // never settled within a full cooldown
        assert!(breaker.check(1122).is_ok());
    }

    #[test]
    fn test_status_description() {
        assert!(CircuitBreakerStatus::Closed.allows_calls());
        assert!(CircuitBreakerStatus::HalfOpen.allows_calls());
        assert!(!CircuitBreakerStatus::Open.allows_calls());
        assert!(CircuitBreakerStatus::Open.description().contains("OPEN"));
    }
}
