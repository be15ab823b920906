//! Reconnect policy with exponential back-off and server hints.

use std::time::Duration;

use ra_domain::config::RetryConfig;

/// Controls how a streaming call reconnects after a transport failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Reconnects allowed after the first attempt fails.
    pub max_retries: u32,
    /// Delay before the first reconnect when the peer gave no hint.
    pub base_delay: Duration,
    /// Multiplier applied to the previous delay.
    pub multiplier: f64,
    /// Maximum delay between attempts (cap).
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            multiplier: cfg.multiplier,
            cap: Duration::from_millis(cfg.cap_ms),
        }
    }
}

/// What the caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for this long, then reconnect.
    Retry(Duration),
    /// Budget exhausted; fail the call.
    Terminal,
}

/// Backoff state for one logical call.  Never shared between calls.
#[derive(Debug, Clone)]
pub struct RetrySession {
    policy: RetryPolicy,
    attempt: u32,
    last_delay: Option<Duration>,
}

impl RetrySession {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            last_delay: None,
        }
    }

    /// Reconnect attempts handed out (or refused) so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Compute the delay before the next reconnect.
    ///
    /// A server hint (milliseconds, from `retry:`) takes priority over the
    /// local schedule; otherwise the previous delay is multiplied, starting
    /// from the base delay.  Every result is clamped to the cap.
    pub fn next_delay(&mut self, server_hint_ms: Option<u64>) -> RetryDecision {
        self.attempt += 1;
        if self.attempt > self.policy.max_retries {
            return RetryDecision::Terminal;
        }

        let delay = match (server_hint_ms, self.last_delay) {
            (Some(hint), _) => Duration::from_millis(hint),
            (None, Some(last)) => self.scale(last),
            (None, None) => self.policy.base_delay,
        }
        .min(self.policy.cap);

        self.last_delay = Some(delay);
        RetryDecision::Retry(delay)
    }

    fn scale(&self, last: Duration) -> Duration {
        Duration::try_from_secs_f64(last.as_secs_f64() * self.policy.multiplier)
            .unwrap_or(self.policy.cap)
    }
}
