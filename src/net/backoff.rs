//! Exponential reconnect backoff with jitter.

use std::time::Duration;

use crate::config::ReconnectConfig;

const MULTIPLIER: u32 = 2;
/// Up to this fraction of the delay is added at random.
const JITTER: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    jitter: f64,
}

impl Backoff {
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self::with_jitter(config, JITTER)
    }

    #[must_use]
    pub fn with_jitter(config: ReconnectConfig, jitter: f64) -> Self {
        let initial = Duration::from_millis(config.initial_ms);
        Self { initial, current: initial, max: Duration::from_millis(config.max_ms).max(initial), jitter }
    }

    /// Delay before the next attempt; doubles up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(MULTIPLIER).min(self.max);
        let jitter = delay.as_secs_f64() * self.jitter * rand::random::<f64>();
        delay + Duration::from_secs_f64(jitter)
    }

    /// Back to the initial delay after a healthy connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
