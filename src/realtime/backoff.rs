use std::time::Duration;

use crate::config::ReconnectConfig;

/// Consecutive failure counter driving the reconnect delay.
///
/// Outlives every single connection, only a successful open resets it.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    config: ReconnectConfig,
}

impl Backoff {
    /// Create a counter at zero
    pub fn new(config: ReconnectConfig) -> Self {
        Self { attempt: 0, config }
    }

    /// current attempt counter
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// connection opened, start over
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Count one more failure and return how long to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self
            .attempt
            .saturating_add(1)
            .clamp(1, self.config.max_attempt.max(1));
        Self::delay_for(&self.config, self.attempt)
    }

    /// `2^attempt * base_delay`
    pub fn delay_for(config: &ReconnectConfig, attempt: u32) -> Duration {
        config
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}
