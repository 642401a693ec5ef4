//! Reconnection policy and client configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Bridge endpoint used when nothing else is configured.
pub const DEFAULT_BRIDGE_URL: &str = "ws://localhost:8080";

/// Options for automatic reconnection.
///
/// Delays grow linearly with the attempt number and are capped at
/// `max_delay`: attempt `n` waits `min(base_delay * n, max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectOptions {
    /// Consecutive failures after which the client gives up.
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// How long a socket may stay in `Connecting` before it is abandoned.
    pub connect_timeout: Duration,
}

impl Default for ReconnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl ReconnectOptions {
    /// Create new reconnect options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options that always wait the same `delay`.
    pub fn fixed_delay(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            max_delay: delay,
            ..Default::default()
        }
    }

    /// Set the number of consecutive failures tolerated.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first attempt.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay between attempts.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(self.max_delay)
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `max_attempts` is > 0
    /// - `base_delay` is > 0
    /// - `max_delay` >= `base_delay`
    /// - `connect_timeout` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_config("max_attempts must be > 0"));
        }
        if self.base_delay.is_zero() {
            return Err(Error::invalid_config("base_delay must be > 0"));
        }
        if self.max_delay < self.base_delay {
            return Err(Error::invalid_config("max_delay must be >= base_delay"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::invalid_config("connect_timeout must be > 0"));
        }
        Ok(())
    }
}

/// Everything a transport client needs before it can connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bridge endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Backoff and timeout policy.
    pub reconnect: ReconnectOptions,
    /// Whether unexpected closures are retried at all.
    pub auto_reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BRIDGE_URL.to_string(),
            reconnect: ReconnectOptions::default(),
            auto_reconnect: true,
        }
    }
}

impl ClientConfig {
    /// Configuration for the given endpoint with default policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Replace the reconnect policy.
    pub fn reconnect(mut self, options: ReconnectOptions) -> Self {
        self.reconnect = options;
        self
    }

    /// Enable or disable automatic reconnection.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Validate the endpoint and the reconnect policy.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::invalid_config(format!(
                "bridge url must start with ws:// or wss://, got '{}'",
                self.url
            )));
        }
        self.reconnect.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ReconnectOptions::default();
        assert_eq!(options.max_attempts, 5);
        assert_eq!(options.base_delay, Duration::from_secs(2));
        assert_eq!(options.max_delay, Duration::from_secs(10));
        assert_eq!(options.connect_timeout, Duration::from_secs(3));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_delay_is_linear_and_capped() {
        let options = ReconnectOptions::default();
        let delays: Vec<u64> = (1..=7)
            .map(|attempt| options.delay_for_attempt(attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![2, 4, 6, 8, 10, 10, 10]);
    }

    #[test]
    fn test_fixed_delay() {
        let options = ReconnectOptions::fixed_delay(Duration::from_millis(250));
        assert_eq!(options.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(options.delay_for_attempt(9), Duration::from_millis(250));
    }

    #[test]
    fn test_delay_saturates() {
        let options = ReconnectOptions::new()
            .base_delay(Duration::MAX / 2)
            .max_delay(Duration::MAX);
        assert_eq!(options.delay_for_attempt(3), Duration::MAX);
        assert_eq!(
            ReconnectOptions::new().delay_for_attempt(u32::MAX),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        assert!(ReconnectOptions::new().max_attempts(0).validate().is_err());
        assert!(ReconnectOptions::new().base_delay(Duration::ZERO).validate().is_err());
        assert!(
            ReconnectOptions::new()
                .base_delay(Duration::from_secs(5))
                .max_delay(Duration::from_secs(1))
                .validate()
                .is_err()
        );
        assert!(
            ReconnectOptions::new()
                .connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_client_config_url() {
        assert_eq!(ClientConfig::default().url, "ws://localhost:8080");
        assert!(ClientConfig::new("wss://bridge.local:9000").validate().is_ok());

        let err = ClientConfig::new("http://localhost:8080").validate().unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }
}
