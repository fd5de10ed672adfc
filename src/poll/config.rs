//! Poll pass configuration.

use crate::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DEVICE_TIMEOUT, DEFAULT_HOST};
use crate::mercury::exchange::ExchangeConfig;
use std::time::Duration;

/// Settings for one poll pass. Built once and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Gateway host; every plan port is a TCP port on it
    pub host: String,
    pub connect_timeout: Duration,
    /// Hard cap on polling a single meter (both exchanges, all attempts)
    pub device_timeout: Duration,
    pub exchange: ExchangeConfig,
    /// One worker per port instead of one port after another
    pub concurrent_ports: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            host: DEFAULT_HOST.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            device_timeout: DEFAULT_DEVICE_TIMEOUT,
            exchange: ExchangeConfig::default(),
            concurrent_ports: false,
        }
    }
}

impl PollConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.exchange.response_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.exchange.read_timeout = timeout;
        self
    }

    /// Attempts per exchange; 0 is treated as 1.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.exchange.attempts = attempts.max(1);
        self
    }

    pub fn with_concurrent_ports(mut self, concurrent: bool) -> Self {
        self.concurrent_ports = concurrent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.exchange.response_timeout, Duration::from_millis(800));
        assert_eq!(config.exchange.read_timeout, Duration::from_millis(200));
        assert_eq!(config.exchange.attempts, 1);
        assert!(!config.concurrent_ports);
    }

    #[test]
    fn test_builders() {
        let config = PollConfig::default()
            .with_host("10.0.0.5")
            .with_attempts(0)
            .with_response_timeout(Duration::from_millis(1500))
            .with_concurrent_ports(true);
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.exchange.attempts, 1);
        assert_eq!(config.exchange.response_timeout, Duration::from_millis(1500));
        assert!(config.concurrent_ports);
    }
}
