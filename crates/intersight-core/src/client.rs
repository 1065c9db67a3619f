//! HTTP client configuration and the connector retry policy.
//!
//! The device connector protocol uses a fixed-interval retry policy with a
//! hard attempt cap; the attempt counts and sleep interval are behavioral
//! contracts of the claim flow and are covered by tests.

use std::time::Duration;

// Timeout configurations (in seconds)

/// Default timeout for device connector requests
pub const CONNECTOR_DEFAULT_TIMEOUT: u64 = 30;

/// Fixed timeout for the device XML API login exchange (never retried)
pub const LOGIN_TIMEOUT: u64 = 5;

/// Default timeout for management-service requests
pub const CLOUD_DEFAULT_TIMEOUT: u64 = 30;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

// Retry and polling contracts of the connector protocol

/// Total attempts (including the first) per connector call on 5xx failures
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Fixed wait between retried connector calls, in seconds
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 1;

/// Attempts to drive the connector's administrative state to enabled
pub const ENABLE_ATTEMPTS: u32 = 4;

/// Attempts to apply and confirm the access mode setting
pub const ACCESS_MODE_ATTEMPTS: u32 = 4;

/// Polls while waiting for the connector to reach the Connected state
pub const CONNECT_POLL_ATTEMPTS: u32 = 10;

/// Fixed-interval retry policy for device connector calls.
///
/// Unlike exponential backoff, the connector protocol waits the same
/// interval between attempts and bounds the total by an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Fixed wait between attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create the default connector retry policy (10 attempts, 1s apart).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }

    /// Create a policy that performs a single attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            interval: Duration::from_millis(0),
        }
    }

    /// Set the total attempt cap.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the fixed wait between attempts.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check if more than one attempt is allowed.
    #[must_use]
    pub const fn has_retries(&self) -> bool {
        self.max_attempts > 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client configuration shared by the connector and cloud clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Whether to verify TLS certificates (device connectors typically
    /// present self-signed certificates)
    pub tls_verify: bool,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(CONNECTOR_DEFAULT_TIMEOUT),
            tls_verify: true,
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
