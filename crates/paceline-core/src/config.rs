//! Engine configuration.
//!
//! All knobs the batch engine recognizes: default headers, basic-auth
//! credentials, TLS verification, the rate/concurrency budget, and logging
//! verbosity. Configs are serde round-trippable and carry builder methods
//! for programmatic construction.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Basic-auth credentials.
///
/// The string form is `username:password`, split once on the first `:` so
/// passwords may themselves contain colons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse the `username:password` convention.
    pub fn parse(credentials: &str) -> EngineResult<Self> {
        let (username, password) = credentials.split_once(':').ok_or_else(|| {
            EngineError::invalid_configuration(
                "credentials must use the 'username:password' form",
            )
        })?;
        if username.is_empty() {
            return Err(EngineError::invalid_configuration(
                "credentials username is empty",
            ));
        }
        Ok(Self::new(username, password))
    }

    /// Create a redacted version for logging/display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: "***REDACTED***".to_string(),
        }
    }
}

/// TLS options for the per-batch session.
///
/// Certificate management policy is out of scope; the only knob is whether
/// the server certificate is verified at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_certificate: true,
        }
    }
}

impl TlsOptions {
    /// Log a security warning when verification is disabled.
    ///
    /// Called when a session is built from external configuration.
    pub fn validate_security(&self) {
        if !self.verify_certificate {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is DISABLED; connections are \
                 vulnerable to man-in-the-middle attacks"
            );
        }
    }
}

/// The rate and concurrency budget for one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests-per-second ceiling; also the partition window size
    /// (default: 30).
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum simultaneously in-flight calls, independent of the window
    /// size (default: 10).
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: u32,

    /// Per-call timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between partition windows in milliseconds (default: 1100).
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Backoff before the single retry of a server error, in milliseconds
    /// (default: 10000).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_requests_per_second() -> u32 {
    30
}

fn default_max_in_flight() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_pacing_delay_ms() -> u64 {
    1100
}

fn default_retry_backoff_ms() -> u64 {
    10_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            max_in_flight: default_max_in_flight(),
            timeout_secs: default_timeout_secs(),
            pacing_delay_ms: default_pacing_delay_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Create a rate limit config with a custom requests-per-second ceiling.
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            ..Default::default()
        }
    }

    /// Set the in-flight ceiling.
    #[must_use]
    pub fn with_max_in_flight(mut self, max: u32) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the inter-window pacing delay.
    #[must_use]
    pub fn with_pacing_delay_ms(mut self, ms: u64) -> Self {
        self.pacing_delay_ms = ms;
        self
    }

    /// Set the retry backoff.
    #[must_use]
    pub fn with_retry_backoff_ms(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }

    /// Per-call timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Inter-window pacing delay as a Duration.
    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Retry backoff as a Duration.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Logging verbosity for request/response logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    /// No request/response logging.
    Quiet,
    /// Log request URL and status code only (default).
    #[default]
    Normal,
    /// Log request/response headers and bodies.
    Debug,
}

impl LogVerbosity {
    /// Check if any logging should occur.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LogVerbosity::Quiet)
    }

    /// Check if bodies should be logged.
    #[must_use]
    pub fn log_bodies(&self) -> bool {
        matches!(self, LogVerbosity::Debug)
    }
}

/// Full configuration for a batch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Headers sent with every request.
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,

    /// Basic-auth credentials, if the target requires them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BasicCredentials>,

    /// TLS options.
    #[serde(default)]
    pub tls: TlsOptions,

    /// Rate and concurrency budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Request/response logging verbosity.
    #[serde(default)]
    pub log_verbosity: LogVerbosity,
}

fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("cache-control".to_string(), "no-cache".to_string()),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            headers: default_headers(),
            credentials: None,
            tls: TlsOptions::default(),
            rate_limit: RateLimitConfig::default(),
            log_verbosity: LogVerbosity::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default headers and budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set basic-auth credentials from username and password.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(BasicCredentials::new(username, password));
        self
    }

    /// Set basic-auth credentials from a `username:password` string.
    pub fn with_credentials(mut self, credentials: &str) -> EngineResult<Self> {
        self.credentials = Some(BasicCredentials::parse(credentials)?);
        Ok(self)
    }

    /// Add or replace a default header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the rate/concurrency budget.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Disable TLS certificate verification.
    ///
    /// Only appropriate for lab appliances with self-signed certificates.
    #[must_use]
    pub fn without_tls_verification(mut self) -> Self {
        self.tls.verify_certificate = false;
        self
    }

    /// Set logging verbosity.
    #[must_use]
    pub fn with_log_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.log_verbosity = verbosity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.rate_limit.requests_per_second == 0 {
            return Err(EngineError::invalid_configuration(
                "requests_per_second must be at least 1",
            ));
        }
        if self.rate_limit.max_in_flight == 0 {
            return Err(EngineError::invalid_configuration(
                "max_in_flight must be at least 1",
            ));
        }
        if self.rate_limit.timeout_secs == 0 {
            return Err(EngineError::invalid_configuration(
                "timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }

    /// Create a redacted version of this config (for logging/display).
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.credentials = config.credentials.map(|c| c.redacted());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let config = EngineConfig::default();
        assert_eq!(
            config.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            config.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            config.headers.get("cache-control").map(String::as_str),
            Some("no-cache")
        );
    }

    #[test]
    fn test_rate_limit_defaults() {
        let rate_limit = RateLimitConfig::default();
        assert_eq!(rate_limit.requests_per_second, 30);
        assert_eq!(rate_limit.max_in_flight, 10);
        assert_eq!(rate_limit.timeout_secs, 60);
        assert_eq!(rate_limit.pacing_delay_ms, 1100);
        assert_eq!(rate_limit.retry_backoff_ms, 10_000);
    }

    #[test]
    fn test_rate_limit_builder() {
        let rate_limit = RateLimitConfig::new(2)
            .with_max_in_flight(4)
            .with_timeout_secs(5)
            .with_pacing_delay_ms(100)
            .with_retry_backoff_ms(50);

        assert_eq!(rate_limit.requests_per_second, 2);
        assert_eq!(rate_limit.max_in_flight, 4);
        assert_eq!(rate_limit.timeout(), Duration::from_secs(5));
        assert_eq!(rate_limit.pacing_delay(), Duration::from_millis(100));
        assert_eq!(rate_limit.retry_backoff(), Duration::from_millis(50));
    }

    #[test]
    fn test_credentials_parse() {
        let creds = BasicCredentials::parse("admin:s3cret").unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_credentials_parse_keeps_colons_in_password() {
        let creds = BasicCredentials::parse("admin:pa:ss:wd").unwrap();
        assert_eq!(creds.password, "pa:ss:wd");
    }

    #[test]
    fn test_credentials_parse_rejects_bad_forms() {
        assert!(BasicCredentials::parse("no-separator").is_err());
        assert!(BasicCredentials::parse(":password-only").is_err());
    }

    #[test]
    fn test_credentials_redacted() {
        let creds = BasicCredentials::new("admin", "s3cret").redacted();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "***REDACTED***");
    }

    #[test]
    fn test_config_validate() {
        assert!(EngineConfig::default().validate().is_ok());

        let zero_window =
            EngineConfig::default().with_rate_limit(RateLimitConfig::new(0));
        assert!(zero_window.validate().is_err());

        let zero_permits = EngineConfig::default()
            .with_rate_limit(RateLimitConfig::new(30).with_max_in_flight(0));
        assert!(zero_permits.validate().is_err());
    }

    #[test]
    fn test_config_redacted() {
        let config = EngineConfig::new().with_basic_auth("admin", "s3cret");
        let redacted = config.redacted();
        assert_eq!(
            redacted.credentials.unwrap().password,
            "***REDACTED***"
        );
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = EngineConfig::new()
            .with_basic_auth("admin", "s3cret")
            .with_header("X-Request-Source", "batch")
            .with_rate_limit(RateLimitConfig::new(5).with_max_in_flight(3));

        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.rate_limit.requests_per_second, 5);
        assert_eq!(parsed.rate_limit.max_in_flight, 3);
        assert_eq!(
            parsed.headers.get("X-Request-Source").map(String::as_str),
            Some("batch")
        );
        assert_eq!(parsed.credentials.unwrap().username, "admin");
    }

    #[test]
    fn test_log_verbosity() {
        assert_eq!(LogVerbosity::default(), LogVerbosity::Normal);
        assert!(!LogVerbosity::Quiet.is_enabled());
        assert!(LogVerbosity::Normal.is_enabled());
        assert!(!LogVerbosity::Normal.log_bodies());
        assert!(LogVerbosity::Debug.log_bodies());
    }
}
