//! Per-batch session state.
//!
//! A [`Session`] is created for each `run_batch` invocation and shared
//! read-only by every request in that batch. It owns the configured HTTP
//! client and the counting permit that bounds in-flight calls; nothing in
//! it is mutated after construction.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use tokio::sync::Semaphore;

use paceline_core::config::{EngineConfig, LogVerbosity};
use paceline_core::error::{EngineError, EngineResult};

/// One authenticated, TLS-configured connection context, scoped to the
/// lifetime of a single batch invocation.
pub struct Session {
    client: Client,
    permits: Arc<Semaphore>,
    retry_backoff: Duration,
    verbosity: LogVerbosity,
}

impl Session {
    /// Build a session from the engine configuration.
    pub fn connect(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        config.tls.validate_security();

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                EngineError::invalid_configuration(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                EngineError::invalid_configuration(format!("invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        if let Some(credentials) = &config.credentials {
            let encoded =
                STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
            let mut value =
                HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| {
                    EngineError::invalid_configuration(format!("invalid credentials: {e}"))
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .timeout(config.rate_limit.timeout())
            .default_headers(headers);

        if !config.tls.verify_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| EngineError::client_build_with_source("client construction failed", e))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.rate_limit.max_in_flight as usize)),
            retry_backoff: config.rate_limit.retry_backoff(),
            verbosity: config.log_verbosity,
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// The counting permit bounding simultaneously in-flight calls.
    pub(crate) fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    pub(crate) fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub(crate) fn verbosity(&self) -> LogVerbosity {
        self.verbosity
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("available_permits", &self.permits.available_permits())
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}
