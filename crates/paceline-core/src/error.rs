//! Engine error types.
//!
//! Only caller-contract violations and configuration problems surface as
//! errors: they abort before any network activity. Transport failures and
//! remote error statuses are absorbed by the executor and reported through
//! [`Outcome::Failed`](crate::outcome::Outcome::Failed) instead.

use thiserror::Error;

/// Error raised before a batch reaches the network.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A batch must contain at least one request.
    #[error("request batch is empty")]
    EmptyBatch,

    /// The method string did not name a supported HTTP method.
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    /// A request or pagination URL could not be parsed.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Engine configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The HTTP client could not be constructed from the configuration.
    #[error("failed to build HTTP client: {message}")]
    ClientBuild {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl EngineError {
    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::EmptyBatch => "EMPTY_BATCH",
            EngineError::UnsupportedMethod { .. } => "UNSUPPORTED_METHOD",
            EngineError::InvalidUrl { .. } => "INVALID_URL",
            EngineError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            EngineError::ClientBuild { .. } => "CLIENT_BUILD",
        }
    }

    // Convenience constructors

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a client build error with source.
    pub fn client_build_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::ClientBuild {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
