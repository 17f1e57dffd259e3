//! # Paceline Core
//!
//! Data model and configuration for the paceline batch request engine.
//!
//! This crate defines what flows through the engine without touching the
//! network: requests and batches, normalized outcomes, the error taxonomy
//! for caller-contract violations, and the configuration surface.
//!
//! ## Crate Organization
//!
//! - [`request`] - `HttpMethod`, `Payload` (with wire-format sniffing),
//!   `Request`, `RequestBatch`
//! - [`outcome`] - `Outcome` tagged results and the HTTP status table
//! - [`error`] - `EngineError` / `EngineResult`
//! - [`config`] - `EngineConfig`, `RateLimitConfig`, credentials, TLS,
//!   log verbosity

pub mod config;
pub mod error;
pub mod outcome;
pub mod request;

/// Prelude module for convenient imports.
///
/// ```
/// use paceline_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        BasicCredentials, EngineConfig, LogVerbosity, RateLimitConfig, TlsOptions,
    };
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::outcome::{describe_status, Ack, Outcome};
    pub use crate::request::{HttpMethod, Payload, Request, RequestBatch, WireFormat};
}
