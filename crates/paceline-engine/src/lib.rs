//! # Paceline Engine
//!
//! Rate-limited batch execution over HTTP: ordered heterogeneous batches
//! in, ordered normalized outcomes out.
//!
//! The engine partitions a batch into windows sized to the rate budget,
//! fans reads out under a bounded concurrency permit while serializing
//! writes, retries transient server errors exactly once, and absorbs every
//! failure into its slot of the result list. The [`Paginator`] layers on
//! top to discover and merge paged collections.
//!
//! ## Example
//!
//! ```ignore
//! use paceline_core::prelude::*;
//! use paceline_engine::{BatchEngine, PageConfig, Paginator};
//!
//! let config = EngineConfig::new()
//!     .with_basic_auth("admin", "secret")
//!     .with_rate_limit(RateLimitConfig::new(30));
//! let engine = BatchEngine::new(config)?;
//!
//! let batch = RequestBatch::new(vec![
//!     Request::get("https://host:9060/api/config/networkdevice/1"),
//!     Request::put("https://host:9060/api/config/networkdevice/2")
//!         .with_payload(serde_json::json!({"name": "sw02"})),
//! ])?;
//!
//! let outcomes = engine.run_batch(batch).await?;
//! assert_eq!(outcomes.len(), 2);
//! ```

mod executor;
pub mod paginate;
pub mod scheduler;
pub mod session;

// Re-exports
pub use paginate::{PageConfig, PageShape, Paginator};
pub use scheduler::{partition, BatchEngine};
pub use session::Session;
