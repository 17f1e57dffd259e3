//! Batch partitioning and window scheduling.
//!
//! A batch is split into contiguous windows sized to the rate budget.
//! Windows run strictly in sequence with a pacing pause between them.
//! Within a window, reads fan out concurrently under the shared permit
//! while mutating requests run one at a time in queue order, so writes
//! against the same resource tree never race each other.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use paceline_core::config::EngineConfig;
use paceline_core::error::{EngineError, EngineResult};
use paceline_core::outcome::Outcome;
use paceline_core::request::{Request, RequestBatch};

use crate::executor::execute;
use crate::session::Session;

/// Split an ordered list into contiguous windows of at most `window_size`
/// elements, preserving relative order. The last window may be smaller.
pub fn partition<T>(items: Vec<T>, window_size: usize) -> Vec<Vec<T>> {
    let window_size = window_size.max(1);
    let mut windows: Vec<Vec<T>> = Vec::with_capacity(items.len().div_ceil(window_size));
    let mut current: Vec<T> = Vec::with_capacity(window_size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == window_size {
            windows.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        windows.push(current);
    }
    windows
}

/// The rate-limited batch request engine.
///
/// One [`run_batch`](BatchEngine::run_batch) call drives one batch: a fresh
/// [`Session`] is created for it, the batch is partitioned into windows
/// sized to the rate budget, and results come back in strict input order
/// regardless of completion order.
#[derive(Debug, Clone)]
pub struct BatchEngine {
    config: EngineConfig,
}

impl BatchEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a batch, returning one [`Outcome`] per request, in order.
    ///
    /// Individual failures never abort the batch; they surface as
    /// [`Outcome::Failed`] in their slot. Only caller-contract violations
    /// (an empty batch, a bad configuration) return `Err`, before any
    /// network activity.
    #[instrument(skip(self, batch), fields(batch_len = batch.len()))]
    pub async fn run_batch(&self, batch: RequestBatch) -> EngineResult<Vec<Outcome>> {
        validate_urls(&batch)?;

        let session = Arc::new(Session::connect(&self.config)?);

        let total = batch.len();
        let indexed: Vec<(usize, Request)> = batch.into_iter().enumerate().collect();
        let windows = partition(indexed, self.config.rate_limit.requests_per_second as usize);
        let window_count = windows.len();

        let mut results: Vec<Option<Outcome>> = Vec::with_capacity(total);
        results.resize_with(total, || None);

        for (window_index, window) in windows.into_iter().enumerate() {
            debug!(
                window = window_index + 1,
                windows = window_count,
                size = window.len(),
                "draining window"
            );

            let mut reads: Vec<(usize, tokio::task::JoinHandle<Outcome>)> =
                Vec::with_capacity(window.len());

            for (index, request) in window {
                if request.method().is_read() {
                    let session = Arc::clone(&session);
                    reads.push((
                        index,
                        tokio::spawn(async move { execute(&session, &request).await }),
                    ));
                } else {
                    // Mutations are awaited one at a time, in queue order.
                    results[index] = Some(execute(&session, &request).await);
                }
            }

            for (index, handle) in reads {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(error = %e, "read task aborted");
                        Outcome::Failed
                    }
                };
                results[index] = Some(outcome);
            }

            if window_index + 1 < window_count {
                tokio::time::sleep(self.config.rate_limit.pacing_delay()).await;
            }
        }

        Ok(results
            .into_iter()
            .map(|slot| slot.unwrap_or(Outcome::Failed))
            .collect())
    }
}

/// Reject malformed request URLs before any network activity.
fn validate_urls(batch: &RequestBatch) -> EngineResult<()> {
    for request in batch.iter() {
        let parsed = url::Url::parse(request.url())
            .map_err(|e| EngineError::invalid_url(request.url(), e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(EngineError::invalid_url(
                    request.url(),
                    format!("unsupported scheme '{scheme}'"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_exact_windows() {
        let windows = partition(vec![1, 2, 3, 4], 2);
        assert_eq!(windows, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_partition_short_last_window() {
        let windows = partition(vec![1, 2, 3, 4, 5], 2);
        assert_eq!(windows, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_partition_single_window_for_small_batches() {
        let windows = partition(vec![1, 2, 3], 30);
        assert_eq!(windows, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_partition_preserves_order() {
        let windows = partition((0..7).collect::<Vec<_>>(), 3);
        let flattened: Vec<i32> = windows.into_iter().flatten().collect();
        assert_eq!(flattened, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_empty_input() {
        let windows: Vec<Vec<i32>> = partition(vec![], 5);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        use paceline_core::config::RateLimitConfig;

        let config = EngineConfig::new().with_rate_limit(RateLimitConfig::new(0));
        assert!(BatchEngine::new(config).is_err());
    }

    #[tokio::test]
    async fn test_run_batch_rejects_empty_batch_before_any_network() {
        // RequestBatch can't even be constructed empty; the invariant is
        // enforced at the boundary.
        let err = RequestBatch::new(vec![]).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_BATCH");
    }

    #[tokio::test]
    async fn test_run_batch_rejects_malformed_urls_before_any_network() {
        let engine = BatchEngine::new(EngineConfig::new()).unwrap();
        let batch = RequestBatch::new(vec![Request::get("not a url")]).unwrap();

        let err = engine.run_batch(batch).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_URL");
    }

    #[tokio::test]
    async fn test_run_batch_rejects_non_http_schemes() {
        let engine = BatchEngine::new(EngineConfig::new()).unwrap();
        let batch =
            RequestBatch::new(vec![Request::get("ftp://host/resource")]).unwrap();

        let err = engine.run_batch(batch).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_URL");
    }
}
