//! Pagination aggregation.
//!
//! List-returning endpoints report their extent in one of three ways: a
//! total count alongside a page of resources, an explicit next-page link,
//! or nothing at all. The response shape is classified once, from the first
//! probing response, and the matching strategy assembles the complete
//! collection in page order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use paceline_core::error::{EngineError, EngineResult};
use paceline_core::outcome::Outcome;
use paceline_core::request::{Request, RequestBatch};

use crate::scheduler::BatchEngine;

/// How paged collections are addressed and where their fields live in the
/// response body.
///
/// Paths are dot-separated (`SearchResult.total`). Leaving a path unset
/// means the response does not carry that field: with no `total_path` the
/// count-based strategy never triggers, with no `next_link_path` the
/// link-based strategy never triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Query parameter carrying the page number.
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Page size the target API serves for counted collections.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Path to the array of resources; unset means the body itself is the
    /// array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_path: Option<String>,

    /// Path to the total item count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_path: Option<String>,

    /// Path to the next-page link (a string or an object with an `href`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_link_path: Option<String>,

    /// Platform page cap for the heuristic fallback (default: 20).
    ///
    /// Bare-list endpoints that neither count nor link their pages stop
    /// paging when a response is shorter than both the inferred size and
    /// this cap.
    #[serde(default = "default_heuristic_page_cap")]
    pub heuristic_page_cap: u32,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_heuristic_page_cap() -> u32 {
    20
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_param: default_page_param(),
            page_size: default_page_size(),
            results_path: None,
            total_path: None,
            next_link_path: None,
            heuristic_page_cap: default_heuristic_page_cap(),
        }
    }
}

impl PageConfig {
    /// Create a page config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the results array path.
    #[must_use]
    pub fn with_results_path(mut self, path: impl Into<String>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    /// Set the total count path.
    #[must_use]
    pub fn with_total_path(mut self, path: impl Into<String>) -> Self {
        self.total_path = Some(path.into());
        self
    }

    /// Set the next-page link path.
    #[must_use]
    pub fn with_next_link_path(mut self, path: impl Into<String>) -> Self {
        self.next_link_path = Some(path.into());
        self
    }

    /// Set the page-number query parameter.
    #[must_use]
    pub fn with_page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = param.into();
        self
    }

    /// Set the counted-collection page size.
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the heuristic page cap.
    #[must_use]
    pub fn with_heuristic_page_cap(mut self, cap: u32) -> Self {
        self.heuristic_page_cap = cap;
        self
    }
}

/// The shape of a collection response, classified once at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum PageShape {
    /// Reports a total item count and a page of resources.
    Counted { total: u64, items: Vec<Value> },

    /// Carries an explicit next-page link.
    Linked { next: String, items: Vec<Value> },

    /// A bare list with neither count nor link.
    BareList { items: Vec<Value> },

    /// Not a collection at all; a single object.
    Single(Value),
}

impl PageShape {
    /// Classify a decoded response body.
    ///
    /// Priority: a readable total count wins, then a next-page link, then a
    /// bare array; anything else is a single object.
    #[must_use]
    pub fn classify(body: &Value, config: &PageConfig) -> PageShape {
        let items = extract_items(body, config);

        if let Some(total) = lookup(body, config.total_path.as_deref()).and_then(Value::as_u64) {
            return PageShape::Counted {
                total,
                items: items.unwrap_or_default(),
            };
        }

        if let Some(next) = next_link(body, config) {
            return PageShape::Linked {
                next,
                items: items.unwrap_or_default(),
            };
        }

        match items {
            Some(items) => PageShape::BareList { items },
            None => PageShape::Single(body.clone()),
        }
    }
}

/// Assembles complete collections from paged endpoints, on top of the
/// batch engine.
#[derive(Debug)]
pub struct Paginator<'a> {
    engine: &'a BatchEngine,
    config: PageConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(engine: &'a BatchEngine, config: PageConfig) -> Self {
        Self { engine, config }
    }

    /// Fetch every page of a collection, preserving page order.
    ///
    /// The request is issued once as a probe; the response shape picks the
    /// strategy. A failed probe yields an empty collection (the failure is
    /// in the diagnostic log). The heuristic fallback can over-fetch one
    /// empty page, and under-fetches if a page length coincidentally equals
    /// the configured cap on the last page.
    #[instrument(skip(self, request), fields(url = %request.url()))]
    pub async fn fetch_all(&self, request: Request) -> EngineResult<Vec<Value>> {
        let probe = self.execute_one(request.clone()).await?;
        let Some(body) = probe.into_body() else {
            warn!(url = %request.url(), "first page did not yield a decodable body");
            return Ok(Vec::new());
        };

        match PageShape::classify(&body, &self.config) {
            PageShape::Single(value) => Ok(vec![value]),
            PageShape::Counted { total, items } => {
                self.fetch_counted(request, total, items).await
            }
            PageShape::Linked { next, items } => self.fetch_linked(request, next, items).await,
            PageShape::BareList { items } => self.fetch_heuristic(request, items).await,
        }
    }

    async fn execute_one(&self, request: Request) -> EngineResult<Outcome> {
        let mut outcomes = self.engine.run_batch(RequestBatch::new(vec![request])?).await?;
        Ok(outcomes.pop().unwrap_or(Outcome::Failed))
    }

    /// Count-based strategy: one follow-up batch covering all remaining
    /// pages, fanned out as ordinary concurrent reads.
    async fn fetch_counted(
        &self,
        request: Request,
        total: u64,
        mut items: Vec<Value>,
    ) -> EngineResult<Vec<Value>> {
        let page_size = u64::from(self.config.page_size.max(1));
        if total <= page_size {
            return Ok(items);
        }

        let pages = page_count(total, page_size);
        debug!(total, pages, "fetching remaining pages");

        let mut follow_up = Vec::with_capacity(pages as usize - 1);
        for page in 2..=pages {
            let url = set_page_param(request.url(), &self.config.page_param, page)?;
            follow_up.push(request.clone().with_url(url));
        }

        // Order preservation in the batch layer keeps pages in page-number
        // order even though they complete out of arrival order.
        let outcomes = self.engine.run_batch(RequestBatch::new(follow_up)?).await?;
        for (offset, outcome) in outcomes.into_iter().enumerate() {
            match outcome.into_body() {
                Some(body) => items.extend(self.items_of(&body)),
                None => warn!(
                    page = offset as u64 + 2,
                    "page fetch failed; collection is incomplete"
                ),
            }
        }
        Ok(items)
    }

    /// Link-based strategy: a lazy, forward-only walk, one request at a
    /// time, reusing the probe's method and payload for every hop.
    async fn fetch_linked(
        &self,
        request: Request,
        first_next: String,
        mut items: Vec<Value>,
    ) -> EngineResult<Vec<Value>> {
        let mut next = Some(first_next);
        while let Some(link) = next {
            let outcome = self.execute_one(request.clone().with_url(link)).await?;
            let Some(body) = outcome.into_body() else {
                warn!("next-page fetch failed; stopping the walk");
                break;
            };
            items.extend(self.items_of(&body));
            next = next_link(&body, &self.config);
        }
        Ok(items)
    }

    /// Heuristic size-based fallback: infer the page size from the first
    /// page and keep requesting the next page while full pages come back.
    async fn fetch_heuristic(
        &self,
        request: Request,
        first_items: Vec<Value>,
    ) -> EngineResult<Vec<Value>> {
        let inferred = first_items.len();
        let mut items = first_items;
        if inferred == 0 {
            return Ok(items);
        }

        let cap = self.config.heuristic_page_cap as usize;
        let mut page: u64 = 1;
        let mut last_len = inferred;

        while last_len == inferred || last_len == cap {
            page += 1;
            let url = set_page_param(request.url(), &self.config.page_param, page)?;
            let outcome = self.execute_one(request.clone().with_url(url)).await?;
            let Some(body) = outcome.into_body() else {
                break;
            };
            let page_items = self.items_of(&body);
            last_len = page_items.len();
            items.extend(page_items);
        }
        Ok(items)
    }

    fn items_of(&self, body: &Value) -> Vec<Value> {
        extract_items(body, &self.config).unwrap_or_default()
    }
}

/// Number of pages needed for `total` items (99 -> 1, 101 -> 2 at size 100).
fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size)
}

/// Rewrite the page-number query parameter, leaving the rest of the URL
/// untouched.
fn set_page_param(url: &str, param: &str, page: u64) -> EngineResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| EngineError::invalid_url(url, e.to_string()))?;

    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| name != param)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (name, value) in &retained {
            pairs.append_pair(name, value);
        }
        pairs.append_pair(param, &page.to_string());
    }

    Ok(parsed.into())
}

/// Resolve a dot-separated path inside a response body.
fn lookup<'v>(body: &'v Value, path: Option<&str>) -> Option<&'v Value> {
    let path = path?;
    body.pointer(&format!("/{}", path.replace('.', "/")))
}

fn extract_items(body: &Value, config: &PageConfig) -> Option<Vec<Value>> {
    match &config.results_path {
        Some(path) => lookup(body, Some(path)).and_then(Value::as_array).cloned(),
        None => body.as_array().cloned(),
    }
}

fn next_link(body: &Value, config: &PageConfig) -> Option<String> {
    match lookup(body, config.next_link_path.as_deref())? {
        Value::String(link) => Some(link.clone()),
        Value::Object(link) => link.get("href").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
