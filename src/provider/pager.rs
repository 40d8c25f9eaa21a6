//! Cursor-based pagination.
//!
//! Every paginated provider resource returns the same envelope:
//!
//! ```json
//! { "count": 1234, "next": "https://…&page=2", "previous": null, "results": [ … ] }
//! ```
//!
//! `next` is absent or null on the last page. Pages are fetched strictly in
//! sequence since each URL comes from the previous response.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::JsonSource;
use crate::types::PollerError;

/// One decoded page: its raw results and the cursor to the next page.
#[derive(Debug)]
struct Page {
    results: Vec<Value>,
    next: Option<String>,
}

impl Page {
    /// Split an envelope into results and cursor. Fails when `results` is
    /// missing or not an array. An empty `next` counts as no cursor.
    fn from_envelope(url: &str, mut envelope: Value) -> Result<Self, PollerError> {
        let results = match envelope.get_mut("results").map(Value::take) {
            Some(Value::Array(results)) => results,
            _ => return Err(PollerError::MalformedResponse { url: url.to_string() }),
        };
        let next = envelope
            .get("next")
            .and_then(Value::as_str)
            .filter(|next| !next.is_empty())
            .map(str::to_owned);

        Ok(Self { results, next })
    }
}

/// Follows `next` cursors from an initial URL until the last page.
pub struct PagedFetcher<'a> {
    source: &'a dyn JsonSource,
}

impl<'a> PagedFetcher<'a> {
    pub fn new(source: &'a dyn JsonSource) -> Self {
        Self { source }
    }

    /// Fetch every page starting at `initial_url` and map each raw result
    /// through `transform`, preserving page order then in-page order.
    ///
    /// A malformed envelope or a failed transform aborts the whole fetch.
    pub async fn fetch_all<T, F>(&self, initial_url: &str, mut transform: F) -> Result<Vec<T>>
    where
        F: FnMut(Value) -> Result<T> + Send,
        T: Send,
    {
        let mut records = Vec::new();
        let mut cursor = Some(initial_url.to_string());
        let mut pages = 0usize;

        while let Some(url) = cursor {
            let envelope = self.source.fetch_json(&url).await?;
            let page = Page::from_envelope(&url, envelope)?;
            pages += 1;

            debug!(url = %url, page = pages, results = page.results.len(), "Page fetched");

            records.reserve(page.results.len());
            for raw in page.results {
                let record = transform(raw)
                    .with_context(|| format!("Failed to decode a result from {url}"))?;
                records.push(record);
            }

            cursor = page.next;
        }

        debug!(url = initial_url, pages, records = records.len(), "Pagination complete");
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
