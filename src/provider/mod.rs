//! Metering data provider integration.
//!
//! Defines the `JsonSource` capability (fetch one JSON document by URL) and
//! builds the Octopus Energy client on top of it:
//! - `http`: reqwest transport with basic-auth credentials
//! - `pager`: cursor-following pagination over `JsonSource`
//! - `octopus`: consumption and tariff-rate resources

pub mod http;
pub mod octopus;
pub mod pager;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction over the authenticated transport.
///
/// Implementors issue one GET per call and return the decoded JSON body.
/// Non-success statuses are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}
