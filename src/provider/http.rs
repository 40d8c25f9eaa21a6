//! reqwest-backed `JsonSource`.
//!
//! Auth: the provider API key is sent as the basic-auth username with an
//! empty password.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::JsonSource;

const USER_AGENT: &str = concat!("meter-costs/", env!("CARGO_PKG_VERSION"));

/// HTTP transport presenting the API key on every request.
pub struct BasicAuthSource {
    http: Client,
    api_key: SecretString,
}

impl BasicAuthSource {
    /// Build the transport. `timeout == None` leaves requests unbounded.
    pub fn new(api_key: SecretString, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build HTTP client for the metering provider")?;

        Ok(Self { http, api_key })
    }
}

#[async_trait]
impl JsonSource for BasicAuthSource {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        debug!(url, "Executing request");

        let resp = self
            .http
            .get(url)
            .basic_auth(self.api_key.expose_secret(), Some(""))
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Provider API error {status} from {url}: {body}");
        }

        resp.json::<Value>()
            .await
            .with_context(|| format!("Failed to decode JSON from {url}"))
    }
}
