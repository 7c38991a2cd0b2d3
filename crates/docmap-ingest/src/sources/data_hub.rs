use std::time::Duration;

use async_trait::async_trait;
use docmap_ingest_core::DataHubConfig;
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::http::{BasicAuth, RateLimitedClient};
use crate::sources::{DocmapIndexSource, ReviewSource};

/// Authenticated client for the docmap index and the review pages it links to.
///
/// The index fetch retries per config; a review is fetched exactly once.
pub struct DataHubClient {
    index_client: RateLimitedClient,
    review_client: RateLimitedClient,
    index_url: String,
    auth: BasicAuth,
}

impl DataHubClient {
    /// Build from config, resolving credentials from inline values or the
    /// environment.
    pub fn from_config(config: &DataHubConfig) -> Result<Self> {
        if config.index_url.trim().is_empty() {
            return Err(ImportError::MissingConfig("data_hub.index_url"));
        }
        let username = config
            .resolve_username()
            .ok_or(ImportError::MissingCredentials("data hub username"))?;
        let password = config
            .resolve_password()
            .ok_or(ImportError::MissingCredentials("data hub password"))?;

        let user_agent = concat!("docmap-ingest/", env!("CARGO_PKG_VERSION"));
        let timeout = Some(Duration::from_secs(config.timeout_secs.max(1)));
        let index_client =
            RateLimitedClient::with_timeout(Duration::ZERO, config.max_retries, user_agent, timeout)?;
        let review_client = RateLimitedClient::with_timeout(Duration::ZERO, 0, user_agent, timeout)?;

        Ok(Self {
            index_client,
            review_client,
            index_url: config.index_url.clone(),
            auth: BasicAuth { username, password },
        })
    }
}

#[async_trait]
impl DocmapIndexSource for DataHubClient {
    async fn fetch_index(&self) -> Result<Value> {
        self.index_client.get_json(&self.index_url, Some(&self.auth)).await
    }
}

#[async_trait]
impl ReviewSource for DataHubClient {
    async fn fetch_review(&self, url: &str) -> Result<String> {
        self.review_client.get_with_auth(url, Some(&self.auth)).await
    }
}
