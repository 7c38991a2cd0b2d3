use std::time::Duration;

use async_trait::async_trait;
use docmap_ingest_core::CrossrefConfig;
use docmap_ingest_core::config::MAX_CROSSREF_BATCH;
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::http::RateLimitedClient;
use crate::sources::{BibliographicSource, WorkMetadata};

pub struct CrossRefSource {
    client: RateLimitedClient,
    works_url: String,
}

impl CrossRefSource {
    pub fn from_config(config: &CrossrefConfig) -> Result<Self> {
        if config.works_url.trim().is_empty() {
            return Err(ImportError::MissingConfig("crossref.works_url"));
        }
        Self::with_params(
            &config.works_url,
            Duration::from_millis(config.min_interval_ms),
            config.max_retries,
            Some(Duration::from_secs(config.timeout_secs.max(1))),
            config.polite_email.clone(),
        )
    }

    pub fn with_params(
        works_url: &str,
        min_interval: Duration,
        max_retries: u32,
        timeout: Option<Duration>,
        polite_email: Option<String>,
    ) -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = match &polite_email {
            Some(email) => format!("docmap-ingest/{version} (mailto:{email})"),
            None => format!("docmap-ingest/{version}"),
        };

        Ok(Self {
            client: RateLimitedClient::with_timeout(min_interval, max_retries, &user_agent, timeout)?,
            works_url: works_url.trim_end_matches('/').to_string(),
        })
    }

    fn bulk_url(&self, dois: &[String]) -> String {
        let filter = dois
            .iter()
            .map(|doi| format!("doi:{doi}"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}?filter={}&rows={MAX_CROSSREF_BATCH}",
            self.works_url,
            urlencoding::encode(&filter),
        )
    }
}

#[async_trait]
impl BibliographicSource for CrossRefSource {
    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn fetch_bulk(&self, dois: &[String]) -> Result<Vec<WorkMetadata>> {
        if dois.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.bulk_url(dois);
        let val: Value = self.client.get_json(&url, None).await?;

        let items = val["message"]["items"].as_array().ok_or_else(|| {
            ImportError::Parse("Missing message.items in CrossRef response".to_string())
        })?;

        Ok(items.iter().filter_map(work_from_json).collect())
    }
}

/// Items without a DOI cannot be keyed and are skipped.
fn work_from_json(v: &Value) -> Option<WorkMetadata> {
    let doi = v["DOI"].as_str()?.to_string();
    let title = v["title"]
        .as_array()
        .and_then(|titles| titles.iter().find_map(Value::as_str))
        .map(ToOwned::to_owned);
    let link = v["resource"]["primary"]["URL"].as_str().map(ToOwned::to_owned);
    let abstract_text = v["abstract"].as_str().map(ToOwned::to_owned);

    Some(WorkMetadata {
        doi,
        title,
        link,
        abstract_text,
    })
}
