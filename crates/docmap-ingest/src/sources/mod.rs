use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub mod crossref;
pub mod data_hub;

/// Where the docmap index comes from.
#[async_trait]
pub trait DocmapIndexSource: Send + Sync {
    /// Raw index payload, before schema validation.
    async fn fetch_index(&self) -> Result<Value>;
}

/// Fetches the text behind a review or evaluation-summary link.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_review(&self, url: &str) -> Result<String>;
}

/// Bulk bibliographic lookup by DOI.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    fn name(&self) -> &str;

    /// Look up every DOI in `dois` with a single request.
    async fn fetch_bulk(&self, dois: &[String]) -> Result<Vec<WorkMetadata>>;
}

/// What a bibliographic source knows about one work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkMetadata {
    pub doi: String,
    pub title: Option<String>,
    /// Primary landing-page URL.
    pub link: Option<String>,
    pub abstract_text: Option<String>,
}
