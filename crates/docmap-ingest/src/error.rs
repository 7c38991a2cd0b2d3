use docmap_ingest_core::CoreError;
use thiserror::Error;

use crate::schema::Violation;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("docmap index failed schema validation: {}", render_violations(.0))]
    SchemaValidation(Vec<Violation>),

    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("unauthorized resource requested from {0}")]
    Unauthorized(String),

    #[error("resource requested from {0} not found")]
    NotFound(String),

    #[error("request to {url} failed with server error {status}")]
    ServerError { url: String, status: u16 },

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("host collaborator failed: {0}")]
    Host(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn render_violations(violations: &[Violation]) -> String {
    let shown: Vec<String> = violations.iter().take(10).map(ToString::to_string).collect();
    let mut out = format!("{} violation(s): {}", violations.len(), shown.join("; "));
    if violations.len() > shown.len() {
        out.push_str("; ...");
    }
    out
}

pub type Result<T> = std::result::Result<T, ImportError>;
