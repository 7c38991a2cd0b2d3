//! Docmap ingestion: Data Hub index, Crossref enrichment, manuscript conversion.

pub mod error;
pub mod http;
pub mod identifiers;
pub mod schema;
pub mod sources;
pub mod eligibility;
pub mod enrichment;
pub mod reviews;
pub mod conversion;
pub mod host;
pub mod import;

#[cfg(test)]
mod test_support;

pub use error::{ImportError, Result};
pub use eligibility::Rejection;
pub use host::{HostFixture, ManuscriptHost, StaticHost};
pub use import::{ImportOutcome, ImportReport, ImportRequest, Importer, IMPORTER_TAG};
