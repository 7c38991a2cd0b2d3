//! The host system the importer feeds manuscripts into.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use docmap_ingest_core::{ImportedRecord, Manuscript, SubmissionForm};
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::identifiers::{Doi, canonical_doi_url};

/// Context the importer needs from the host.
///
/// A failure from any of these is fatal for the run.
#[async_trait]
pub trait ManuscriptHost: Send + Sync {
    /// Blueprint every new manuscript is copied from.
    async fn stub_manuscript(&self) -> Result<Manuscript>;

    /// Whether a manuscript for `doi_or_url` already exists. `strict`
    /// compares the canonical DOI URL exactly.
    async fn has_manuscript_with_doi(&self, doi_or_url: &str, strict: bool) -> Result<bool>;

    async fn submission_form(&self) -> Result<SubmissionForm>;
}

/// On-disk host description used by the CLI and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostFixture {
    #[serde(default)]
    pub blueprint: Manuscript,
    #[serde(default)]
    pub submission_form: SubmissionForm,
    #[serde(default)]
    pub existing_dois: Vec<String>,
}

/// In-memory host. Remembers what it has been told was imported, so a second
/// run in the same process sees those manuscripts as existing.
pub struct StaticHost {
    blueprint: Manuscript,
    form: SubmissionForm,
    known: Mutex<HashSet<String>>,
}

impl StaticHost {
    pub fn new(blueprint: Manuscript, form: SubmissionForm) -> Self {
        Self {
            blueprint,
            form,
            known: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_fixture(fixture: HostFixture) -> Self {
        let host = Self::new(fixture.blueprint, fixture.submission_form);
        host.remember(fixture.existing_dois.iter().map(String::as_str));
        host
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ImportError::Host(format!("{}: {e}", path.display())))?;
        let fixture: HostFixture = serde_json::from_str(&content)
            .map_err(|e| ImportError::Host(format!("{}: {e}", path.display())))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Mark every manuscript in `records` as existing.
    pub fn record_imported(&self, records: &[ImportedRecord]) {
        let dois = records
            .iter()
            .flat_map(ImportedRecord::manuscripts)
            .filter_map(|m| m.doi.as_deref());
        self.remember(dois);
    }

    pub fn known_dois(&self) -> Vec<String> {
        let known = self.known.lock().unwrap_or_else(PoisonError::into_inner);
        let mut dois: Vec<String> = known.iter().cloned().collect();
        dois.sort();
        dois
    }

    fn remember<'a>(&self, dois: impl Iterator<Item = &'a str>) {
        let mut known = self.known.lock().unwrap_or_else(PoisonError::into_inner);
        known.extend(dois.map(canonical_doi_url));
    }
}

#[async_trait]
impl ManuscriptHost for StaticHost {
    async fn stub_manuscript(&self) -> Result<Manuscript> {
        Ok(self.blueprint.clone())
    }

    async fn has_manuscript_with_doi(&self, doi_or_url: &str, strict: bool) -> Result<bool> {
        let known = self.known.lock().unwrap_or_else(PoisonError::into_inner);
        if strict {
            return Ok(known.contains(doi_or_url));
        }
        let key = Doi::new(doi_or_url).key;
        Ok(known.iter().any(|url| Doi::new(url).key == key))
    }

    async fn submission_form(&self) -> Result<SubmissionForm> {
        Ok(self.form.clone())
    }
}
