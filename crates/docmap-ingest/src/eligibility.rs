//! Which docmaps describe new reviewed work, and what each step contributes.
//!
//! Structural checks run before any network call so incomplete workflows
//! never spend metadata-service quota.

use std::fmt;

use chrono::{DateTime, Utc};
use docmap_ingest_core::{AssertionStatus, Docmap, OutputType, Step};
use tracing::{debug, info};

use crate::error::Result;
use crate::host::ManuscriptHost;
use crate::identifiers::Doi;

/// Why a docmap is left out of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// First step does not assert `under-review`.
    NotUnderReview,
    /// First step has no `preprint` output.
    NoPreprintOutput,
    /// First step has no `preprint` input to take a DOI from.
    NoPreprintInput,
    /// Multi-step docmap with no peer-reviewed step carrying an evaluation summary.
    NotYetAssessed,
    /// Created on or before the caller's last import.
    BeforeCutoff,
    /// The host already has a manuscript for this DOI.
    Duplicate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotUnderReview => "first step is not under review",
            Self::NoPreprintOutput => "first step has no preprint output",
            Self::NoPreprintInput => "first step has no preprint input",
            Self::NotYetAssessed => "no peer-reviewed step with an evaluation summary",
            Self::BeforeCutoff => "created before the last import",
            Self::Duplicate => "already imported",
        };
        write!(f, "{s}")
    }
}

/// A step produces a new manuscript version.
pub fn creates_manuscript(step: &Step) -> bool {
    step.asserts(AssertionStatus::UnderReview) && step.has_output(OutputType::Preprint)
}

/// A step's review outputs attach to the version it reviews.
pub fn contributes_reviews(step: &Step) -> bool {
    step.asserts(AssertionStatus::PeerReviewed) || step.asserts(AssertionStatus::Revised)
}

fn is_assessed(step: &Step) -> bool {
    step.asserts(AssertionStatus::PeerReviewed) && step.has_output(OutputType::EvaluationSummary)
}

/// Offline structural check. `Ok(None)` means the docmap is worth converting.
pub fn classify(docmap: &Docmap) -> Result<Option<Rejection>> {
    let first = docmap.first_step()?;
    if !first.asserts(AssertionStatus::UnderReview) {
        return Ok(Some(Rejection::NotUnderReview));
    }
    if !first.has_output(OutputType::Preprint) {
        return Ok(Some(Rejection::NoPreprintOutput));
    }
    if first.preprint_input_doi().is_none() {
        return Ok(Some(Rejection::NoPreprintInput));
    }
    if docmap.steps.len() > 1 && !docmap.chain().into_iter().any(|(_, step)| is_assessed(step)) {
        return Ok(Some(Rejection::NotYetAssessed));
    }
    Ok(None)
}

/// A docmap cleared for conversion, with the DOI it is keyed on.
#[derive(Debug, Clone)]
pub struct EligibleDocmap<'a> {
    pub docmap: &'a Docmap,
    pub doi: Doi,
}

#[derive(Debug, Default)]
pub struct Screening<'a> {
    pub eligible: Vec<EligibleDocmap<'a>>,
    pub rejected: Vec<(&'a str, Rejection)>,
}

impl Screening<'_> {
    pub fn rejected_for(&self, reason: Rejection) -> usize {
        self.rejected.iter().filter(|(_, r)| *r == reason).count()
    }
}

/// Split `docmaps` into eligible and rejected.
///
/// The host's duplicate predicate is asked once per structurally eligible
/// docmap, with the canonical URL of its first-step preprint DOI. `cutoff`
/// additionally drops docmaps created at or before it.
pub async fn screen<'a>(
    docmaps: &'a [Docmap],
    host: &dyn ManuscriptHost,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Screening<'a>> {
    let mut screening = Screening::default();

    for docmap in docmaps {
        let verdict = match classify(docmap)? {
            Some(reason) => Err(reason),
            None => check_new(docmap, host, cutoff).await?,
        };
        match verdict {
            Ok(doi) => screening.eligible.push(EligibleDocmap { docmap, doi }),
            Err(reason) => {
                debug!(docmap = %docmap.id, %reason, "docmap skipped");
                screening.rejected.push((docmap.id.as_str(), reason));
            }
        }
    }

    info!(
        eligible = screening.eligible.len(),
        rejected = screening.rejected.len(),
        "docmaps screened"
    );
    Ok(screening)
}

async fn check_new(
    docmap: &Docmap,
    host: &dyn ManuscriptHost,
    cutoff: Option<DateTime<Utc>>,
) -> Result<std::result::Result<Doi, Rejection>> {
    let Some(raw) = docmap.first_step_preprint_doi()? else {
        return Ok(Err(Rejection::NoPreprintInput));
    };
    if let Some(cutoff) = cutoff
        && docmap.created.with_timezone(&Utc) <= cutoff
    {
        return Ok(Err(Rejection::BeforeCutoff));
    }

    let doi = Doi::new(raw);
    if host.has_manuscript_with_doi(&doi.url, true).await? {
        return Ok(Err(Rejection::Duplicate));
    }
    Ok(Ok(doi))
}
