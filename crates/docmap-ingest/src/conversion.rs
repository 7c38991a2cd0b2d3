//! Docmap → manuscript records.
//!
//! Steps are visited in declaration order. A creating step appends a new
//! draft; a reviewing step attaches its reviews to the draft created by its
//! `previous-step`. The draft list is a plain value threaded through the
//! traversal and dropped into the result at the end.

use docmap_ingest_core::{
    Docmap, ImportedRecord, Manuscript, Output, OutputType, Review, Step, TitleFormat,
};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::eligibility::{contributes_reviews, creates_manuscript};
use crate::enrichment::CrossrefDictionary;
use crate::identifiers::canonical_doi_url;
use crate::reviews::scrape_review;
use crate::sources::ReviewSource;

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Remove every `<...>` tag, keeping the text between them.
pub fn strip_markup(text: &str) -> String {
    MARKUP_RE.replace_all(text, "").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub manuscripts: usize,
    pub enrichment_misses: usize,
    pub reviews_attached: usize,
    pub reviews_dropped: usize,
}

impl ConversionStats {
    pub fn absorb(&mut self, other: &ConversionStats) {
        self.manuscripts += other.manuscripts;
        self.enrichment_misses += other.enrichment_misses;
        self.reviews_attached += other.reviews_attached;
        self.reviews_dropped += other.reviews_dropped;
    }
}

/// A manuscript under construction, tagged with the step that created it.
struct ManuscriptDraft {
    created_on_step_id: String,
    manuscript: Manuscript,
}

/// Everything one run's conversions share. Read-only, so docmaps can be
/// converted concurrently.
pub struct Converter<'a> {
    blueprint: &'a Manuscript,
    title_format: TitleFormat,
    dictionary: &'a CrossrefDictionary,
    reviews: &'a dyn ReviewSource,
}

impl<'a> Converter<'a> {
    pub fn new(
        blueprint: &'a Manuscript,
        title_format: TitleFormat,
        dictionary: &'a CrossrefDictionary,
        reviews: &'a dyn ReviewSource,
    ) -> Self {
        Self {
            blueprint,
            title_format,
            dictionary,
            reviews,
        }
    }

    pub async fn convert(&self, docmap: &Docmap) -> (ImportedRecord, ConversionStats) {
        let mut stats = ConversionStats::default();
        let mut drafts = Vec::new();

        for (step_id, step) in docmap.steps.iter() {
            drafts = self.visit(docmap, step_id, step, drafts, &mut stats).await;
        }

        let manuscripts: Vec<Manuscript> = drafts.into_iter().map(|d| d.manuscript).collect();
        stats.manuscripts = manuscripts.len();
        debug!(docmap = %docmap.id, manuscripts = stats.manuscripts, "docmap converted");
        (ImportedRecord::from_manuscripts(manuscripts), stats)
    }

    async fn visit(
        &self,
        docmap: &Docmap,
        step_id: &str,
        step: &Step,
        mut drafts: Vec<ManuscriptDraft>,
        stats: &mut ConversionStats,
    ) -> Vec<ManuscriptDraft> {
        if creates_manuscript(step) {
            drafts.push(ManuscriptDraft {
                created_on_step_id: step_id.to_string(),
                manuscript: self.create(docmap, step_id, step, stats),
            });
        }
        if contributes_reviews(step) {
            self.attach_reviews(docmap, step_id, step, &mut drafts, stats).await;
        }
        drafts
    }

    fn create(
        &self,
        docmap: &Docmap,
        step_id: &str,
        step: &Step,
        stats: &mut ConversionStats,
    ) -> Manuscript {
        let mut manuscript = self.blueprint.clone();
        manuscript.is_imported = true;

        let identifier = step.preprint_identifier();
        manuscript.short_id = identifier.and_then(|id| id.trim().parse::<i64>().ok());
        if let Some(id) = identifier
            && manuscript.short_id.is_none()
        {
            warn!(docmap = %docmap.id, step = step_id, identifier = id, "preprint identifier is not numeric; shortId left unset");
        }
        manuscript.submission.article_id = identifier.map(ToOwned::to_owned);

        let doi = step.preprint_input_doi();
        let doi_url = doi.map(canonical_doi_url);
        manuscript.doi = doi_url.clone();
        manuscript.submission.doi = doi_url;

        let record = doi.and_then(|d| self.dictionary.get(d));
        if record.is_none() {
            stats.enrichment_misses += 1;
            warn!(docmap = %docmap.id, step = step_id, doi = ?doi, "no bibliographic metadata; title and abstract left empty");
        }

        let title = record
            .and_then(|r| r.title.as_deref())
            .map(|t| match self.title_format {
                TitleFormat::PlainText => strip_markup(t),
                TitleFormat::Rich => t.to_string(),
            })
            .unwrap_or_default();
        manuscript.submission.title = Some(title.clone());
        manuscript.meta.title = Some(title);
        manuscript.submission.source_uri = record.map(|r| r.link.clone());
        manuscript.submission.abstract_text =
            Some(record.and_then(|r| r.abstract_text.clone()).unwrap_or_default());

        manuscript
    }

    /// Scrape every review output of `step` and attach them, in declaration
    /// order, to the draft its `previous-step` created.
    async fn attach_reviews(
        &self,
        docmap: &Docmap,
        step_id: &str,
        step: &Step,
        drafts: &mut [ManuscriptDraft],
        stats: &mut ConversionStats,
    ) {
        let outputs: Vec<&Output> = step.outputs().filter(|o| o.kind.is_review()).collect();
        if outputs.is_empty() {
            return;
        }

        let target = step
            .previous_step
            .as_deref()
            .and_then(|prev| drafts.iter().position(|d| d.created_on_step_id == prev));
        let Some(target) = target else {
            stats.reviews_dropped += outputs.len();
            warn!(
                docmap = %docmap.id,
                step = step_id,
                previous_step = ?step.previous_step,
                dropped = outputs.len(),
                "no manuscript version for these reviews; dropping them"
            );
            return;
        };

        let bodies = join_all(outputs.iter().map(|output| self.review_body(docmap, step_id, output))).await;

        let manuscript = &mut drafts[target].manuscript;
        for (output, body) in outputs.iter().zip(bodies) {
            manuscript
                .reviews
                .push(Review::new(body, output.kind == OutputType::EvaluationSummary));
        }
        stats.reviews_attached += outputs.len();
    }

    async fn review_body(&self, docmap: &Docmap, step_id: &str, output: &Output) -> String {
        match output.content_url() {
            Some(url) => scrape_review(self.reviews, url).await,
            None => {
                warn!(docmap = %docmap.id, step = step_id, kind = %output.kind, "review output has no content link");
                String::new()
            }
        }
    }
}
