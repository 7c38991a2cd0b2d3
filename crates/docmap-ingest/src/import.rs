//! End-to-end import run: index → screening → enrichment → conversion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use docmap_ingest_core::{AppConfig, DedupStrategy, ImportConfig, ImportedRecord};
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span};

use crate::conversion::{ConversionStats, Converter};
use crate::eligibility::{self, Rejection};
use crate::enrichment::EnrichmentBatcher;
use crate::error::Result;
use crate::host::ManuscriptHost;
use crate::schema;
use crate::sources::crossref::CrossRefSource;
use crate::sources::data_hub::DataHubClient;
use crate::sources::{BibliographicSource, DocmapIndexSource, ReviewSource};

/// Tag carried by the span every import log line is emitted under.
pub const IMPORTER_TAG: &str = "IMPORT_DOCMAPS_FROM_DATA_HUB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Only honoured with [`DedupStrategy::PredicateAndCutoff`].
    #[serde(default)]
    pub last_import_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub docmaps_fetched: usize,
    pub rejected_ineligible: usize,
    pub rejected_duplicate: usize,
    pub rejected_before_cutoff: usize,
    pub records: usize,
    pub manuscripts: usize,
    pub enrichment_batches: usize,
    pub failed_enrichment_batches: usize,
    pub enrichment_misses: usize,
    pub reviews_attached: usize,
    pub reviews_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub records: Vec<ImportedRecord>,
    pub report: ImportReport,
}

pub struct Importer {
    index: Arc<dyn DocmapIndexSource>,
    metadata: Arc<dyn BibliographicSource>,
    reviews: Arc<dyn ReviewSource>,
    batch_size: usize,
    config: ImportConfig,
}

impl Importer {
    pub fn new(
        index: Arc<dyn DocmapIndexSource>,
        metadata: Arc<dyn BibliographicSource>,
        reviews: Arc<dyn ReviewSource>,
    ) -> Self {
        Self {
            index,
            metadata,
            reviews,
            batch_size: docmap_ingest_core::config::MAX_CROSSREF_BATCH,
            config: ImportConfig::default(),
        }
    }

    /// Data Hub for the index and reviews, Crossref for metadata.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let hub = Arc::new(DataHubClient::from_config(&config.data_hub)?);
        let crossref = Arc::new(CrossRefSource::from_config(&config.crossref)?);
        Ok(Self::new(hub.clone(), crossref, hub)
            .with_import_config(config.import.clone())
            .with_batch_size(config.crossref.effective_batch_size()))
    }

    pub fn with_import_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// The records the host should create.
    pub async fn import(
        &self,
        host: &dyn ManuscriptHost,
        request: &ImportRequest,
    ) -> Result<Vec<ImportedRecord>> {
        Ok(self.run(host, request).await?.records)
    }

    /// Like [`Importer::import`], with counts of what happened on the way.
    pub async fn run(&self, host: &dyn ManuscriptHost, request: &ImportRequest) -> Result<ImportOutcome> {
        let span = info_span!("docmap_import", importer = IMPORTER_TAG);
        self.run_inner(host, request).instrument(span).await
    }

    async fn run_inner(&self, host: &dyn ManuscriptHost, request: &ImportRequest) -> Result<ImportOutcome> {
        let mut report = ImportReport::default();

        info!("retrieving docmaps from index");
        let raw = self.index.fetch_index().await?;
        let index = schema::parse_index(raw)?;
        report.docmaps_fetched = index.docmaps.len();
        info!(docmaps = report.docmaps_fetched, "index validated");

        let blueprint = host.stub_manuscript().await?;
        let form = host.submission_form().await?;

        let cutoff = match self.config.dedup {
            DedupStrategy::Predicate => None,
            DedupStrategy::PredicateAndCutoff => request.last_import_date,
        };
        let screening = eligibility::screen(&index.docmaps, host, cutoff).await?;
        report.rejected_duplicate = screening.rejected_for(Rejection::Duplicate);
        report.rejected_before_cutoff = screening.rejected_for(Rejection::BeforeCutoff);
        report.rejected_ineligible =
            screening.rejected.len() - report.rejected_duplicate - report.rejected_before_cutoff;

        if screening.eligible.is_empty() {
            info!("nothing new to import");
            return Ok(ImportOutcome {
                records: Vec::new(),
                report,
            });
        }

        let dois: Vec<String> = screening.eligible.iter().map(|e| e.doi.bare.clone()).collect();
        let batcher = EnrichmentBatcher::new(self.metadata.clone(), self.batch_size);
        let (dictionary, enrichment) = batcher.build_dictionary(&dois).await;
        report.enrichment_batches = enrichment.batches;
        report.failed_enrichment_batches = enrichment.failed_batches;

        let converter = Converter::new(&blueprint, form.title_format(), &dictionary, self.reviews.as_ref());
        let converted: Vec<_> = stream::iter(screening.eligible.iter())
            .map(|eligible| converter.convert(eligible.docmap))
            .buffered(self.config.max_concurrent_conversions.max(1))
            .collect()
            .await;

        let mut totals = ConversionStats::default();
        let records: Vec<ImportedRecord> = converted
            .into_iter()
            .map(|(record, stats)| {
                totals.absorb(&stats);
                record
            })
            .collect();

        report.records = records.len();
        report.manuscripts = totals.manuscripts;
        report.enrichment_misses = totals.enrichment_misses;
        report.reviews_attached = totals.reviews_attached;
        report.reviews_dropped = totals.reviews_dropped;
        info!(
            records = report.records,
            manuscripts = report.manuscripts,
            "import finished"
        );

        Ok(ImportOutcome { records, report })
    }
}
