//! Bulk metadata enrichment under the metadata service's rate policy.
//!
//! Batches go out strictly one at a time. The service blocks clients that
//! burst concurrent requests, so "one request in flight" is a correctness
//! requirement here; do not turn the loop into a parallel map.

use std::collections::HashSet;
use std::sync::Arc;

use docmap_ingest_core::config::MAX_CROSSREF_BATCH;
use tracing::{debug, info, warn};

use crate::enrichment::dictionary::CrossrefDictionary;
use crate::identifiers::Doi;
use crate::sources::BibliographicSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub batches: usize,
    pub failed_batches: usize,
    pub records: usize,
    pub missing_link: usize,
    pub skipped_dois: usize,
}

pub struct EnrichmentBatcher {
    source: Arc<dyn BibliographicSource>,
    batch_size: usize,
}

impl EnrichmentBatcher {
    pub fn new(source: Arc<dyn BibliographicSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.clamp(1, MAX_CROSSREF_BATCH),
        }
    }

    /// Look up every DOI, one bounded batch after another.
    ///
    /// A failed batch leaves its DOIs out of the dictionary; it never fails
    /// the run.
    pub async fn build_dictionary(&self, dois: &[String]) -> (CrossrefDictionary, EnrichmentStats) {
        let mut stats = EnrichmentStats::default();
        let mut dictionary = CrossrefDictionary::default();
        let queue = self.prepare(dois, &mut stats);

        for (index, batch) in queue.chunks(self.batch_size).enumerate() {
            stats.batches += 1;
            debug!(batch = index, size = batch.len(), source = self.source.name(), "requesting metadata batch");

            match self.source.fetch_bulk(batch).await {
                Ok(works) => {
                    for work in works {
                        let doi = work.doi.clone();
                        if dictionary.insert(work) {
                            stats.records += 1;
                        } else {
                            stats.missing_link += 1;
                            warn!(doi = %doi, "metadata record has no primary URL; leaving unenriched");
                        }
                    }
                }
                Err(err) => {
                    stats.failed_batches += 1;
                    warn!(
                        batch = index,
                        size = batch.len(),
                        error = %err,
                        "metadata batch failed; its DOIs stay unenriched"
                    );
                }
            }
        }

        info!(
            batches = stats.batches,
            failed = stats.failed_batches,
            records = stats.records,
            "metadata dictionary built"
        );
        (dictionary, stats)
    }

    /// Drop repeats and values the service would reject outright; a single
    /// malformed filter value fails the whole bulk request.
    fn prepare(&self, dois: &[String], stats: &mut EnrichmentStats) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut queue = Vec::with_capacity(dois.len());
        for raw in dois {
            let doi = Doi::new(raw);
            if !doi.looks_valid() {
                stats.skipped_dois += 1;
                warn!(doi = %raw, "not a DOI; skipping metadata lookup");
                continue;
            }
            if seen.insert(doi.key) {
                queue.push(doi.bare);
            }
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ImportError, Result};
    use crate::sources::WorkMetadata;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<Vec<String>>>,
        fail_call: Option<usize>,
    }

    #[async_trait]
    impl BibliographicSource for RecordingSource {
        fn name(&self) -> &str {
            "recording"
        }

        async fn fetch_bulk(&self, dois: &[String]) -> Result<Vec<WorkMetadata>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(dois.to_vec());
                calls.len() - 1
            };
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_call == Some(call) {
                return Err(ImportError::ServerError {
                    url: "https://api.crossref.org/works".to_string(),
                    status: 503,
                });
            }

            Ok(dois
                .iter()
                .map(|doi| WorkMetadata {
                    doi: doi.clone(),
                    title: Some(format!("Title of {doi}")),
                    link: (!doi.ends_with("nolink")).then(|| format!("https://example.org/{doi}")),
                    abstract_text: None,
                })
                .collect())
        }
    }

    fn dois(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.1101/{i:05}")).collect()
    }

    #[tokio::test]
    async fn batches_are_bounded_and_sequential() {
        let source = Arc::new(RecordingSource::default());
        let batcher = EnrichmentBatcher::new(source.clone(), 100);

        let (dict, stats) = batcher.build_dictionary(&dois(250)).await;

        let calls = source.calls.lock().unwrap();
        let sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(stats.batches, 3);
        assert_eq!(dict.len(), 250);
    }

    #[tokio::test]
    async fn batch_size_never_exceeds_service_cap() {
        let source = Arc::new(RecordingSource::default());
        let batcher = EnrichmentBatcher::new(source.clone(), 1000);

        batcher.build_dictionary(&dois(150)).await;

        let calls = source.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.len() <= 100));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn failed_batch_degrades_only_its_dois() {
        let source = Arc::new(RecordingSource {
            fail_call: Some(0),
            ..Default::default()
        });
        let batcher = EnrichmentBatcher::new(source.clone(), 2);
        let input = dois(3);

        let (dict, stats) = batcher.build_dictionary(&input).await;

        assert_eq!(stats.failed_batches, 1);
        assert!(dict.get(&input[0]).is_none());
        assert!(dict.get(&input[1]).is_none());
        assert!(dict.get(&input[2]).is_some());
    }

    #[tokio::test]
    async fn records_without_link_and_bad_dois_are_soft_misses() {
        let source = Arc::new(RecordingSource::default());
        let batcher = EnrichmentBatcher::new(source.clone(), 100);
        let input = vec![
            "10.1/ok".to_string(),
            "10.1/nolink".to_string(),
            "garbage".to_string(),
            "10.1/OK".to_string(),
        ];

        let (dict, stats) = batcher.build_dictionary(&input).await;

        assert_eq!(source.calls.lock().unwrap()[0], vec!["10.1/ok", "10.1/nolink"]);
        assert_eq!(stats.skipped_dois, 1);
        assert_eq!(stats.missing_link, 1);
        assert!(dict.get("10.1/ok").is_some());
        assert!(dict.get("10.1/nolink").is_none());
    }

    #[tokio::test]
    async fn nothing_to_enrich_makes_no_calls() {
        let source = Arc::new(RecordingSource::default());
        let batcher = EnrichmentBatcher::new(source.clone(), 100);
        let (dict, stats) = batcher.build_dictionary(&[]).await;
        assert!(dict.is_empty());
        assert_eq!(stats.batches, 0);
        assert!(source.calls.lock().unwrap().is_empty());
    }
}
