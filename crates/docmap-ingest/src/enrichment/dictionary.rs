use std::collections::HashMap;

use crate::identifiers::Doi;
use crate::sources::WorkMetadata;

/// Bibliographic fields a manuscript is decorated with.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographicRecord {
    pub title: Option<String>,
    pub link: String,
    pub abstract_text: Option<String>,
}

/// Per-run DOI → metadata table. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct CrossrefDictionary {
    entries: HashMap<String, BibliographicRecord>,
}

impl CrossrefDictionary {
    /// Keep `work` if it names a landing page; returns whether it was kept.
    pub fn insert(&mut self, work: WorkMetadata) -> bool {
        let Some(link) = work.link else {
            return false;
        };
        self.entries.insert(
            Doi::new(&work.doi).key,
            BibliographicRecord {
                title: work.title,
                link,
                abstract_text: work.abstract_text,
            },
        );
        true
    }

    /// Case-insensitive lookup; `None` means no enrichment is available.
    pub fn get(&self, doi: &str) -> Option<&BibliographicRecord> {
        self.entries.get(&Doi::new(doi).key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
