use serde::{Deserialize, Serialize};

const DOI_RESOLVER: &str = "https://doi.org/";

/// A DOI as found in a docmap, with the forms the importer needs.
///
/// `bare` keeps the publisher's casing (hosts store and compare it verbatim);
/// `key` is lowercased for case-insensitive lookups against Crossref.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Doi {
    pub raw: String,
    pub bare: String,
    pub key: String,
    pub url: String,
}

impl Doi {
    pub fn new(input: &str) -> Self {
        let input = input.trim();
        let bare = strip_doi_prefix(input).to_string();
        let key = bare.to_lowercase();
        let url = format!("{DOI_RESOLVER}{bare}");

        Self {
            raw: input.to_string(),
            bare,
            key,
            url,
        }
    }

    /// Loose shape check: `10.<registrant>/<suffix>`.
    pub fn looks_valid(&self) -> bool {
        self.bare.starts_with("10.")
            && self
                .bare
                .split_once('/')
                .is_some_and(|(_, suffix)| !suffix.is_empty())
    }
}

/// Canonical `https://doi.org/<doi>` form used as the deduplication key.
pub fn canonical_doi_url(doi: &str) -> String {
    Doi::new(doi).url
}

fn strip_doi_prefix(input: &str) -> &str {
    const PREFIXES: [&str; 6] = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
        "DOI:",
    ];

    PREFIXES
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .map(str::trim_start)
        .unwrap_or(input)
}
