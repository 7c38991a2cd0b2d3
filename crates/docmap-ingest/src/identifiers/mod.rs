pub mod doi;

pub use doi::{Doi, canonical_doi_url};
