pub mod batcher;
pub mod dictionary;

pub use batcher::{EnrichmentBatcher, EnrichmentStats};
pub use dictionary::{BibliographicRecord, CrossrefDictionary};
