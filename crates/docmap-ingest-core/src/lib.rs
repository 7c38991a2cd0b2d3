//! Core library for docmap ingestion: docmap wire model, manuscript records,
//! host form shape, config.

pub mod config;
pub mod error;
pub mod models;
pub mod navigator;

pub use config::{AppConfig, CrossrefConfig, DataHubConfig, DedupStrategy, ImportConfig};
pub use error::{CoreError, Result};
pub use models::*;
