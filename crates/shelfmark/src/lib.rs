//! Shelfmark - Document Catalog Scanner
//!
//! Catalogs heterogeneous document trees into one normalized
//! metadata+preview artifact per document, with incremental re-indexing
//! and a derived latest-revision index for downstream retrieval systems.

pub mod catalog;
pub mod config;

pub use catalog::{run_scan, ContentExtractor, PlainTextExtractor, RunOptions, RunReport};
pub use config::Config;
