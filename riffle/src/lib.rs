//! Riffle - fuzzy text search for a book catalog
//!
//! An in-memory engine that ranks records by approximate (typo-tolerant)
//! matches across weighted text fields. Matching is a Bitap-style bounded
//! edit-distance scan with proximity and contiguous-run terms; scores are
//! distances where lower is better.
//!
//! `CatalogSearch` is the entry point for a serving layer. `SearchEngine` is
//! the synchronous core for callers that manage their own corpus.

pub(crate) mod candidate;
pub mod config;
pub mod corpus;
mod format;
pub mod indexer;
pub mod interface;
pub mod matcher;
pub mod models;
mod ranking;
pub mod search;
mod store;

pub use config::{FieldConfig, MatcherOptions, SearchConfig};
pub use corpus::{CorpusProvider, JsonFileCorpus, StaticCorpus};
pub use interface::*;
pub use models::{Book, Record};
pub use search::SearchEngine;
pub use store::CatalogSearch;
