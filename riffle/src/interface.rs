//! Riffle public interface
//!
//! Shared types handed to and returned from the serving layer: the query
//! contract, response shapes, the error taxonomy and the service trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::models::Record;

/// Default number of results for a full search
pub const DEFAULT_LIMIT: usize = 10;
/// Default maximum composite distance for a full search
pub const DEFAULT_THRESHOLD: f64 = 0.3;
/// Default number of suggestions
pub const DEFAULT_SUGGEST_LIMIT: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY
// ═══════════════════════════════════════════════════════════════════════════════

/// A full search request.
///
/// `threshold` is a maximum *distance*: 0 demands an exact match, 1 accepts
/// anything. Results with a composite distance above it are discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1), custom = "not_blank")]
    pub text: String,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1))]
    pub limit: usize,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl SearchQuery {
    /// Query with the default limit (10) and threshold (0.3)
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate the query contract. Range validation lets NaN through,
    /// so the threshold is checked for it separately.
    pub fn check(&self) -> Result<(), RiffleError> {
        self.validate()?;
        if self.threshold.is_nan() {
            return Err(RiffleError::Validation("threshold must be a number".into()));
        }
        Ok(())
    }
}

/// Validate the arguments of a suggestion request.
pub(crate) fn check_suggest_args(partial: &str, limit: usize) -> Result<(), RiffleError> {
    if partial.trim().is_empty() {
        return Err(RiffleError::Validation("text: must not be empty".into()));
    }
    if limit == 0 {
        return Err(RiffleError::Validation("limit: must be at least 1".into()));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Half-open char range `[start, end)` into a field's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRange {
    pub start: usize,
    pub end: usize,
}

/// Where a query matched inside one field. Advisory only (highlighting);
/// never affects ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSpan {
    pub field: String,
    pub matched_text: String,
    pub ranges: Vec<SpanRange>,
}

/// One ranked record in a search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: Arc<Record>,
    pub score: f64,
    pub matches: Vec<MatchSpan>,
}

/// Search response container
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub threshold: f64,
}

/// Lightweight autocomplete entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub record_id: String,
    pub summary: BTreeMap<String, String>,
    pub score: f64,
}

/// Outcome of an index build or rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub version: u64,
    pub records: usize,
    pub built_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for Riffle operations.
///
/// An empty corpus is not an error: it yields empty result lists.
#[derive(Debug, Error)]
pub enum RiffleError {
    #[error("Invalid query: {0}")]
    Validation(String),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Corpus error: {0}")]
    Corpus(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl RiffleError {
    /// Whether the caller supplied a query that violates the contract
    pub fn is_validation(&self) -> bool {
        matches!(self, RiffleError::Validation(_))
    }
}

impl From<validator::ValidationErrors> for RiffleError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                format!("{}: {}", field, codes.join(", "))
            })
            .collect();
        fields.sort();
        RiffleError::Validation(fields.join("; "))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The interface the serving layer uses to query the catalog.
/// This matches the functionality exposed by `CatalogSearch`.
#[async_trait::async_trait]
pub trait CatalogSearchApi: Send + Sync {
    /// Ranked fuzzy search. Builds the index on first use.
    async fn search(&self, query: SearchQuery) -> Result<SearchResponse, RiffleError>;

    /// Lenient autocomplete over partial input
    async fn suggest(&self, partial: String, limit: usize) -> Result<Vec<Suggestion>, RiffleError>;

    /// Pull a fresh corpus from the provider and swap it in
    fn rebuild(&self) -> Result<IndexStats, RiffleError>;

    /// Number of records in the current snapshot (0 before the first build)
    fn record_count(&self) -> usize;
}
