//! Search Engine (linear scan over a snapshot, weighted field scoring)
//!
//! Every record of the current snapshot is scored by the `FieldScorer`; the
//! survivors (composite distance <= threshold) are sorted ascending with ties
//! in corpus order, truncated to the limit and handed to the formatter.
//! Fields are matched against `MatcherOptions::max_distance`, so the query
//! threshold filters composites without changing them.
//! Large snapshots are scored on rayon; the sort happens after collection so
//! parallel and sequential scoring return identical lists.

use tokio_util::sync::CancellationToken;

use crate::candidate::IndexedRecord;
use crate::config::SearchConfig;
use crate::format::{to_search_response, to_suggestions};
use crate::indexer::{Indexer, Snapshot, SnapshotRecords};
use crate::interface::{check_suggest_args, IndexStats, RiffleError, SearchQuery, SearchResponse, Suggestion};
use crate::matcher::{Matcher, Pattern};
use crate::models::Record;
use crate::ranking::{compare_ranked, FieldScorer, RankedMatch};

/// Records scored between cancellation checks on the sequential path
const CANCEL_CHECK_BATCH: usize = 64;

/// The in-process search engine: one index, one scorer, one validated config.
pub struct SearchEngine {
    config: SearchConfig,
    indexer: Indexer,
    scorer: FieldScorer,
    summary_fields: Vec<String>,
}

impl SearchEngine {
    /// Engine over an unbuilt index. Fails with `Configuration` on a bad config.
    pub fn new(config: SearchConfig) -> Result<Self, RiffleError> {
        config.validate()?;
        let active = config.active_fields();
        let scorer = FieldScorer::new(active.clone(), Matcher::new(config.matcher), config.field_norm);
        let summary_fields = config.summary_field_names();
        Ok(Self {
            indexer: Indexer::new(active),
            scorer,
            summary_fields,
            config,
        })
    }

    /// Engine with an initial snapshot already built
    pub fn with_records(config: SearchConfig, records: Vec<Record>) -> Result<Self, RiffleError> {
        let engine = Self::new(config)?;
        engine.rebuild(records);
        Ok(engine)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn rebuild(&self, records: Vec<Record>) -> IndexStats {
        self.indexer.rebuild(records)
    }

    pub fn iterate(&self) -> SnapshotRecords {
        self.indexer.iterate()
    }

    pub fn is_built(&self) -> bool {
        self.indexer.is_built()
    }

    pub fn num_records(&self) -> usize {
        self.indexer.num_records()
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResponse, RiffleError> {
        self.search_with_token(query, &CancellationToken::new())
    }

    /// Full search. Returns `Cancelled` if `token` fires while scoring.
    pub fn search_with_token(&self, query: &SearchQuery, token: &CancellationToken) -> Result<SearchResponse, RiffleError> {
        query.check()?;
        let text = query.text.trim();

        let ranked = match Pattern::new(text) {
            Some(pattern) => {
                let field_bound = self.config.matcher.max_distance;
                self.rank(&pattern, field_bound, query.threshold, query.limit, token)?
            }
            None => {
                tracing::debug!(chars = text.chars().count(), "query too long to match, no results");
                Vec::new()
            }
        };

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();
        let response = to_search_response(text, query.threshold, ranked, self.scorer.fields());
        #[cfg(feature = "perf-log")]
        tracing::debug!(format_ms = t0.elapsed().as_secs_f64() * 1000.0, "[perf] search formatted");

        Ok(response)
    }

    pub fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, RiffleError> {
        self.suggest_with_token(partial, limit, &CancellationToken::new())
    }

    /// Autocomplete: the search pipeline at the configured lenient threshold.
    /// Short partial input matches fields loosely, so the per-field bound is
    /// widened to the suggest threshold when that is the larger of the two.
    pub fn suggest_with_token(&self, partial: &str, limit: usize, token: &CancellationToken) -> Result<Vec<Suggestion>, RiffleError> {
        check_suggest_args(partial, limit)?;
        let Some(pattern) = Pattern::new(partial.trim()) else {
            return Ok(Vec::new());
        };
        let threshold = self.config.suggest_threshold;
        let field_bound = self.config.matcher.max_distance.max(threshold);
        let ranked = self.rank(&pattern, field_bound, threshold, limit, token)?;
        Ok(to_suggestions(ranked, &self.summary_fields))
    }

    /// Score, filter, order and truncate against the current snapshot.
    /// `field_bound` decides which fields count as matched; `threshold` only
    /// filters the resulting composites.
    fn rank(
        &self,
        pattern: &Pattern,
        field_bound: f64,
        threshold: f64,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<Vec<RankedMatch>, RiffleError> {
        // Hold the snapshot, not the lock: a rebuild may swap underneath us
        let Some(snapshot) = self.indexer.snapshot() else {
            return Ok(Vec::new());
        };
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let parallel = self
            .config
            .parallel_min_records
            .is_some_and(|min| snapshot.len() >= min);

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();
        let mut matches = if parallel {
            self.score_parallel(&snapshot, pattern, field_bound, threshold, token)
        } else {
            self.score_sequential(&snapshot, pattern, field_bound, threshold, token)
        };
        if token.is_cancelled() {
            return Err(RiffleError::Cancelled);
        }
        #[cfg(feature = "perf-log")]
        let t1 = std::time::Instant::now();

        let candidates = matches.len();
        matches.sort_by(compare_ranked);
        matches.truncate(limit);

        #[cfg(feature = "perf-log")]
        tracing::debug!(
            score_ms = (t1 - t0).as_secs_f64() * 1000.0,
            sort_ms = t1.elapsed().as_secs_f64() * 1000.0,
            parallel,
            "[perf] search ranked"
        );
        tracing::debug!(
            version = snapshot.version(),
            records = snapshot.len(),
            candidates,
            returned = matches.len(),
            threshold,
            "search complete"
        );

        Ok(matches)
    }

    fn score_sequential(
        &self,
        snapshot: &Snapshot,
        pattern: &Pattern,
        field_bound: f64,
        threshold: f64,
        token: &CancellationToken,
    ) -> Vec<RankedMatch> {
        let mut matches = Vec::new();
        for batch in snapshot.indexed().chunks(CANCEL_CHECK_BATCH) {
            if token.is_cancelled() {
                break;
            }
            matches.extend(batch.iter().filter_map(|r| self.score_one(r, pattern, field_bound, threshold)));
        }
        matches
    }

    fn score_parallel(
        &self,
        snapshot: &Snapshot,
        pattern: &Pattern,
        field_bound: f64,
        threshold: f64,
        token: &CancellationToken,
    ) -> Vec<RankedMatch> {
        use rayon::prelude::*;
        // Collection order is arbitrary; the caller sorts by (composite, position)
        snapshot
            .indexed()
            .par_iter()
            .take_any_while(|_| !token.is_cancelled())
            .filter_map(|r| self.score_one(r, pattern, field_bound, threshold))
            .collect()
    }

    fn score_one(&self, record: &IndexedRecord, pattern: &Pattern, field_bound: f64, threshold: f64) -> Option<RankedMatch> {
        let score = self.scorer.score(record, pattern, field_bound)?;
        if score.composite > threshold {
            return None;
        }
        Some(RankedMatch {
            position: record.position,
            record: record.record().clone(),
            score,
        })
    }
}
