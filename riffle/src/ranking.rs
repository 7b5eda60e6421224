//! Field scoring and result ordering.
//!
//! A record's composite distance is the weighted average of the distances of
//! the fields that matched, with weights renormalised over that subset. A
//! record that matches only its genre therefore scores exactly its genre
//! distance instead of being diluted by implicit misses on title and author.
//!
//! Whether a field matched is decided against a fixed per-field bound, never
//! the query threshold: the composite is a property of the record and the
//! query alone, and the threshold only filters it afterwards.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use crate::candidate::IndexedRecord;
use crate::config::FieldConfig;
use crate::matcher::{Matcher, Pattern};
use crate::models::Record;

/// Per-field outcome for one record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldScore {
    /// Index into the active field configs
    pub field: usize,
    pub distance: f64,
    pub ranges: Vec<Range<usize>>,
}

/// Combined outcome for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordScore {
    pub composite: f64,
    /// Matched fields only, in configuration order
    pub fields: Vec<FieldScore>,
}

/// A scored record with its position in the snapshot, for tie-breaking
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub position: usize,
    pub record: Arc<Record>,
    pub score: RecordScore,
}

/// Weights the matcher's per-field distances into one composite
#[derive(Debug, Clone)]
pub struct FieldScorer {
    fields: Vec<FieldConfig>,
    matcher: Matcher,
    field_norm: bool,
}

impl FieldScorer {
    /// `fields` must be the active (weight > 0) field configs the index was built with
    pub fn new(fields: Vec<FieldConfig>, matcher: Matcher, field_norm: bool) -> Self {
        Self {
            fields,
            matcher,
            field_norm,
        }
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    /// Score one record. `None` when no configured field matches within `max_distance`.
    pub(crate) fn score(&self, record: &IndexedRecord, pattern: &Pattern, max_distance: f64) -> Option<RecordScore> {
        let mut matched: Vec<FieldScore> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();

        for (i, (config, field)) in self.fields.iter().zip(record.fields()).enumerate() {
            let Some(field) = field else { continue };
            if !pattern.may_match(field.bloom()) {
                continue;
            }
            let Some(m) = self.matcher.find_folded(pattern, field.folded(), max_distance) else {
                continue;
            };

            let weight = if self.field_norm {
                config.weight * field.norm()
            } else {
                config.weight
            };
            weights.push(weight);
            matched.push(FieldScore {
                field: i,
                distance: m.distance,
                ranges: m.ranges,
            });
        }

        if matched.is_empty() {
            return None;
        }

        let distances: Vec<f64> = matched.iter().map(|f| f.distance).collect();
        let composite = renormalized_average(&distances, &weights);
        Some(RecordScore {
            composite,
            fields: matched,
        })
    }
}

/// Weighted average over the matched subset.
/// Clamped to the matched distances' range so rounding can't push it past
/// the threshold every input was already under.
pub(crate) fn renormalized_average(distances: &[f64], weights: &[f64]) -> f64 {
    if distances.len() == 1 {
        return distances[0];
    }

    let total_weight: f64 = weights.iter().sum();
    let lo = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if total_weight <= 0.0 {
        return hi;
    }

    let weighted: f64 = distances.iter().zip(weights).map(|(d, w)| d * w).sum();
    (weighted / total_weight).clamp(lo, hi)
}

/// Ascending composite distance, ties in snapshot order
pub(crate) fn compare_ranked(a: &RankedMatch, b: &RankedMatch) -> Ordering {
    a.score
        .composite
        .total_cmp(&b.score.composite)
        .then_with(|| a.position.cmp(&b.position))
}
