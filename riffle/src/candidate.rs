//! Indexed record with precomputed per-field match data.
//!
//! Module isolation ensures no code outside this module can mutate a field's
//! text after construction, so the folded chars, the bloom and the `OnceLock`
//! norm can never go stale.

use std::sync::{Arc, OnceLock};

use crate::config::FieldConfig;
use crate::matcher::{char_bloom, fold_chars};
use crate::models::Record;

/// One configured field of a record, folded once at index time
#[derive(Debug, Clone)]
pub(crate) struct IndexedField {
    folded: Vec<char>,
    bloom: u64,
    norm: OnceLock<f64>,
}

impl IndexedField {
    fn new(text: &str) -> Self {
        let folded = fold_chars(text);
        let bloom = char_bloom(&folded);
        Self {
            folded,
            bloom,
            norm: OnceLock::new(),
        }
    }

    pub(crate) fn folded(&self) -> &[char] {
        &self.folded
    }

    pub(crate) fn bloom(&self) -> u64 {
        self.bloom
    }

    /// Field-length norm `1/sqrt(tokens)`, rounded to 3 decimals.
    /// Computed on first access; only used when `field_norm` is on.
    pub(crate) fn norm(&self) -> f64 {
        *self.norm.get_or_init(|| {
            let tokens = self
                .folded
                .split(|c| c.is_whitespace())
                .filter(|t| !t.is_empty())
                .count()
                .max(1);
            ((1.0 / (tokens as f64).sqrt()) * 1000.0).round() / 1000.0
        })
    }
}

/// A record in a snapshot, with fields aligned to the active field configs.
/// `None` marks a missing or blank field, which is never scored.
#[derive(Debug, Clone)]
pub(crate) struct IndexedRecord {
    pub(crate) position: usize,
    record: Arc<Record>,
    fields: Vec<Option<IndexedField>>,
}

impl IndexedRecord {
    pub(crate) fn new(position: usize, record: Arc<Record>, active_fields: &[FieldConfig]) -> Self {
        let fields = active_fields
            .iter()
            .map(|f| {
                record
                    .field(&f.name)
                    .filter(|text| !text.trim().is_empty())
                    .map(IndexedField::new)
            })
            .collect();
        Self {
            position,
            record,
            fields,
        }
    }

    pub(crate) fn record(&self) -> &Arc<Record> {
        &self.record
    }

    pub(crate) fn fields(&self) -> &[Option<IndexedField>] {
        &self.fields
    }
}
