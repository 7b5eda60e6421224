//! Search configuration
//!
//! Field weights, matcher tuning and engine knobs. Loaded from JSON or built
//! in code; validated once when the engine is constructed so a broken
//! configuration can never serve results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::interface::RiffleError;

/// Default fixed threshold for suggestions (lenient, for short partial input)
pub const DEFAULT_SUGGEST_THRESHOLD: f64 = 1.0;

/// Default per-field distance past which a field counts as unmatched
pub const DEFAULT_FIELD_MAX_DISTANCE: f64 = 0.6;

/// Default snapshot size at which scoring switches to rayon
pub const DEFAULT_PARALLEL_MIN_RECORDS: usize = 256;

/// A searchable field and its relative weight. Weights need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    pub weight: f64,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Tuning for the approximate matcher
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    /// Char position where a match is expected to start
    pub location: usize,
    /// How far from `location` a match may drift before its score reaches 1.0.
    /// 0 means only matches exactly at `location` are accepted.
    pub distance: usize,
    /// Ignore `location`/`distance`: score on errors alone
    pub ignore_location: bool,
    /// Scan the whole field instead of a window around `location`
    pub find_all_matches: bool,
    /// Shortest run of matched chars that becomes a span
    pub min_match_char_len: usize,
    /// Weight of the contiguous-run bonus, in [0, 1)
    pub run_bonus: f64,
    /// Largest distance at which a single field still counts as matched
    /// during search. Independent of the query threshold, so a record's
    /// composite is the same whatever threshold it is filtered at.
    pub max_distance: f64,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            location: 0,
            distance: 100,
            ignore_location: false,
            find_all_matches: true,
            min_match_char_len: 2,
            run_bonus: 0.1,
            max_distance: DEFAULT_FIELD_MAX_DISTANCE,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub matcher: MatcherOptions,
    #[serde(default = "default_suggest_threshold")]
    pub suggest_threshold: f64,
    /// Fields copied into suggestion summaries. Empty means every configured field.
    #[serde(default)]
    pub summary_fields: Vec<String>,
    /// Scale weights down for long fields (`1/sqrt(tokens)`)
    #[serde(default)]
    pub field_norm: bool,
    /// Score in parallel once a snapshot holds this many records. `None` disables.
    #[serde(default = "default_parallel_min_records")]
    pub parallel_min_records: Option<usize>,
}

fn default_suggest_threshold() -> f64 {
    DEFAULT_SUGGEST_THRESHOLD
}

fn default_parallel_min_records() -> Option<usize> {
    Some(DEFAULT_PARALLEL_MIN_RECORDS)
}

impl SearchConfig {
    /// Config over the given fields with default tuning
    pub fn new(fields: Vec<FieldConfig>) -> Self {
        Self {
            fields,
            matcher: MatcherOptions::default(),
            suggest_threshold: DEFAULT_SUGGEST_THRESHOLD,
            summary_fields: Vec::new(),
            field_norm: false,
            parallel_min_records: default_parallel_min_records(),
        }
    }

    /// The book catalog's weighting: title 0.5, author 0.3, genre 0.2
    pub fn books() -> Self {
        let mut config = Self::new(vec![
            FieldConfig::new("title", 0.5),
            FieldConfig::new("author", 0.3),
            FieldConfig::new("genre", 0.2),
        ]);
        config.summary_fields = vec!["title".into(), "author".into(), "genre".into()];
        config
    }

    pub fn from_json(json: &str) -> Result<Self, RiffleError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RiffleError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fields that take part in scoring: the configured ones with weight > 0
    pub(crate) fn active_fields(&self) -> Vec<FieldConfig> {
        self.fields.iter().filter(|f| f.weight > 0.0).cloned().collect()
    }

    /// Summary fields for suggestions, defaulting to every configured field
    pub(crate) fn summary_field_names(&self) -> Vec<String> {
        if self.summary_fields.is_empty() {
            self.fields.iter().map(|f| f.name.clone()).collect()
        } else {
            self.summary_fields.clone()
        }
    }

    pub fn validate(&self) -> Result<(), RiffleError> {
        if self.fields.is_empty() {
            return Err(RiffleError::Configuration("at least one field is required".into()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(RiffleError::Configuration("field names must not be empty".into()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(RiffleError::Configuration(format!("duplicate field '{}'", field.name)));
            }
            if !field.weight.is_finite() || field.weight < 0.0 {
                return Err(RiffleError::Configuration(format!(
                    "field '{}' has invalid weight {}",
                    field.name, field.weight
                )));
            }
        }
        if !self.fields.iter().any(|f| f.weight > 0.0) {
            return Err(RiffleError::Configuration("all field weights are zero".into()));
        }

        for name in &self.summary_fields {
            if !seen.contains(name.as_str()) {
                return Err(RiffleError::Configuration(format!(
                    "summary field '{}' is not a configured field",
                    name
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.suggest_threshold) {
            return Err(RiffleError::Configuration(format!(
                "suggest_threshold {} is outside [0, 1]",
                self.suggest_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.matcher.run_bonus) {
            return Err(RiffleError::Configuration(format!(
                "run_bonus {} is outside [0, 1)",
                self.matcher.run_bonus
            )));
        }
        if !(0.0..=1.0).contains(&self.matcher.max_distance) {
            return Err(RiffleError::Configuration(format!(
                "max_distance {} is outside [0, 1]",
                self.matcher.max_distance
            )));
        }
        if self.matcher.min_match_char_len == 0 {
            return Err(RiffleError::Configuration("min_match_char_len must be at least 1".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_books_config_is_valid() {
        let config = SearchConfig::books();
        assert!(config.validate().is_ok());
        assert_eq!(config.active_fields().len(), 3);
        assert_eq!(config.summary_field_names(), vec!["title", "author", "genre"]);
    }

    #[test]
    fn test_no_fields_rejected() {
        let err = SearchConfig::new(Vec::new()).validate().unwrap_err();
        assert!(matches!(err, RiffleError::Configuration(_)));
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let config = SearchConfig::new(vec![FieldConfig::new("title", 0.0), FieldConfig::new("author", 0.0)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("zero"));
    }

    #[test]
    fn test_zero_weight_field_is_inactive() {
        let config = SearchConfig::new(vec![FieldConfig::new("title", 1.0), FieldConfig::new("isbn", 0.0)]);
        assert!(config.validate().is_ok());
        let active = config.active_fields();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "title");
        // Inactive fields still show up in summaries
        assert_eq!(config.summary_field_names(), vec!["title", "isbn"]);
    }

    #[test]
    fn test_bad_weights_rejected() {
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            let config = SearchConfig::new(vec![FieldConfig::new("title", weight)]);
            assert!(config.validate().is_err(), "weight {} should be rejected", weight);
        }
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let config = SearchConfig::new(vec![FieldConfig::new("title", 1.0), FieldConfig::new("title", 0.5)]);
        assert!(config.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_unknown_summary_field_rejected() {
        let mut config = SearchConfig::books();
        config.summary_fields.push("isbn".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_matcher_option_ranges() {
        let mut config = SearchConfig::books();
        config.matcher.run_bonus = 1.0;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::books();
        config.suggest_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::books();
        config.matcher.min_match_char_len = 0;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::books();
        config.matcher.max_distance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = SearchConfig::from_json(
            r#"{"fields": [{"name": "title", "weight": 2}, {"name": "author", "weight": 1}],
                "matcher": {"distance": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.matcher.distance, 50);
        assert_eq!(config.matcher.min_match_char_len, 2);
        assert_eq!(config.suggest_threshold, 1.0);
        assert_eq!(config.matcher.max_distance, DEFAULT_FIELD_MAX_DISTANCE);
        assert_eq!(config.parallel_min_records, Some(DEFAULT_PARALLEL_MIN_RECORDS));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(SearchConfig::from_json("not json").is_err());
        assert!(SearchConfig::from_json(r#"{"fields": []}"#).is_err());
    }
}
