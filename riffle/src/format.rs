//! Result formatting
//!
//! Pure mappings from ranked matches to the shapes handed to callers. No
//! filtering or reordering happens here.

use std::collections::BTreeMap;

use crate::config::FieldConfig;
use crate::interface::{MatchSpan, SearchHit, SearchResponse, SpanRange, Suggestion};
use crate::ranking::RankedMatch;

/// Build a search response. `fields` are the active field configs the scores index into.
pub(crate) fn to_search_response(
    query: &str,
    threshold: f64,
    ranked: Vec<RankedMatch>,
    fields: &[FieldConfig],
) -> SearchResponse {
    let results: Vec<SearchHit> = ranked.into_iter().map(|m| to_hit(m, fields)).collect();
    SearchResponse {
        query: query.to_string(),
        total: results.len(),
        results,
        threshold,
    }
}

fn to_hit(ranked: RankedMatch, fields: &[FieldConfig]) -> SearchHit {
    let matches = ranked
        .score
        .fields
        .iter()
        .filter_map(|fs| {
            let name = &fields.get(fs.field)?.name;
            Some(MatchSpan {
                field: name.clone(),
                matched_text: ranked.record.field(name).unwrap_or_default().to_string(),
                ranges: fs
                    .ranges
                    .iter()
                    .map(|r| SpanRange { start: r.start, end: r.end })
                    .collect(),
            })
        })
        .collect();

    SearchHit {
        score: ranked.score.composite,
        record: ranked.record,
        matches,
    }
}

/// Suggestions carry only the summary fields a record actually has
pub(crate) fn to_suggestions(ranked: Vec<RankedMatch>, summary_fields: &[String]) -> Vec<Suggestion> {
    ranked
        .into_iter()
        .map(|m| {
            let summary: BTreeMap<String, String> = summary_fields
                .iter()
                .filter_map(|name| Some((name.clone(), m.record.field(name)?.to_string())))
                .collect();
            Suggestion {
                record_id: m.record.id.clone(),
                summary,
                score: m.score.composite,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Record;
    use crate::ranking::{FieldScore, RecordScore};

    fn fields() -> Vec<FieldConfig> {
        vec![FieldConfig::new("title", 0.5), FieldConfig::new("author", 0.3)]
    }

    fn ranked() -> RankedMatch {
        let record = Record::new("7")
            .with_field("title", "Animal Farm")
            .with_field("author", "George Orwell")
            .with_field("isbn", "978-0-452-28424-1");
        RankedMatch {
            position: 0,
            record: Arc::new(record),
            score: RecordScore {
                composite: 0.12,
                fields: vec![FieldScore { field: 1, distance: 0.12, ranges: vec![7..13] }],
            },
        }
    }

    #[test]
    fn test_search_response_shape() {
        let response = to_search_response("orwell", 0.3, vec![ranked()], &fields());
        assert_eq!(response.query, "orwell");
        assert_eq!(response.total, 1);
        assert_eq!(response.threshold, 0.3);

        let hit = &response.results[0];
        assert_eq!(hit.record.id, "7");
        assert_eq!(hit.score, 0.12);
        assert_eq!(
            hit.matches,
            vec![MatchSpan {
                field: "author".into(),
                matched_text: "George Orwell".into(),
                ranges: vec![SpanRange { start: 7, end: 13 }],
            }]
        );
    }

    #[test]
    fn test_record_is_shared_not_copied() {
        let m = ranked();
        let record = m.record.clone();
        let response = to_search_response("orwell", 0.3, vec![m], &fields());
        assert!(Arc::ptr_eq(&record, &response.results[0].record));
    }

    #[test]
    fn test_suggestion_summary() {
        let summary_fields = vec!["title".to_string(), "author".to_string(), "genre".to_string()];
        let suggestions = to_suggestions(vec![ranked()], &summary_fields);
        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.record_id, "7");
        assert_eq!(s.score, 0.12);
        assert_eq!(s.summary.len(), 2, "missing genre is omitted");
        assert_eq!(s.summary["title"], "Animal Farm");
        assert!(!s.summary.contains_key("isbn"));
    }

    #[test]
    fn test_empty_input() {
        let response = to_search_response("x", 0.3, Vec::new(), &fields());
        assert!(response.results.is_empty());
        assert_eq!(response.total, 0);
        assert!(to_suggestions(Vec::new(), &[]).is_empty());
    }

    #[test]
    fn test_serializes_to_json() {
        let response = to_search_response("orwell", 0.3, vec![ranked()], &fields());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][0]["record"]["id"], "7");
        assert_eq!(json["results"][0]["matches"][0]["ranges"][0]["end"], 13);
    }
}
