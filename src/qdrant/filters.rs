//! Filter helpers for Qdrant search and lookup queries.

use serde_json::{Value, json};

use super::types::SearchFilterArgs;

/// Compose the equality filter for grouped search from optional arguments.
pub fn build_search_filter(args: &SearchFilterArgs) -> Option<Value> {
    let mut must: Vec<Value> = Vec::new();

    if let Some(reference) = args.reference.as_ref().and_then(|value| non_empty(value)) {
        must.push(json!({
            "key": "reference",
            "match": { "value": reference }
        }));
    }

    if let Some(page) = args.page {
        must.push(json!({
            "key": "page",
            "match": { "value": page }
        }));
    }

    if let Some(dates) = args.dates.as_ref() {
        let cleaned: Vec<String> = dates
            .iter()
            .filter_map(|date| non_empty(date).map(|value| value.to_string()))
            .collect();
        match cleaned.len() {
            0 => {}
            1 => must.push(json!({
                "key": "date",
                "match": { "value": cleaned[0] }
            })),
            _ => must.push(json!({
                "key": "date",
                "match": { "any": cleaned }
            })),
        }
    }

    if must.is_empty() {
        None
    } else {
        Some(json!({ "must": must }))
    }
}

/// OR of `(reference == r AND page == p)` clauses, one per pair.
pub fn reference_page_filter(pairs: &[(String, u32)]) -> Option<Value> {
    let should: Vec<Value> = pairs
        .iter()
        .filter_map(|(reference, page)| {
            non_empty(reference).map(|reference| {
                json!({
                    "must": [
                        { "key": "reference", "match": { "value": reference } },
                        { "key": "page", "match": { "value": page } }
                    ]
                })
            })
        })
        .collect();

    if should.is_empty() {
        None
    } else {
        Some(json!({ "should": should }))
    }
}

/// Hits kept per reference group unless the caller asks otherwise.
pub const DEFAULT_GROUP_SIZE: usize = 4;

/// Number of groups requested for a search over `bin_size` bins; never fewer than 10.
pub fn grouped_search_limit(bin_size: usize) -> usize {
    30usize.saturating_sub(bin_size.saturating_mul(5)).max(10)
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
