//! Request and response shapes that are specific to the Elasticsearch wire format

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Name of the suggester entry inside suggestion requests.
pub const SUGGESTER_NAME: &str = "corrections";

/// One row of `GET /_cat/indices?format=json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
}

/// Build a term-suggester request for `text` against `field`.
///
/// `size: 0` keeps hits out of the response; only the `suggest` section is
/// of interest.
pub fn suggest_request(field: &str, text: &str) -> JsonValue {
    json!({
        "size": 0,
        "suggest": {
            "text": text,
            SUGGESTER_NAME: {
                "term": {
                    "field": field,
                    "suggest_mode": "missing",
                    "sort": "score"
                }
            }
        }
    })
}

/// Extract suggested terms from a term-suggester response.
///
/// Each token of the input text gets its own entry with zero or more
/// options. Options are collected in entry order, duplicates dropped.
pub fn parse_suggestions(body: &JsonValue) -> Vec<String> {
    let entries = body
        .get("suggest")
        .and_then(|s| s.get(SUGGESTER_NAME))
        .and_then(|s| s.as_array());

    let mut out: Vec<String> = Vec::new();
    for entry in entries.into_iter().flatten() {
        let options = entry.get("options").and_then(|o| o.as_array());
        for option in options.into_iter().flatten() {
            if let Some(text) = option.get("text").and_then(|t| t.as_str()) {
                if !out.iter().any(|existing| existing == text) {
                    out.push(text.to_string());
                }
            }
        }
    }
    out
}
