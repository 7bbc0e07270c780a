//! Search index test doubles
//!
//! - [`RecordingIndex`] replays a canned response and counts calls.
//! - [`MemoryIndex`] evaluates query documents against in-memory
//!   documents, enough of the query DSL to check inclusion semantics.

use async_trait::async_trait;
use kumquat_index_client::{Error, Result, SearchIndex};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Reply {
    Body(Value),
    /// Rebuilt per call; index errors are not `Clone`.
    Fail { status: u16, body: Value },
}

/// Replays one canned search response and records every call.
pub struct RecordingIndex {
    reply: Reply,
    suggestions: Option<Vec<String>>,
    searches: AtomicUsize,
    suggests: AtomicUsize,
    queries: Mutex<Vec<(String, Value)>>,
}

impl RecordingIndex {
    pub fn returning(body: Value) -> Self {
        Self::with_reply(Reply::Body(body))
    }

    pub fn failing(status: u16, error_type: &str, reason: &str) -> Self {
        Self::with_reply(Reply::Fail {
            status,
            body: json!({
                "error": {
                    "root_cause": [{"type": error_type, "reason": reason}],
                    "type": error_type,
                    "reason": reason
                },
                "status": status
            }),
        })
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            suggestions: Some(Vec::new()),
            searches: AtomicUsize::new(0),
            suggests: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = Some(suggestions.into_iter().map(Into::into).collect());
        self
    }

    /// Make suggestion requests fail.
    pub fn with_failing_suggestions(mut self) -> Self {
        self.suggestions = None;
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn suggests(&self) -> usize {
        self.suggests.load(Ordering::SeqCst)
    }

    /// Index names and query documents of all searches, oldest first.
    pub fn queries(&self) -> Vec<(String, Value)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<Value> {
        self.queries.lock().unwrap().last().map(|(_, q)| q.clone())
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    async fn search(&self, index: &str, query: &Value) -> Result<Value> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((index.to_string(), query.clone()));
        match &self.reply {
            Reply::Body(body) => Ok(body.clone()),
            Reply::Fail { status, body } => Err(Error::from_body(Some(*status), body)),
        }
    }

    async fn suggest(&self, index: &str, _field: &str, _text: &str) -> Result<Vec<String>> {
        self.suggests.fetch_add(1, Ordering::SeqCst);
        match &self.suggestions {
            Some(s) => Ok(s.clone()),
            None => Err(Error::from_body(
                Some(404),
                &json!({"error": format!("no such index [{}]", index)}),
            )),
        }
    }
}

/// Evaluates query documents against stored JSON documents.
///
/// Supports `bool`, `term`, `terms`, `range` (gte/lte), `exists`,
/// `match_all`, `query_string` (all tokens must appear in the default
/// field), `function_score` (inner query only), field sorts and from/size.
pub struct MemoryIndex {
    docs: Vec<(String, Value)>,
    searches: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            docs: Vec::new(),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn with_doc(mut self, index: &str, source: Value) -> Self {
        self.docs.push((index.to_string(), source));
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn search(&self, index: &str, query: &Value) -> Result<Value> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let names: Vec<&str> = index.split(',').map(str::trim).collect();

        let mut matched: Vec<&(String, Value)> = self
            .docs
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .filter(|(_, doc)| matches(&query["query"], doc))
            .collect();

        if let Some(keys) = query["sort"].as_array() {
            for key in keys.iter().rev() {
                let Some((field, order)) = key.as_object().and_then(|o| o.iter().next()) else {
                    continue;
                };
                if field == "_score" {
                    continue;
                }
                let desc = order["order"] == "desc";
                matched.sort_by(|(_, a), (_, b)| {
                    let ord = sort_value(&a[field]).cmp(&sort_value(&b[field]));
                    if desc {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
        }

        let total = matched.len();
        let from = query["from"].as_u64().unwrap_or(0) as usize;
        let size = query["size"].as_u64().unwrap_or(10) as usize;
        let hits: Vec<Value> = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(name, doc)| {
                json!({
                    "_index": name,
                    "_id": doc["repository_id"],
                    "_score": 1.0,
                    "_source": doc
                })
            })
            .collect();

        Ok(json!({
            "took": 1,
            "timed_out": false,
            "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}
        }))
    }

    async fn suggest(&self, _index: &str, _field: &str, _text: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn sort_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn values_of<'a>(doc: &'a Value, field: &str) -> Vec<&'a Value> {
    match doc.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v) => vec![v],
    }
}

fn single_entry(obj: &Value) -> Option<(&String, &Value)> {
    obj.as_object().and_then(|m| m.iter().next())
}

fn matches(query: &Value, doc: &Value) -> bool {
    let Some((kind, body)) = single_entry(query) else {
        return true;
    };
    match kind.as_str() {
        "match_all" => true,
        "term" => single_entry(body)
            .map(|(field, value)| values_of(doc, field).contains(&value))
            .unwrap_or(false),
        "terms" => single_entry(body)
            .and_then(|(field, values)| Some((field, values.as_array()?)))
            .map(|(field, values)| {
                values_of(doc, field)
                    .iter()
                    .any(|v| values.contains(v))
            })
            .unwrap_or(false),
        "range" => single_entry(body)
            .map(|(field, bounds)| {
                values_of(doc, field).iter().any(|v| {
                    let Some(n) = v.as_f64() else { return false };
                    bounds["gte"].as_f64().map_or(true, |b| n >= b)
                        && bounds["lte"].as_f64().map_or(true, |b| n <= b)
                })
            })
            .unwrap_or(false),
        "exists" => body["field"]
            .as_str()
            .map(|field| !values_of(doc, field).is_empty())
            .unwrap_or(false),
        "query_string" => {
            let field = body["default_field"].as_str().unwrap_or("search_all");
            let haystack: String = values_of(doc, field)
                .iter()
                .map(|v| sort_value(v))
                .collect::<Vec<_>>()
                .join(" ");
            body["query"]
                .as_str()
                .unwrap_or("")
                .split_whitespace()
                .map(|t| t.replace('\\', "").to_lowercase())
                .all(|token| haystack.contains(&token))
        }
        "function_score" => matches(&body["query"], doc),
        "bool" => matches_bool(body.as_object().cloned().unwrap_or_default(), doc),
        _ => false,
    }
}

fn matches_bool(b: Map<String, Value>, doc: &Value) -> bool {
    let section = |name: &str| -> Vec<Value> {
        b.get(name)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let must = section("must");
    let filter = section("filter");
    let should = section("should");
    let must_not = section("must_not");

    if !must.iter().chain(filter.iter()).all(|q| matches(q, doc)) {
        return false;
    }
    if must_not.iter().any(|q| matches(q, doc)) {
        return false;
    }

    let required_should = match b.get("minimum_should_match").and_then(Value::as_u64) {
        Some(n) => n as usize,
        // Without must/filter clauses at least one should clause has to match.
        None if must.is_empty() && filter.is_empty() && !should.is_empty() => 1,
        None => 0,
    };
    should.iter().filter(|q| matches(q, doc)).count() >= required_should
}
