//! Raw index response parsing
//!
//! Turns a `_search` response body into hits, a total and aggregation
//! buckets. An explicit `error` member is fatal; anything else that is
//! missing or oddly shaped reads as "nothing there".

use crate::db::search::{fields, query_builder::STATS_PREFIX};
use crate::models::EntityKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One hit, identified the way the database knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub kind: Option<EntityKind>,
    pub score: Option<f64>,
}

/// A bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub label: String,
    pub count: u64,
}

/// Summary of a numeric or date field over all matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStats {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: f64,
    pub min_as_string: Option<String>,
    pub max_as_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<Hit>,
    aggregations: Option<JsonValue>,
}

impl SearchResponse {
    /// Parse a response body.
    ///
    /// `indexes` maps index names to the entity kind they hold; it is used
    /// when a hit's source does not record its class.
    pub fn parse(body: &JsonValue, indexes: &[(String, EntityKind)]) -> Result<Self> {
        if body.get("error").is_some() {
            return Err(Error::index_payload(body));
        }

        let Some(hits) = body.get("hits") else {
            tracing::warn!("Index response has no hits; treating as empty");
            return Ok(Self::default());
        };

        let total = match hits.get("total") {
            Some(JsonValue::Number(n)) => n.as_u64().unwrap_or(0),
            Some(obj @ JsonValue::Object(_)) => obj
                .get("value")
                .and_then(JsonValue::as_u64)
                .unwrap_or(0),
            _ => 0,
        };

        let hits = hits
            .get("hits")
            .and_then(JsonValue::as_array)
            .map(|raw| raw.iter().filter_map(|h| parse_hit(h, indexes)).collect())
            .unwrap_or_default();

        Ok(Self {
            total,
            hits,
            aggregations: body.get("aggregations").cloned(),
        })
    }

    /// Buckets of the terms aggregation named after `field`.
    pub fn buckets(&self, field: &str) -> Vec<Bucket> {
        let Some(raw) = self
            .aggregations
            .as_ref()
            .and_then(|a| a.get(field))
            .and_then(|a| a.get("buckets"))
            .and_then(JsonValue::as_array)
        else {
            return Vec::new();
        };

        raw.iter()
            .filter_map(|b| {
                let key = scalar_string(b.get("key")?)?;
                let label = b
                    .get("key_as_string")
                    .and_then(scalar_string)
                    .unwrap_or_else(|| key.clone());
                let count = b.get("doc_count").and_then(JsonValue::as_u64).unwrap_or(0);
                Some(Bucket { key, label, count })
            })
            .collect()
    }

    /// Stats aggregation for `field`, if one was requested and returned.
    pub fn stats(&self, field: &str) -> Option<FieldStats> {
        let name = format!("{}{}", STATS_PREFIX, field);
        let raw = self.aggregations.as_ref()?.get(&name)?;
        match serde_json::from_value(raw.clone()) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(field, error = %e, "Unreadable stats aggregation");
                None
            }
        }
    }
}

fn parse_hit(hit: &JsonValue, indexes: &[(String, EntityKind)]) -> Option<Hit> {
    let source = hit.get("_source");
    let id = source
        .and_then(|s| s.get(fields::REPOSITORY_ID))
        .and_then(scalar_string)
        .or_else(|| hit.get("_id").and_then(scalar_string));
    let Some(id) = id else {
        tracing::warn!("Skipping index hit without an identifier");
        return None;
    };

    let kind = source
        .and_then(|s| s.get(fields::CLASS))
        .and_then(JsonValue::as_str)
        .and_then(EntityKind::parse)
        .or_else(|| {
            let index = hit.get("_index")?.as_str()?;
            indexes
                .iter()
                .find(|(name, _)| index.starts_with(name.as_str()))
                .map(|(_, kind)| *kind)
        });

    Some(Hit {
        id,
        kind,
        score: hit.get("_score").and_then(JsonValue::as_f64),
    })
}

fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
