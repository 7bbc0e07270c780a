//! Typed query DSL clauses and their wire rendering.

use serde_json::{json, Map, Value as JsonValue};

use crate::db::search::params::SortDirection;

/// Field used as the per-document source of randomness for random sorting.
const RANDOM_SCORE_FIELD: &str = "_seq_no";

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    Term {
        field: String,
        value: JsonValue,
    },
    Terms {
        field: String,
        values: Vec<JsonValue>,
    },
    /// Inclusive bounds.
    Range {
        field: String,
        gte: Option<JsonValue>,
        lte: Option<JsonValue>,
    },
    Exists {
        field: String,
    },
    /// `query_string` with AND as default operator and lenient parsing.
    QueryString {
        query: String,
        default_field: String,
    },
    Bool(BoolQuery),
    /// Replaces the score of every match with a seeded random value.
    RandomScore {
        query: Box<Clause>,
        seed: u64,
    },
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    pub fn lte(field: impl Into<String>, bound: impl Into<JsonValue>) -> Self {
        Self::Range {
            field: field.into(),
            gte: None,
            lte: Some(bound.into()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Term { field, value } => json!({ "term": keyed(field, value.clone()) }),
            Self::Terms { field, values } => {
                json!({ "terms": keyed(field, JsonValue::Array(values.clone())) })
            }
            Self::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), gte.clone());
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), lte.clone());
                }
                json!({ "range": keyed(field, JsonValue::Object(bounds)) })
            }
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::QueryString {
                query,
                default_field,
            } => json!({
                "query_string": {
                    "query": query,
                    "default_field": default_field,
                    "default_operator": "AND",
                    "lenient": true
                }
            }),
            Self::Bool(b) => json!({ "bool": b.to_json() }),
            Self::RandomScore { query, seed } => json!({
                "function_score": {
                    "query": query.to_json(),
                    "random_score": { "seed": seed, "field": RANDOM_SCORE_FIELD },
                    "boost_mode": "replace"
                }
            }),
        }
    }
}

fn keyed(key: &str, value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    JsonValue::Object(map)
}

/// A `bool` query. Empty sections are omitted from the wire form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }

    /// Any-of disjunction usable in a non-scoring context.
    pub fn any_of(clauses: Vec<Clause>) -> Self {
        Self {
            should: clauses,
            minimum_should_match: Some(1),
            ..Self::default()
        }
    }

    /// Wrap as a clause; an empty bool becomes `match_all`.
    pub fn into_clause(self) -> Clause {
        if self.is_empty() {
            Clause::MatchAll
        } else {
            Clause::Bool(self)
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (name, section) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !section.is_empty() {
                map.insert(
                    name.to_string(),
                    JsonValue::Array(section.iter().map(Clause::to_json).collect()),
                );
            }
        }
        if let Some(n) = self.minimum_should_match {
            map.insert("minimum_should_match".to_string(), json!(n));
        }
        JsonValue::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Bucketed term counts, named after the field.
    Terms { field: String, size: usize },
    /// min/max/avg/sum/count of a numeric or date field.
    Stats { field: String },
}

/// Prefix of stats aggregation names, keeping them apart from facet names.
pub const STATS_PREFIX: &str = "stats:";

impl Aggregation {
    pub fn name(&self) -> String {
        match self {
            Self::Terms { field, .. } => field.clone(),
            Self::Stats { field } => format!("{}{}", STATS_PREFIX, field),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Terms { field, size } => json!({ "terms": { "field": field, "size": size } }),
            Self::Stats { field } => json!({ "stats": { "field": field } }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Field {
        field: String,
        direction: SortDirection,
    },
    /// Relevance (or the random score under a random sort), best first.
    Score,
}

impl SortKey {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Field { field, direction } => {
                keyed(field, json!({ "order": direction.as_str() }))
            }
            Self::Score => json!({ "_score": { "order": "desc" } }),
        }
    }
}
