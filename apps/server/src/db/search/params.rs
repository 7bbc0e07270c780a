//! Query specification
//!
//! A `QuerySpec` holds a caller's declarative search intent before any
//! index-specific translation:
//! - Free-text query, optionally targeted at one field
//! - Programmatic filters and facet filters (both narrow results identically)
//! - Exclusions, sort order, pagination window
//! - Visibility flags and the caller's roles
//!
//! Every setter consumes the spec and returns the updated value, so a spec
//! can be shared freely without one holder's changes leaking into another's.
//! Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;

/// Default hard ceiling on `limit` (Elasticsearch's default `max_result_window`).
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Page size used until a caller sets one.
pub const DEFAULT_LIMIT: usize = 40;

/// Free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuery {
    /// Target field; `None` searches the composite search-all field.
    pub field: Option<String>,
    pub text: String,
}

/// Value side of an exact-match filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Matches if the field holds any of the values.
    Any(Vec<JsonValue>),
    One(JsonValue),
}

impl FilterValue {
    pub fn values(&self) -> Vec<&JsonValue> {
        match self {
            Self::Any(values) => values.iter().collect(),
            Self::One(value) => vec![value],
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::One(JsonValue::from(value))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::One(JsonValue::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::One(JsonValue::from(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::One(JsonValue::from(value))
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Any(values.into_iter().map(JsonValue::from).collect())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Any(values.into_iter().map(JsonValue::from).collect())
    }
}

impl From<&[&str]> for FilterValue {
    fn from(values: &[&str]) -> Self {
        Self::Any(values.iter().map(|v| JsonValue::from(*v)).collect())
    }
}

/// An exact-match clause on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub value: FilterValue,
}

/// A facet selection, e.g. from an `fq=facet_subject:Maps` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFilter {
    pub field: String,
    pub term: String,
}

impl FacetFilter {
    /// Parse `field:term`. The term may itself contain colons.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, term) = raw.split_once(':')?;
        let field = field.trim();
        if field.is_empty() || term.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            term: term.to_string(),
        })
    }
}

impl fmt::Display for FacetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.term)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum SortOrder {
    Field {
        field: String,
        direction: SortDirection,
    },
    /// Randomized ordering. The seed is drawn when the order is created, so
    /// each request shuffles differently while compilation stays pure.
    /// Always within the index's `long` range.
    Random { seed: u64 },
}

/// Random seeds are sent as JSON numbers and must fit a signed 64-bit long.
const SEED_MASK: u64 = i64::MAX as u64;

impl SortOrder {
    pub fn field(field: impl Into<String>, direction: SortDirection) -> Self {
        Self::Field {
            field: field.into(),
            direction,
        }
    }

    pub fn random() -> Self {
        // The low half of a v4 UUID carries the variant bits in its top
        // position; the high half does not.
        Self::random_with_seed((uuid::Uuid::new_v4().as_u128() >> 64) as u64)
    }

    pub fn random_with_seed(seed: u64) -> Self {
        Self::Random {
            seed: seed & SEED_MASK,
        }
    }

    /// Parse `random`, `random:<seed>`, `field`, or `field:asc|desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.eq_ignore_ascii_case("random") {
            return Some(Self::random());
        }
        if let Some((head, seed)) = raw.split_once(':') {
            if head.eq_ignore_ascii_case("random") {
                return seed.trim().parse().ok().map(Self::random_with_seed);
            }
        }
        match raw.rsplit_once(':') {
            Some((field, dir)) if !field.is_empty() => {
                SortDirection::parse(dir).map(|direction| Self::field(field, direction))
            }
            Some(_) => None,
            None => Some(Self::field(raw, SortDirection::Asc)),
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random { .. })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { field, direction } => write!(f, "{}:{}", field, direction.as_str()),
            Self::Random { seed } => write!(f, "random:{}", seed),
        }
    }
}

/// Declarative description of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub query: Option<TextQuery>,
    /// Programmatic filters; repeated entries AND together.
    pub filters: Vec<FilterClause>,
    /// Facet selections; compiled alongside `filters`.
    pub facet_filters: Vec<FacetFilter>,
    /// Entities matching any of these are excluded.
    pub exclusions: Vec<FilterClause>,
    pub sort: Vec<SortOrder>,
    pub start: usize,
    pub limit: usize,
    pub max_result_window: usize,
    /// Restrict results to children of this parent entity.
    pub parent: Option<String>,
    pub include_unpublished: bool,
    /// Let child entities (pages, files, sub-collections) appear in results.
    pub include_children: bool,
    /// Search within child entities as well as top-level ones.
    pub search_children: bool,
    pub aggregations: bool,
    pub stats: bool,
    /// Roles held by the caller; empty for anonymous callers.
    pub user_roles: BTreeSet<String>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            query: None,
            filters: Vec::new(),
            facet_filters: Vec::new(),
            exclusions: Vec::new(),
            sort: Vec::new(),
            start: 0,
            limit: DEFAULT_LIMIT,
            max_result_window: MAX_RESULT_WINDOW,
            parent: None,
            include_unpublished: false,
            include_children: false,
            search_children: false,
            aggregations: false,
            stats: false,
            user_roles: BTreeSet::new(),
        }
    }
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search the composite search-all field. Blank text clears the query.
    pub fn query(self, text: impl Into<String>) -> Self {
        self.text_query(None, text.into())
    }

    /// Search one field. Blank text clears the query.
    pub fn query_field(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.text_query(Some(field.into()), text.into())
    }

    fn text_query(mut self, field: Option<String>, text: String) -> Self {
        let text = text.trim();
        self.query = if text.is_empty() {
            None
        } else {
            Some(TextQuery {
                field: field.filter(|f| !f.trim().is_empty()),
                text: text.to_string(),
            })
        };
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.push(FilterClause {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn facet_filter(mut self, field: impl Into<String>, term: impl Into<String>) -> Self {
        self.facet_filters.push(FacetFilter {
            field: field.into(),
            term: term.into(),
        });
        self
    }

    /// Add facet selections in `field:term` form; malformed entries are skipped.
    pub fn facet_filters<I, S>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in raw {
            match FacetFilter::parse(entry.as_ref()) {
                Some(ff) => self.facet_filters.push(ff),
                None => tracing::debug!(entry = entry.as_ref(), "Ignoring malformed facet filter"),
            }
        }
        self
    }

    pub fn exclude(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.exclusions.push(FilterClause {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Append a sort key. Earlier keys take precedence.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    pub fn order_by(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order(SortOrder::field(field, direction))
    }

    pub fn random_order(self) -> Self {
        self.order(SortOrder::random())
    }

    pub fn clear_order(mut self) -> Self {
        self.sort.clear();
        self
    }

    /// Negative offsets clamp to 0.
    pub fn start(mut self, start: i64) -> Self {
        self.start = usize::try_from(start).unwrap_or(0);
        self
    }

    /// Clamped to `[0, max_result_window]`.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = usize::try_from(limit)
            .unwrap_or(0)
            .min(self.max_result_window);
        self
    }

    pub fn pagination(self, start: i64, limit: i64) -> Self {
        self.start(start).limit(limit)
    }

    /// Change the ceiling on `limit`, re-clamping the current limit.
    pub fn max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = window;
        self.limit = self.limit.min(window);
        self
    }

    pub fn parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn include_unpublished(mut self, include: bool) -> Self {
        self.include_unpublished = include;
        self
    }

    pub fn include_children(mut self, include: bool) -> Self {
        self.include_children = include;
        self
    }

    pub fn search_children(mut self, search: bool) -> Self {
        self.search_children = search;
        self
    }

    pub fn aggregations(mut self, enabled: bool) -> Self {
        self.aggregations = enabled;
        self
    }

    pub fn stats(mut self, enabled: bool) -> Self {
        self.stats = enabled;
        self
    }

    pub fn user_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_roles = roles
            .into_iter()
            .map(Into::into)
            .filter(|r: &String| !r.trim().is_empty())
            .collect();
        self
    }

    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// 1-based page number of the current window.
    pub fn page(&self) -> usize {
        if self.limit == 0 {
            1
        } else {
            self.start / self.limit + 1
        }
    }

    /// Whether entities with a parent are kept out of the results.
    pub fn top_level_only(&self) -> bool {
        !self.search_children && !self.include_children
    }

    /// Serialize the caller-facing part of the spec as ordered query items.
    ///
    /// Only what a user can legitimately put in a URL is written: query,
    /// facet selections, sort and window. Roles, visibility flags and
    /// programmatic filters are server-side decisions and are re-applied by
    /// whoever rebuilds the finder.
    pub fn to_items(&self) -> Vec<(String, String)> {
        let mut items = Vec::new();
        if let Some(q) = &self.query {
            items.push(("q".to_string(), q.text.clone()));
            if let Some(field) = &q.field {
                items.push(("field".to_string(), field.clone()));
            }
        }
        for ff in &self.facet_filters {
            items.push(("fq".to_string(), ff.to_string()));
        }
        if !self.sort.is_empty() {
            let sort: Vec<String> = self.sort.iter().map(|s| s.to_string()).collect();
            items.push(("sort".to_string(), sort.join(",")));
        }
        items.push(("start".to_string(), self.start.to_string()));
        items.push(("limit".to_string(), self.limit.to_string()));
        items
    }

    /// Apply ordered query items on top of this spec.
    ///
    /// Unknown keys are ignored. Unparseable numbers behave like 0, the same
    /// as a missing value; out-of-range numbers are clamped.
    pub fn apply_items(mut self, items: &[(String, String)]) -> Self {
        let mut text = None;
        let mut field = None;

        for (key, value) in items {
            match key.as_str() {
                "q" => text = Some(value.clone()),
                "field" => field = Some(value.clone()),
                "fq" | "fq[]" => self = self.facet_filters([value.as_str()]),
                "sort" => {
                    for part in value.split(',') {
                        match SortOrder::parse(part) {
                            Some(order) => self.sort.push(order),
                            None if part.trim().is_empty() => {}
                            None => tracing::debug!(sort = part, "Ignoring malformed sort key"),
                        }
                    }
                }
                "start" => self = self.start(value.trim().parse().unwrap_or(0)),
                "limit" => self = self.limit(value.trim().parse().unwrap_or(0)),
                _ => {}
            }
        }

        match (text, field) {
            (Some(text), Some(field)) => self.query_field(field, text),
            (Some(text), None) => self.query(text),
            _ => self,
        }
    }

    /// Build a spec from ordered query items.
    pub fn from_items(items: &[(String, String)]) -> Self {
        Self::default().apply_items(items)
    }
}
