//! Elasticsearch query builder for finder searches.
//!
//! Compiles a [`QuerySpec`] into a query document:
//! - `must`: the free-text `query_string` search
//! - `filter`: programmatic filters, facet filters, parent scoping, public visibility
//! - `should` / `filter`: role visibility (see [`RoleVisibility`])
//! - `must_not`: denied roles, child entities, exclusions
//! - aggregations, sort, from/size
//!
//! Compilation is pure. Random sorts carry their seed in the spec, so the
//! same spec always compiles to the same document.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::escape::sanitize_query_text;
use super::fields;
use super::params::{FilterClause, FilterValue, QuerySpec, SortOrder};
use crate::models::Scope;

mod clauses;

pub use clauses::{Aggregation, BoolQuery, Clause, SortKey, STATS_PREFIX};

/// Buckets per facet aggregation unless configured otherwise.
pub const DEFAULT_BUCKET_LIMIT: usize = 10;

/// How the "caller may see this" role disjunction takes part in a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleVisibility {
    /// Non-scoring: entities the caller's roles do not open are excluded.
    #[default]
    Filter,
    /// Scoring only: role-matching entities rank higher, nothing is excluded.
    Boost,
}

/// A compiled query document.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: Clause,
    pub aggregations: Vec<Aggregation>,
    pub sort: Vec<SortKey>,
    pub from: usize,
    pub size: usize,
}

impl CompiledQuery {
    /// The top-level bool query, looking through a random-score wrapper.
    pub fn bool_query(&self) -> Option<&BoolQuery> {
        match &self.query {
            Clause::Bool(b) => Some(b),
            Clause::RandomScore { query, .. } => match query.as_ref() {
                Clause::Bool(b) => Some(b),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("query".to_string(), self.query.to_json());
        if !self.aggregations.is_empty() {
            let aggs: Map<String, JsonValue> = self
                .aggregations
                .iter()
                .map(|a| (a.name(), a.to_json()))
                .collect();
            map.insert("aggregations".to_string(), JsonValue::Object(aggs));
        }
        if !self.sort.is_empty() {
            map.insert(
                "sort".to_string(),
                JsonValue::Array(self.sort.iter().map(SortKey::to_json).collect()),
            );
        }
        map.insert("from".to_string(), JsonValue::from(self.from));
        map.insert("size".to_string(), JsonValue::from(self.size));
        JsonValue::Object(map)
    }
}

impl Serialize for CompiledQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Builds index queries from a query specification.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    spec: QuerySpec,
    scope: Scope,
    facet_fields: Vec<String>,
    stats_fields: Vec<String>,
    search_all_field: String,
    bucket_limit: usize,
    role_visibility: RoleVisibility,
}

impl QueryBuilder {
    pub fn new(spec: &QuerySpec) -> Self {
        Self {
            spec: spec.clone(),
            scope: Scope::Items,
            facet_fields: Vec::new(),
            stats_fields: Vec::new(),
            search_all_field: fields::SEARCH_ALL.to_string(),
            bucket_limit: DEFAULT_BUCKET_LIMIT,
            role_visibility: RoleVisibility::default(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Fields aggregated when the spec enables aggregations.
    pub fn with_facet_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facet_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Fields summarized when the spec enables stats.
    pub fn with_stats_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stats_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search_all_field(mut self, field: impl Into<String>) -> Self {
        self.search_all_field = field.into();
        self
    }

    pub fn with_bucket_limit(mut self, bucket_limit: usize) -> Self {
        self.bucket_limit = bucket_limit;
        self
    }

    pub fn with_role_visibility(mut self, role_visibility: RoleVisibility) -> Self {
        self.role_visibility = role_visibility;
        self
    }

    pub fn build(&self) -> CompiledQuery {
        let spec = &self.spec;
        let mut b = BoolQuery::default();

        if let Some(q) = &spec.query {
            b.must.push(Clause::QueryString {
                query: sanitize_query_text(&q.text),
                default_field: q
                    .field
                    .clone()
                    .unwrap_or_else(|| self.search_all_field.clone()),
            });
        }

        b.filter.extend(spec.filters.iter().map(filter_clause));
        b.filter.extend(
            spec.facet_filters
                .iter()
                .map(|ff| Clause::term(ff.field.clone(), ff.term.clone())),
        );
        if let Some(parent) = &spec.parent {
            b.filter.push(self.parent_clause(parent));
        }
        if !spec.include_unpublished {
            b.filter.push(Clause::term(fields::PUBLICLY_ACCESSIBLE, true));
        }

        if !spec.user_roles.is_empty() {
            let roles: Vec<JsonValue> = spec
                .user_roles
                .iter()
                .map(|role| JsonValue::from(role.as_str()))
                .collect();
            let visible = vec![
                Clause::terms(fields::ALLOWED_ROLES, roles.clone()),
                Clause::lte(fields::ALLOWED_ROLE_COUNT, 0),
            ];
            match self.role_visibility {
                RoleVisibility::Filter => {
                    b.filter.push(Clause::Bool(BoolQuery::any_of(visible)));
                }
                RoleVisibility::Boost => b.should.extend(visible),
            }
            b.must_not.push(Clause::terms(fields::DENIED_ROLES, roles));
        }

        if spec.top_level_only() {
            b.must_not.extend(
                self.parent_fields()
                    .into_iter()
                    .map(Clause::exists),
            );
        }
        b.must_not.extend(spec.exclusions.iter().map(filter_clause));

        let mut query = b.into_clause();
        let mut sort = Vec::with_capacity(spec.sort.len());
        let mut randomized = false;
        for order in &spec.sort {
            match order {
                SortOrder::Field { field, direction } => sort.push(SortKey::Field {
                    field: field.clone(),
                    direction: *direction,
                }),
                SortOrder::Random { seed } if !randomized => {
                    randomized = true;
                    query = Clause::RandomScore {
                        query: Box::new(query),
                        seed: *seed,
                    };
                    sort.push(SortKey::Score);
                }
                // A second random key adds nothing.
                SortOrder::Random { .. } => {}
            }
        }

        let mut aggregations = Vec::new();
        if spec.aggregations {
            aggregations.extend(self.facet_fields.iter().map(|field| Aggregation::Terms {
                field: field.clone(),
                size: self.bucket_limit,
            }));
        }
        if spec.stats {
            aggregations.extend(self.stats_fields.iter().map(|field| Aggregation::Stats {
                field: field.clone(),
            }));
        }

        // The index rejects any request whose from + size passes the window.
        let from = spec.start.min(spec.max_result_window);
        let size = spec.limit.min(spec.max_result_window - from);

        CompiledQuery {
            query,
            aggregations,
            sort,
            from,
            size,
        }
    }

    fn parent_fields(&self) -> Vec<&'static str> {
        self.scope
            .kinds()
            .iter()
            .map(|kind| fields::parent_field(*kind))
            .collect()
    }

    fn parent_clause(&self, parent: &str) -> Clause {
        let mut clauses: Vec<Clause> = self
            .parent_fields()
            .into_iter()
            .map(|field| Clause::term(field, parent))
            .collect();
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Clause::Bool(BoolQuery::any_of(clauses))
        }
    }
}

fn filter_clause(filter: &FilterClause) -> Clause {
    match &filter.value {
        FilterValue::One(value) => Clause::term(filter.field.clone(), value.clone()),
        FilterValue::Any(values) if values.len() == 1 => {
            Clause::term(filter.field.clone(), values[0].clone())
        }
        FilterValue::Any(values) => Clause::terms(filter.field.clone(), values.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::search::params::{SortDirection, MAX_RESULT_WINDOW};
    use serde_json::json;

    fn public_clause() -> Clause {
        Clause::term(fields::PUBLICLY_ACCESSIBLE, true)
    }

    #[test]
    fn lighthouse_example_compiles_to_expected_document() {
        let spec = QuerySpec::new()
            .query("lighthouse")
            .filter("collection", "A")
            .pagination(0, 10);
        let json = QueryBuilder::new(&spec).build().to_json();

        assert_eq!(
            json["query"]["bool"]["must"][0]["query_string"]["query"],
            "lighthouse"
        );
        assert_eq!(
            json["query"]["bool"]["must"][0]["query_string"]["default_field"],
            "search_all"
        );
        let filter = json["query"]["bool"]["filter"].as_array().unwrap();
        assert!(filter.contains(&json!({"term": {"collection": "A"}})));
        assert!(filter.contains(&json!({"term": {"publicly_accessible": true}})));
        assert_eq!(json["from"], 0);
        assert_eq!(json["size"], 10);
    }

    #[test]
    fn compilation_is_deterministic() {
        let spec = QuerySpec::new()
            .query_field("title", "mill")
            .filter("variant", vec!["Page", "Title"])
            .facet_filter("facet_subject", "Maps")
            .user_roles(["staff", "admin"])
            .exclude("media_type", vec!["image/tiff"])
            .order_by("date", SortDirection::Desc)
            .aggregations(true)
            .stats(true);
        let builder = QueryBuilder::new(&spec)
            .with_facet_fields(["facet_subject", "facet_place"])
            .with_stats_fields([fields::DATE]);

        let first = serde_json::to_string(&builder.build()).unwrap();
        let second = serde_json::to_string(&QueryBuilder::new(&spec)
            .with_facet_fields(["facet_subject", "facet_place"])
            .with_stats_fields([fields::DATE])
            .build())
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_spec_applies_only_default_filters() {
        let compiled = QueryBuilder::new(&QuerySpec::new()).build();
        let b = compiled.bool_query().unwrap();
        assert!(b.must.is_empty());
        assert!(b.should.is_empty());
        assert_eq!(b.filter, vec![public_clause()]);
        assert_eq!(b.must_not, vec![Clause::exists(fields::PARENT_ITEM)]);
        assert_eq!(compiled.from, 0);
        assert_eq!(compiled.size, 40);
    }

    #[test]
    fn unconstrained_browse_matches_everything() {
        let spec = QuerySpec::new()
            .include_unpublished(true)
            .search_children(true);
        let compiled = QueryBuilder::new(&spec).build();
        assert_eq!(compiled.query, Clause::MatchAll);
        assert_eq!(compiled.to_json()["query"], json!({"match_all": {}}));
    }

    #[test]
    fn include_unpublished_removes_only_the_public_clause() {
        let spec = QuerySpec::new()
            .filter("collection", "A")
            .facet_filter("facet_type", "Maps");
        let published = QueryBuilder::new(&spec).build();
        let all = QueryBuilder::new(&spec.clone().include_unpublished(true)).build();

        let mut expected = published.bool_query().unwrap().filter.clone();
        expected.retain(|c| *c != public_clause());
        assert_eq!(all.bool_query().unwrap().filter, expected);
        assert_eq!(expected.len(), 2);
    }

    #[test]
    fn filters_and_facet_filters_share_the_filter_section() {
        let spec = QuerySpec::new()
            .filter("collection", "A")
            .filter("variant", vec!["Page", "Title"])
            .filter("media_type", vec!["image/jpeg"])
            .facet_filter("facet_place", "Illinois");
        let compiled = QueryBuilder::new(&spec).build();
        let filter = &compiled.bool_query().unwrap().filter;
        assert_eq!(
            filter,
            &vec![
                Clause::term("collection", "A"),
                Clause::terms("variant", ["Page", "Title"]),
                Clause::term("media_type", "image/jpeg"),
                Clause::term("facet_place", "Illinois"),
                public_clause(),
            ]
        );
    }

    #[test]
    fn anonymous_callers_get_no_role_clauses() {
        let compiled = QueryBuilder::new(&QuerySpec::new()).build();
        let json = compiled.to_json().to_string();
        assert!(!json.contains(fields::ALLOWED_ROLES));
        assert!(!json.contains(fields::DENIED_ROLES));
    }

    #[test]
    fn role_filter_nests_the_disjunction_in_filter() {
        let spec = QuerySpec::new().user_roles(["A"]);
        let compiled = QueryBuilder::new(&spec).build();
        let b = compiled.bool_query().unwrap();

        assert!(b.should.is_empty());
        assert!(b.filter.contains(&Clause::Bool(BoolQuery::any_of(vec![
            Clause::terms(fields::ALLOWED_ROLES, ["A"]),
            Clause::lte(fields::ALLOWED_ROLE_COUNT, 0),
        ]))));
        assert!(b
            .must_not
            .contains(&Clause::terms(fields::DENIED_ROLES, ["A"])));
    }

    #[test]
    fn role_boost_uses_top_level_should() {
        let spec = QuerySpec::new().user_roles(["A", "B"]);
        let compiled = QueryBuilder::new(&spec)
            .with_role_visibility(RoleVisibility::Boost)
            .build();
        let b = compiled.bool_query().unwrap();

        assert_eq!(
            b.should,
            vec![
                Clause::terms(fields::ALLOWED_ROLES, ["A", "B"]),
                Clause::lte(fields::ALLOWED_ROLE_COUNT, 0),
            ]
        );
        assert_eq!(b.minimum_should_match, None);
        assert_eq!(b.filter, vec![public_clause()]);
    }

    #[test]
    fn search_children_removes_parent_exclusion() {
        let default = QueryBuilder::new(&QuerySpec::new()).build();
        assert!(default
            .bool_query()
            .unwrap()
            .must_not
            .contains(&Clause::exists(fields::PARENT_ITEM)));

        for spec in [
            QuerySpec::new().search_children(true),
            QuerySpec::new().include_children(true),
        ] {
            let compiled = QueryBuilder::new(&spec).build();
            assert!(compiled.bool_query().unwrap().must_not.is_empty());
        }
    }

    #[test]
    fn entity_scope_excludes_children_of_both_kinds() {
        let compiled = QueryBuilder::new(&QuerySpec::new())
            .with_scope(Scope::Entities)
            .build();
        assert_eq!(
            compiled.bool_query().unwrap().must_not,
            vec![
                Clause::exists(fields::PARENT_COLLECTIONS),
                Clause::exists(fields::PARENT_ITEM),
            ]
        );
    }

    #[test]
    fn parent_scoping_filters_on_the_parent_field() {
        let spec = QuerySpec::new()
            .parent(Some("c1".to_string()))
            .search_children(true);
        let compiled = QueryBuilder::new(&spec)
            .with_scope(Scope::Collections)
            .build();
        assert!(compiled
            .bool_query()
            .unwrap()
            .filter
            .contains(&Clause::term(fields::PARENT_COLLECTIONS, "c1")));

        let compiled = QueryBuilder::new(&spec).with_scope(Scope::Entities).build();
        assert!(compiled.bool_query().unwrap().filter.contains(&Clause::Bool(
            BoolQuery::any_of(vec![
                Clause::term(fields::PARENT_COLLECTIONS, "c1"),
                Clause::term(fields::PARENT_ITEM, "c1"),
            ])
        )));
    }

    #[test]
    fn exclusions_land_in_must_not() {
        let spec = QuerySpec::new()
            .search_children(true)
            .exclude(fields::VARIANT, vec!["Page", "File"]);
        let compiled = QueryBuilder::new(&spec).build();
        assert_eq!(
            compiled.bool_query().unwrap().must_not,
            vec![Clause::terms(fields::VARIANT, ["Page", "File"])]
        );
    }

    #[test]
    fn aggregations_follow_facet_fields_and_bucket_limit() {
        let spec = QuerySpec::new().aggregations(true);
        let json = QueryBuilder::new(&spec)
            .with_facet_fields(["facet_subject", "facet_place"])
            .with_bucket_limit(25)
            .build()
            .to_json();

        let aggs = json["aggregations"].as_object().unwrap();
        assert_eq!(
            aggs.keys().collect::<Vec<_>>(),
            vec!["facet_subject", "facet_place"]
        );
        assert_eq!(aggs["facet_place"]["terms"]["size"], 25);
    }

    #[test]
    fn aggregations_are_omitted_unless_enabled() {
        let json = QueryBuilder::new(&QuerySpec::new())
            .with_facet_fields(["facet_subject"])
            .with_stats_fields([fields::DATE])
            .build()
            .to_json();
        assert!(json.get("aggregations").is_none());
    }

    #[test]
    fn stats_aggregations_are_prefixed() {
        let spec = QuerySpec::new().stats(true);
        let json = QueryBuilder::new(&spec)
            .with_stats_fields([fields::DATE])
            .build()
            .to_json();
        assert_eq!(
            json["aggregations"]["stats:date"],
            json!({"stats": {"field": "date"}})
        );
    }

    #[test]
    fn sort_keys_keep_caller_order() {
        let spec = QuerySpec::new()
            .order_by("title", SortDirection::Asc)
            .order_by("date", SortDirection::Desc);
        let json = QueryBuilder::new(&spec).build().to_json();
        assert_eq!(
            json["sort"],
            json!([{"title": {"order": "asc"}}, {"date": {"order": "desc"}}])
        );
    }

    #[test]
    fn random_sort_wraps_the_query_with_its_seed() {
        let spec = QuerySpec::new()
            .order(SortOrder::Random { seed: 7 })
            .order_by("title", SortDirection::Asc);
        let compiled = QueryBuilder::new(&spec).build();
        let json = compiled.to_json();

        assert_eq!(json["query"]["function_score"]["random_score"]["seed"], 7);
        assert_eq!(
            json["query"]["function_score"]["query"]["bool"]["filter"][0],
            json!({"term": {"publicly_accessible": true}})
        );
        assert_eq!(
            json["sort"],
            json!([{"_score": {"order": "desc"}}, {"title": {"order": "asc"}}])
        );
        assert!(compiled.bool_query().is_some());
    }

    #[test]
    fn drawn_random_seeds_are_sent_as_longs() {
        for _ in 0..50 {
            let json = QueryBuilder::new(&QuerySpec::new().random_order())
                .build()
                .to_json();
            assert!(json["query"]["function_score"]["random_score"]["seed"]
                .as_i64()
                .is_some());
        }
    }

    #[test]
    fn separately_drawn_random_sorts_differ() {
        let a = QueryBuilder::new(&QuerySpec::new().random_order()).build();
        let b = QueryBuilder::new(&QuerySpec::new().random_order()).build();
        let c = QueryBuilder::new(&QuerySpec::new().random_order()).build();
        assert!(a != b || b != c);
    }

    #[test]
    fn size_never_exceeds_the_result_window() {
        let spec = QuerySpec::new().pagination(-5, 999_999);
        let compiled = QueryBuilder::new(&spec).build();
        assert_eq!(compiled.from, 0);
        assert_eq!(compiled.size, MAX_RESULT_WINDOW);
    }

    #[test]
    fn deep_pages_stay_inside_the_result_window() {
        let compiled = QueryBuilder::new(&QuerySpec::new().pagination(9_990, 40)).build();
        assert_eq!(compiled.from, 9_990);
        assert_eq!(compiled.size, 10);
        assert!(compiled.from + compiled.size <= MAX_RESULT_WINDOW);

        let compiled = QueryBuilder::new(&QuerySpec::new().pagination(50_000, 40)).build();
        assert_eq!(compiled.from, MAX_RESULT_WINDOW);
        assert_eq!(compiled.size, 0);
    }

    #[test]
    fn field_query_targets_the_field_and_escapes_slashes() {
        let spec = QuerySpec::new().query_field("date", "1/2/1900");
        let json = QueryBuilder::new(&spec)
            .with_search_all_field("everything")
            .build()
            .to_json();
        let qs = &json["query"]["bool"]["must"][0]["query_string"];
        assert_eq!(qs["default_field"], "date");
        assert_eq!(qs["query"], "1\\/2\\/1900");
    }
}
