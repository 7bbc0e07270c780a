//! Finders - fluent search configuration with deferred, memoized execution
//!
//! A finder accumulates a [`QuerySpec`] through chained calls. Nothing is
//! sent to the index until the first accessor (`to_a`, `to_id_a`, `count`,
//! `page`, `facets`, `field_stats`, `suggestions`) is awaited; the response is
//! then kept for the finder's lifetime and every later accessor reads it.
//!
//! Each chained call consumes the finder and returns a new one with empty
//! memo cells, so a configured-then-loaded finder can never hand out results
//! that disagree with its configuration.
//!
//! ```rust,ignore
//! let items = ctx
//!     .items()
//!     .query("lighthouse")
//!     .collection("c1")
//!     .user_roles(["staff"])
//!     .aggregations(true)
//!     .limit(20);
//! let total = items.count().await?;
//! for entity in items.to_a().await? { /* ... */ }
//! ```

use crate::{
    db::search::{
        fields,
        params::{FilterValue, QuerySpec, SortDirection, SortOrder},
        query_builder::{CompiledQuery, QueryBuilder, RoleVisibility, DEFAULT_BUCKET_LIMIT},
        MAX_RESULT_WINDOW,
    },
    db::EntityStore,
    models::{Entity, EntityKind, Facet, FacetLookup, FacetTerm, Scope},
    services::response::{FieldStats, Hit, SearchResponse},
    Error, Result,
};
use kumquat_index_client::SearchIndex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Settings shared by every finder built from one context.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub items_index: String,
    pub collections_index: String,
    pub max_result_window: usize,
    pub bucket_limit: usize,
    pub role_visibility: RoleVisibility,
    pub search_all_field: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            items_index: "items".to_string(),
            collections_index: "collections".to_string(),
            max_result_window: MAX_RESULT_WINDOW,
            bucket_limit: DEFAULT_BUCKET_LIMIT,
            role_visibility: RoleVisibility::default(),
            search_all_field: fields::SEARCH_ALL.to_string(),
        }
    }
}

impl SearchOptions {
    pub fn index_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Item => &self.items_index,
            EntityKind::Collection => &self.collections_index,
        }
    }

    /// Comma-joined index names for a multi-index request.
    pub fn index_names(&self, scope: Scope) -> String {
        scope
            .kinds()
            .iter()
            .map(|kind| self.index_for(*kind))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn index_kinds(&self, scope: Scope) -> Vec<(String, EntityKind)> {
        scope
            .kinds()
            .iter()
            .map(|kind| (self.index_for(*kind).to_string(), *kind))
            .collect()
    }
}

/// Collaborators a finder talks to.
///
/// Built once at startup and cloned into each request; clones share the
/// index client, the store and the facet catalog.
#[derive(Clone)]
pub struct SearchContext {
    pub index: Arc<dyn SearchIndex>,
    pub store: Arc<dyn EntityStore>,
    pub facets: Arc<dyn FacetLookup>,
    pub options: SearchOptions,
}

impl SearchContext {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn EntityStore>,
        facets: Arc<dyn FacetLookup>,
        options: SearchOptions,
    ) -> Self {
        Self {
            index,
            store,
            facets,
            options,
        }
    }

    pub fn items(&self) -> ItemFinder {
        Finder::new(self.clone())
    }

    pub fn collections(&self) -> CollectionFinder {
        Finder::new(self.clone())
    }

    /// Items and collections in one result list.
    pub fn entities(&self) -> EntityFinder {
        Finder::new(self.clone())
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Compile-time marker for what a finder searches over.
pub trait FinderScope: Send + Sync + 'static {
    const SCOPE: Scope;
}

#[derive(Debug)]
pub enum ItemScope {}
#[derive(Debug)]
pub enum CollectionScope {}
#[derive(Debug)]
pub enum EntityScope {}

impl FinderScope for ItemScope {
    const SCOPE: Scope = Scope::Items;
}

impl FinderScope for CollectionScope {
    const SCOPE: Scope = Scope::Collections;
}

impl FinderScope for EntityScope {
    const SCOPE: Scope = Scope::Entities;
}

pub type ItemFinder = Finder<ItemScope>;
pub type CollectionFinder = Finder<CollectionScope>;
pub type EntityFinder = Finder<EntityScope>;

/// A configurable, lazily executed search.
pub struct Finder<S: FinderScope> {
    spec: QuerySpec,
    ctx: SearchContext,
    response: OnceCell<SearchResponse>,
    entities: OnceCell<Vec<Entity>>,
    suggestions: OnceCell<Vec<String>>,
    _scope: PhantomData<fn() -> S>,
}

impl<S: FinderScope> fmt::Debug for Finder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finder")
            .field("scope", &S::SCOPE)
            .field("spec", &self.spec)
            .field("loaded", &self.response.initialized())
            .finish()
    }
}

impl<S: FinderScope> Finder<S> {
    pub fn new(ctx: SearchContext) -> Self {
        let spec = QuerySpec::new().max_result_window(ctx.options.max_result_window);
        Self {
            spec,
            ctx,
            response: OnceCell::new(),
            entities: OnceCell::new(),
            suggestions: OnceCell::new(),
            _scope: PhantomData,
        }
    }

    pub fn scope(&self) -> Scope {
        S::SCOPE
    }

    pub fn query_spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Whether the index has been queried yet.
    pub fn is_loaded(&self) -> bool {
        self.response.initialized()
    }

    /// Apply a change to the spec, discarding anything memoized.
    fn map_spec(self, f: impl FnOnce(QuerySpec) -> QuerySpec) -> Self {
        Self {
            spec: f(self.spec),
            ctx: self.ctx,
            response: OnceCell::new(),
            entities: OnceCell::new(),
            suggestions: OnceCell::new(),
            _scope: PhantomData,
        }
    }

    // -- configuration --------------------------------------------------

    /// Replace the whole spec, e.g. one rebuilt from query items. The
    /// context's result window still applies.
    pub fn spec(self, spec: QuerySpec) -> Self {
        let window = self.ctx.options.max_result_window.min(spec.max_result_window);
        self.map_spec(|_| spec.max_result_window(window))
    }

    /// Apply URL query items (`q`, `field`, `fq`, `sort`, `start`, `limit`).
    pub fn apply_items(self, items: &[(String, String)]) -> Self {
        self.map_spec(|spec| spec.apply_items(items))
    }

    pub fn query(self, text: impl Into<String>) -> Self {
        self.map_spec(|spec| spec.query(text))
    }

    pub fn query_field(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.map_spec(|spec| spec.query_field(field, text))
    }

    pub fn filter(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.map_spec(|spec| spec.filter(field, value))
    }

    pub fn exclude(self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.map_spec(|spec| spec.exclude(field, value))
    }

    pub fn facet_filter(self, field: impl Into<String>, term: impl Into<String>) -> Self {
        self.map_spec(|spec| spec.facet_filter(field, term))
    }

    /// Facet selections in `field:term` form.
    pub fn facet_filters<I, T>(self, raw: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.map_spec(|spec| spec.facet_filters(raw))
    }

    pub fn order(self, order: SortOrder) -> Self {
        self.map_spec(|spec| spec.order(order))
    }

    pub fn order_by(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.map_spec(|spec| spec.order_by(field, direction))
    }

    /// Sort by a `field[:asc|desc]` or `random` string. Unparseable input
    /// leaves the order unchanged.
    pub fn sort(self, raw: &str) -> Self {
        match SortOrder::parse(raw) {
            Some(order) => self.order(order),
            None => {
                tracing::debug!(sort = raw, "Ignoring malformed sort");
                self
            }
        }
    }

    pub fn random_order(self) -> Self {
        self.map_spec(QuerySpec::random_order)
    }

    pub fn start(self, start: i64) -> Self {
        self.map_spec(|spec| spec.start(start))
    }

    pub fn limit(self, limit: i64) -> Self {
        self.map_spec(|spec| spec.limit(limit))
    }

    pub fn include_unpublished(self, include: bool) -> Self {
        self.map_spec(|spec| spec.include_unpublished(include))
    }

    pub fn include_children(self, include: bool) -> Self {
        self.map_spec(|spec| spec.include_children(include))
    }

    pub fn search_children(self, search: bool) -> Self {
        self.map_spec(|spec| spec.search_children(search))
    }

    pub fn user_roles<I, T>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.map_spec(|spec| spec.user_roles(roles))
    }

    pub fn aggregations(self, enabled: bool) -> Self {
        self.map_spec(|spec| spec.aggregations(enabled))
    }

    pub fn stats(self, enabled: bool) -> Self {
        self.map_spec(|spec| spec.stats(enabled))
    }

    // -- compilation ----------------------------------------------------

    /// The query document this finder sends. Pure; does not load.
    pub fn compiled_query(&self) -> CompiledQuery {
        let scope = S::SCOPE;
        let facet_fields = self
            .ctx
            .facets
            .facet_defs(scope)
            .into_iter()
            .map(|def| def.field);
        let mut stats_fields: Vec<&str> = Vec::new();
        for kind in scope.kinds() {
            for field in fields::stats_fields(*kind) {
                if !stats_fields.contains(field) {
                    stats_fields.push(field);
                }
            }
        }

        QueryBuilder::new(&self.spec)
            .with_scope(scope)
            .with_facet_fields(facet_fields)
            .with_stats_fields(stats_fields)
            .with_search_all_field(self.ctx.options.search_all_field.clone())
            .with_bucket_limit(self.ctx.options.bucket_limit)
            .with_role_visibility(self.ctx.options.role_visibility)
            .build()
    }

    // -- execution ------------------------------------------------------

    async fn load(&self) -> Result<&SearchResponse> {
        self.response
            .get_or_try_init(|| async {
                let scope = S::SCOPE;
                let index = self.ctx.options.index_names(scope);
                let query = self.compiled_query().to_json();
                let started = Instant::now();

                let body = self.ctx.index.search(&index, &query).await?;
                let response = SearchResponse::parse(&body, &self.ctx.options.index_kinds(scope))?;

                tracing::debug!(
                    index = %index,
                    count = response.total,
                    hits = response.hits.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Finder loaded"
                );
                Ok::<_, Error>(response)
            })
            .await
    }

    /// Total number of matches, independent of the pagination window.
    pub async fn count(&self) -> Result<u64> {
        Ok(self.load().await?.total)
    }

    /// 1-based page number of the current window.
    pub async fn page(&self) -> Result<usize> {
        self.load().await?;
        Ok(self.spec.page())
    }

    /// Repository ids of the hits in the current window, in index order.
    pub async fn to_id_a(&self) -> Result<Vec<String>> {
        Ok(self
            .load()
            .await?
            .hits
            .iter()
            .map(|hit| hit.id.clone())
            .collect())
    }

    /// Entities of the current window, in index order.
    ///
    /// Hits the database has no record for are skipped with a warning;
    /// [`count`](Self::count) still reports the index's total.
    pub async fn to_a(&self) -> Result<&[Entity]> {
        let entities = self
            .entities
            .get_or_try_init(|| async {
                let response = self.load().await?;
                self.hydrate(&response.hits).await
            })
            .await?;
        Ok(entities.as_slice())
    }

    async fn hydrate(&self, hits: &[Hit]) -> Result<Vec<Entity>> {
        let kinds = S::SCOPE.kinds();
        let fallback = if kinds.len() == 1 { Some(kinds[0]) } else { None };

        let mut wanted: BTreeMap<EntityKind, Vec<String>> = BTreeMap::new();
        let mut order: Vec<(EntityKind, &str)> = Vec::with_capacity(hits.len());
        for hit in hits {
            match hit.kind.or(fallback) {
                Some(kind) => {
                    wanted.entry(kind).or_default().push(hit.id.clone());
                    order.push((kind, hit.id.as_str()));
                }
                None => tracing::warn!(id = %hit.id, "Index hit has no entity kind; skipping"),
            }
        }

        let mut found: HashMap<(EntityKind, String), Entity> = HashMap::new();
        for (kind, ids) in &wanted {
            let records = self.ctx.store.load_batch(*kind, ids).await?;
            for (id, record) in ids.iter().zip(records) {
                if let Some(entity) = record {
                    found.insert((*kind, id.clone()), entity);
                }
            }
        }

        let mut out = Vec::with_capacity(order.len());
        for (kind, id) in order {
            match found.get(&(kind, id.to_string())) {
                Some(entity) => out.push(entity.clone()),
                None => tracing::warn!(
                    id = %id,
                    kind = %kind,
                    "Index hit has no matching database record; skipping"
                ),
            }
        }
        Ok(out)
    }

    /// Facets materialized from the aggregations, in catalog order.
    ///
    /// Empty unless aggregations were enabled. Facets without buckets are
    /// left out.
    pub async fn facets(&self) -> Result<Vec<Facet>> {
        let response = self.load().await?;
        let facets = self
            .ctx
            .facets
            .facet_defs(S::SCOPE)
            .into_iter()
            .filter_map(|def| {
                let terms: Vec<FacetTerm> = response
                    .buckets(&def.field)
                    .into_iter()
                    .map(|bucket| FacetTerm {
                        name: bucket.key,
                        label: bucket.label,
                        count: bucket.count,
                        field: def.field.clone(),
                    })
                    .collect();
                if terms.is_empty() {
                    None
                } else {
                    Some(Facet {
                        name: def.label,
                        field: def.field,
                        terms,
                    })
                }
            })
            .collect();
        Ok(facets)
    }

    /// Field statistics, keyed by field. Empty unless stats were enabled.
    pub async fn field_stats(&self) -> Result<BTreeMap<String, FieldStats>> {
        let response = self.load().await?;
        let mut out = BTreeMap::new();
        for kind in S::SCOPE.kinds() {
            for field in fields::stats_fields(*kind) {
                if let Some(stats) = response.stats(field) {
                    out.insert(field.to_string(), stats);
                }
            }
        }
        Ok(out)
    }

    /// "Did you mean" candidates for a free-text query that found nothing.
    ///
    /// Only a query with zero matches asks the index for suggestions; a
    /// failed suggestion request reads as no suggestions.
    pub async fn suggestions(&self) -> Result<&[String]> {
        let Some(query) = &self.spec.query else {
            return Ok(&[]);
        };
        if self.count().await? > 0 {
            return Ok(&[]);
        }

        let suggestions = self
            .suggestions
            .get_or_init(|| async {
                let index = self.ctx.options.index_names(S::SCOPE);
                let field = query
                    .field
                    .as_deref()
                    .unwrap_or(&self.ctx.options.search_all_field);
                match self.ctx.index.suggest(&index, field, &query.text).await {
                    Ok(terms) => terms,
                    Err(e) => {
                        tracing::warn!(index = %index, error = %e, "Suggestion request failed");
                        Vec::new()
                    }
                }
            })
            .await;
        Ok(suggestions.as_slice())
    }
}

impl Finder<ItemScope> {
    /// Items of one collection.
    pub fn collection(self, collection_id: impl Into<String>) -> Self {
        self.filter(fields::COLLECTION, collection_id.into())
    }

    /// Only items of these variants (e.g. `Page`, `File`).
    pub fn include_variants<I, T>(self, variants: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        self.filter(fields::VARIANT, variants)
    }

    pub fn exclude_variants<I, T>(self, variants: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        self.exclude(fields::VARIANT, variants)
    }

    pub fn media_types<I, T>(self, media_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let media_types: Vec<String> = media_types.into_iter().map(Into::into).collect();
        self.filter(fields::MEDIA_TYPE, media_types)
    }

    /// Child items (pages, files) of one compound item.
    pub fn parent_item(self, item_id: impl Into<String>) -> Self {
        let id = item_id.into();
        self.map_spec(|spec| spec.parent(Some(id)).search_children(true))
    }
}

impl Finder<CollectionScope> {
    /// Sub-collections of one collection.
    pub fn parent_collection(self, collection_id: impl Into<String>) -> Self {
        let id = collection_id.into();
        self.map_spec(|spec| spec.parent(Some(id)).search_children(true))
    }
}

impl Finder<EntityScope> {
    /// Leave out items of these variants. Collections carry no variant and
    /// are unaffected.
    pub fn exclude_item_variants<I, T>(self, variants: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        self.exclude(fields::VARIANT, variants)
    }
}
