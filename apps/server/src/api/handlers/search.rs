//! Search handlers
//!
//! - `GET /search`: items and collections together
//! - `GET /items`
//! - `GET /collections`
//! - `GET /collections/{id}/items`
//!
//! Query parameters: `q`, `field`, `fq` (repeatable, also `fq[]`), `sort`,
//! `start`, `limit`. Roles come from the `X-Kumquat-Roles` header.

use crate::{
    api::extractors::RequestRoles,
    config::SearchConfig,
    db::search::QuerySpec,
    models::{variants, Entity, EntityKind, Facet},
    services::{Finder, FinderScope, ItemFinder},
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde::Serialize;

/// JSON body of every search endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub start: usize,
    pub limit: usize,
    pub page: usize,
    pub num_results: u64,
    pub results: Vec<ResultEntry>,
    pub facets: Vec<Facet>,
    pub suggestions: Vec<String>,
    /// Query string of the next page, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub id: String,
    pub kind: EntityKind,
    pub title: Option<String>,
}

impl From<&Entity> for ResultEntry {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.repository_id().to_string(),
            kind: entity.kind(),
            title: entity.title().map(String::from),
        }
    }
}

/// Search items and collections (GET /search)
///
/// Of the items, only standalone objects and files are listed.
pub async fn search_entities(
    State(state): State<AppState>,
    roles: RequestRoles,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResults>> {
    let items = parse_query_items(query.as_deref());
    let finder = state
        .search
        .entities()
        .exclude_item_variants(variants::all_but_file());
    run_search(&state, finder, roles, &items).await
}

/// Search items (GET /items)
pub async fn search_items(
    State(state): State<AppState>,
    roles: RequestRoles,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResults>> {
    let items = parse_query_items(query.as_deref());
    let finder = item_listing(state.search.items(), &items);
    run_search(&state, finder, roles, &items).await
}

/// Search collections (GET /collections)
pub async fn search_collections(
    State(state): State<AppState>,
    roles: RequestRoles,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResults>> {
    let items = parse_query_items(query.as_deref());
    run_search(&state, state.search.collections(), roles, &items).await
}

/// Search the items of one collection (GET /collections/{id}/items)
pub async fn search_collection_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    roles: RequestRoles,
    RawQuery(query): RawQuery,
) -> Result<Json<SearchResults>> {
    if state
        .search
        .store
        .load(EntityKind::Collection, &collection_id)
        .await?
        .is_none()
    {
        return Err(Error::NotFound(format!("Collection {}", collection_id)));
    }

    let items = parse_query_items(query.as_deref());
    let finder = item_listing(state.search.items().collection(collection_id), &items);
    run_search(&state, finder, roles, &items).await
}

/// Item listings hide page-like parts of compound objects. A text query
/// also reaches child items, so files inside an object can be found.
fn item_listing(finder: ItemFinder, items: &[(String, String)]) -> ItemFinder {
    let has_query = QuerySpec::from_items(items).has_query();
    finder
        .include_children(has_query)
        .exclude_variants(variants::PAGE_LIKE.iter().copied())
}

async fn run_search<S: FinderScope>(
    state: &AppState,
    finder: Finder<S>,
    roles: RequestRoles,
    items: &[(String, String)],
) -> Result<Json<SearchResults>> {
    let limit = page_limit(items, &state.config.search);

    let finder = finder
        .apply_items(items)
        .limit(limit as i64)
        .user_roles(roles.0)
        .aggregations(true);

    let num_results = finder.count().await?;
    let results = finder.to_a().await?.iter().map(ResultEntry::from).collect();
    let facets = finder.facets().await?;
    let suggestions = finder.suggestions().await?.to_vec();
    let page = finder.page().await?;

    let spec = finder.query_spec();
    let next_start = spec.start + spec.limit;
    let next = (spec.limit > 0
        && (next_start as u64) < num_results
        && next_start < spec.max_result_window)
        .then(|| build_query_string(&spec.clone().start(next_start as i64).to_items()));

    Ok(Json(SearchResults {
        start: spec.start,
        limit: spec.limit,
        page,
        num_results,
        results,
        facets,
        suggestions,
        next,
    }))
}

/// The page size to use: the requested `limit` when it lies within
/// `[1, max_page_size]`, the configured default otherwise.
fn page_limit(items: &[(String, String)], config: &SearchConfig) -> usize {
    items
        .iter()
        .rev()
        .find(|(k, _)| k == "limit")
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .filter(|limit| (1..=config.max_page_size).contains(limit))
        .unwrap_or(config.default_limit)
}

fn parse_query_items(raw_query: Option<&str>) -> Vec<(String, String)> {
    // `application/x-www-form-urlencoded` semantics, including '+' = space.
    raw_query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

fn build_query_string(items: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in items {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}
