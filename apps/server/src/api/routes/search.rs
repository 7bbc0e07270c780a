//! Search API Routes

use crate::api::handlers::search;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search_entities))
        .route("/items", get(search::search_items))
        .route("/collections", get(search::search_collections))
        .route("/collections/:id/items", get(search::search_collection_items))
}
