#![allow(dead_code)]

pub mod builders;
pub mod index;
pub mod store;

use anyhow::Context as _;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use kumquat::{
    api::create_router,
    models::FacetCatalog,
    services::{SearchContext, SearchOptions},
    AppState, Config,
};
use kumquat_index_client::SearchIndex;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt as _;

pub use builders::*;
pub use index::{MemoryIndex, RecordingIndex};
pub use store::MemoryStore;

/// A search context over the given index and store with default options.
pub fn context(index: Arc<dyn SearchIndex>, store: Arc<MemoryStore>) -> SearchContext {
    context_with_options(index, store, SearchOptions::default())
}

pub fn context_with_options(
    index: Arc<dyn SearchIndex>,
    store: Arc<MemoryStore>,
    options: SearchOptions,
) -> SearchContext {
    SearchContext::new(index, store, Arc::new(FacetCatalog::default()), options)
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(search: SearchContext) -> Self {
        Self::new_with_config(search, |_| {})
    }

    pub fn new_with_config(search: SearchContext, configure: impl FnOnce(&mut Config)) -> Self {
        kumquat::logging::init_simple_logging();
        let mut config = Config::default();
        configure(&mut config);
        let state = AppState::from_parts(config, search);
        let router = create_router(state.clone());
        Self { router, state }
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, Value)> {
        self.get_with_headers(path_and_query, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        path_and_query: &str,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(path_and_query)
            .header("host", "example.org")
            .body(Body::empty())
            .context("build request")?;

        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).context("parse response JSON")?
        };
        Ok((status, json))
    }
}

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(
        actual, expected,
        "{}: expected status {}, got {}",
        context, expected, actual
    );
}
