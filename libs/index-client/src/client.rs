//! Elasticsearch HTTP client

use crate::error::{Error, Result};
use crate::gateway::SearchIndex;
use crate::models::{parse_suggestions, suggest_request, IndexSummary};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for an Elasticsearch node.
///
/// Cheap to clone; clones share one connection pool, which is what makes a
/// single client safe to hand to many concurrently running finders.
#[derive(Clone, Debug)]
pub struct ElasticsearchClient {
    client: Client,
    endpoint: String,
}

impl ElasticsearchClient {
    /// Create a client for `endpoint` with the default receive timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit receive timeout.
    ///
    /// An expired timeout surfaces as [`Error::Http`].
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// URL of an index-scoped endpoint. `index` may list several indexes
    /// separated by commas; each name is percent-encoded on its own.
    fn index_url(&self, index: &str, endpoint: Option<&str>) -> String {
        let names = index
            .split(',')
            .map(|name| urlencoding::encode(name.trim()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        match endpoint {
            Some(endpoint) => self.url(&format!("{}/{}", names, endpoint)),
            None => self.url(&names),
        }
    }

    /// POST a query document to `{index}/_search`.
    pub async fn query(&self, index: &str, query: &JsonValue) -> Result<JsonValue> {
        let url = self.index_url(index, Some("_search"));
        tracing::debug!(index = %index, "Executing search query");

        let response = self.client.post(&url).json(query).send().await?;
        let body = read_checked(response).await?;

        if body.get("error").is_some() {
            let err = Error::from_body(None, &body);
            tracing::warn!(index = %index, error = %err, "Index reported an error");
            return Err(err);
        }
        Ok(body)
    }

    /// Create an index with the given settings/mappings document.
    pub async fn create_index(&self, name: &str, schema: &JsonValue) -> Result<()> {
        tracing::info!(index = %name, "Creating index");
        let response = self.client.put(self.index_url(name, None)).json(schema).send().await?;
        read_checked(response).await?;
        tracing::info!(index = %name, "Created index");
        Ok(())
    }

    /// Raise the maximum result window of an existing index.
    pub async fn set_max_result_window(&self, name: &str, window: usize) -> Result<()> {
        let settings = json!({ "index": { "max_result_window": window } });
        let response = self
            .client
            .put(self.index_url(name, Some("_settings")))
            .json(&settings)
            .send()
            .await?;
        read_checked(response).await?;
        tracing::info!(index = %name, window, "Updated max result window");
        Ok(())
    }

    /// Delete an index. A missing index is an `Error::Index` with status 404.
    pub async fn delete_index(&self, name: &str) -> Result<()> {
        tracing::info!(index = %name, "Deleting index");
        let response = self.client.delete(self.index_url(name, None)).send().await?;
        read_checked(response).await?;
        tracing::info!(index = %name, "Deleted index");
        Ok(())
    }

    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        let response = self.client.head(self.index_url(name, None)).send().await?;
        Ok(response.status().is_success())
    }

    /// Summary of all indexes on the node.
    pub async fn indexes(&self) -> Result<Vec<IndexSummary>> {
        let response = self
            .client
            .get(self.url("_cat/indices?format=json"))
            .send()
            .await?;
        let body = read_checked(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Drop and recreate an index, tolerating its absence.
    pub async fn recreate_index(&self, name: &str, schema: &JsonValue) -> Result<()> {
        match self.delete_index(name).await {
            Ok(()) => {}
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                tracing::debug!(index = %name, "Index did not exist");
            }
            Err(e) => return Err(e),
        }
        self.create_index(name, schema).await
    }
}

/// Read a response body as JSON, turning non-2xx statuses into `Error::Index`.
async fn read_checked(response: Response) -> Result<JsonValue> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        let err = Error::from_body(Some(status.as_u16()), &body);
        tracing::warn!(status = status.as_u16(), error = %err, "Index request failed");
        return Err(err);
    }

    if bytes.is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn search(&self, index: &str, query: &JsonValue) -> Result<JsonValue> {
        self.query(index, query).await
    }

    async fn suggest(&self, index: &str, field: &str, text: &str) -> Result<Vec<String>> {
        let body = self.query(index, &suggest_request(field, text)).await?;
        Ok(parse_suggestions(&body))
    }
}
