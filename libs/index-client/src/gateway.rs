//! The seam between query execution and the wire protocol.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A search index that can execute compiled query documents.
///
/// Implementations must be safe to share between concurrently running
/// finders; the only state they may keep between calls is a reusable
/// connection handle.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Execute a query document against `index` and return the parsed
    /// response body.
    ///
    /// `index` may name several indexes separated by commas. A non-2xx
    /// status or a body carrying an `error` member is reported as
    /// [`crate::Error::Index`]; partial data is never returned.
    async fn search(&self, index: &str, query: &JsonValue) -> Result<JsonValue>;

    /// Ask the index for spelling corrections of `text` against `field`.
    ///
    /// Returns candidate corrected terms in the order the index ranked
    /// them. An index with nothing to offer returns an empty list.
    async fn suggest(&self, index: &str, field: &str, text: &str) -> Result<Vec<String>>;
}
