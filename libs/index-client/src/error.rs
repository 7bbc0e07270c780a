//! Error types for index-client

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Search index errors
#[derive(Error, Debug)]
pub enum Error {
    /// The index answered, but reported a failure (non-2xx status or an
    /// `error` member in the body).
    #[error("Index error: {error_type}: {reason}")]
    Index {
        status: Option<u16>,
        error_type: String,
        reason: String,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an `Error::Index` from an Elasticsearch error body.
    ///
    /// Elasticsearch reports failures as
    /// `{"error": {"type": ..., "reason": ..., "root_cause": [{"reason": ...}]}}`,
    /// older nodes and proxies sometimes send a bare string instead.
    pub fn from_body(status: Option<u16>, body: &JsonValue) -> Self {
        let error = body.get("error");
        let error_type = error
            .and_then(|e| e.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or("unknown_error")
            .to_string();
        let reason = error
            .and_then(|e| {
                e.get("root_cause")
                    .and_then(|rc| rc.get(0))
                    .and_then(|rc| rc.get("reason"))
                    .or_else(|| e.get("reason"))
                    .and_then(|r| r.as_str())
                    .map(|s| s.to_string())
                    .or_else(|| e.as_str().map(|s| s.to_string()))
            })
            .unwrap_or_else(|| match status {
                Some(code) => format!("request failed with status {}", code),
                None => "request failed".to_string(),
            });

        Error::Index {
            status,
            error_type,
            reason,
        }
    }

    /// Whether this error was reported by the index itself rather than the transport.
    pub fn is_index_error(&self) -> bool {
        matches!(self, Error::Index { .. })
    }

    /// HTTP status of the failed request, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Index { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Json(_) => None,
        }
    }
}
