//! Error types for the Kumquat server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure, non-2xx answer or explicit error payload from the
    /// search index. Always fatal to the finder access that hit it.
    #[error("Search index error: {0}")]
    Index(#[from] kumquat_index_client::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an index error from a response body that carries an `error` member.
    pub fn index_payload(body: &serde_json::Value) -> Self {
        Error::Index(kumquat_index_client::Error::from_body(None, body))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Index(e) => {
                tracing::error!(error = %e, "Search index failure");
                (StatusCode::BAD_GATEWAY, "Search index error".to_string())
            }
            Error::Database(_)
            | Error::Migration(_)
            | Error::Config(_)
            | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
