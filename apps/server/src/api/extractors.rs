//! Custom Axum extractors

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

/// Header carrying the caller's roles, comma separated.
///
/// Set by the trusted proxy in front of the service after it has
/// authenticated the user; requests without it are anonymous.
pub const ROLES_HEADER: &str = "x-kumquat-roles";

/// Roles held by the caller. Empty for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestRoles(pub Vec<String>);

impl RequestRoles {
    pub fn parse(raw: &str) -> Self {
        let mut roles: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
        roles.sort();
        roles.dedup();
        Self(roles)
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rejection for an unreadable roles header.
pub struct RolesRejection;

impl IntoResponse for RolesRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "status": StatusCode::BAD_REQUEST.as_u16(),
                "message": format!("{} header is not valid ASCII", ROLES_HEADER),
            }
        });
        (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestRoles
where
    S: Send + Sync,
{
    type Rejection = RolesRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(ROLES_HEADER) {
            None => Ok(Self::default()),
            Some(value) => value
                .to_str()
                .map(Self::parse)
                .map_err(|_| RolesRejection),
        }
    }
}
