//! Request context extraction and authentication.
//!
//! In debug mode the acting identity is supplied via `X-Actor-*` headers for
//! local development. Outside debug mode every call must carry the static
//! bearer token, with the same headers naming the actor on whose behalf the
//! gateway forwards the request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use ulid::Ulid;

use numera_registry::model::{Actor, Role};

use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from authentication and headers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting user.
    pub actor: Actor,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            header_string(headers, REQUEST_ID_HEADER).unwrap_or_else(|| Ulid::new().to_string());

        if !state.config.debug {
            let expected = state
                .config
                .api_token
                .as_ref()
                .ok_or_else(|| ApiError::internal("api token not configured"))?;
            let token = bearer_token(headers)
                .ok_or_else(|| ApiError::missing_auth().with_request_id(request_id.clone()))?;
            if token != *expected.expose() {
                return Err(ApiError::unauthorized("invalid bearer token")
                    .with_request_id(request_id.clone()));
            }
        }

        let actor = actor_from_headers(headers).ok_or_else(|| {
            ApiError::unauthorized("missing X-Actor-Uid / X-Actor-Name headers")
                .with_request_id(request_id.clone())
        })?;

        let ctx = Self { actor, request_id };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let uid = header_string(headers, "x-actor-uid")?;
    let display_name = header_string(headers, "x-actor-name")?;
    let role = match header_string(headers, "x-actor-role").as_deref() {
        Some("admin") => Role::Admin,
        _ => Role::Employee,
    };
    Some(Actor {
        uid,
        display_name,
        role,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn actor_defaults_to_employee_role() {
        let actor = actor_from_headers(&headers(&[
            ("x-actor-uid", "u-1"),
            ("x-actor-name", "Asha"),
        ]))
        .unwrap();
        assert_eq!(actor.role, Role::Employee);

        let admin = actor_from_headers(&headers(&[
            ("x-actor-uid", "u-1"),
            ("x-actor-name", "Asha"),
            ("x-actor-role", "admin"),
        ]))
        .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn bearer_token_requires_prefix() {
        let map = headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(bearer_token(&map).as_deref(), Some("abc123"));

        let map = headers(&[("authorization", "abc123")]);
        assert_eq!(bearer_token(&map), None);
    }
}
