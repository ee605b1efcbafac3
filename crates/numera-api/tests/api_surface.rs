//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → writer → store.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use numera_api::config::Config;
use numera_api::server::{test_router, AppState};
use numera_core::Redacted;
use numera_registry::collections;

const WEBHOOK_SECRET: &str = "hook-secret";

fn debug_config() -> Config {
    Config {
        debug: true,
        webhook_secret: Some(Redacted::new(WEBHOOK_SECRET.to_string())),
        ..Config::default()
    }
}

fn sample_number(mobile: &str) -> serde_json::Value {
    serde_json::json!({
        "mobile": mobile,
        "status": "RTS",
        "numberType": "Prepaid",
        "purchaseFrom": "Krishna Telecom",
        "purchasePrice": 450.0,
        "purchaseDate": "2026-08-01T00:00:00Z",
        "currentLocation": "Main Store",
        "locationType": "Store",
        "ownershipType": "Individual"
    })
}

mod helpers {
    use super::*;

    pub fn make_request(
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Request<Body>> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-Actor-Uid", "u-admin")
            .header("X-Actor-Name", "Asha")
            .header("X-Actor-Role", "admin")
            .header(header::CONTENT_TYPE, "application/json");

        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).context("serialize request body")?),
            None => Body::empty(),
        };

        builder.body(body).context("build request")
    }

    pub async fn send_json(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<(StatusCode, serde_json::Value)> {
        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .context("read response body")?;
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).context("parse response body")?
        };
        Ok((status, value))
    }
}

#[tokio::test]
async fn health_and_ready() -> Result<()> {
    let (router, _state) = test_router(debug_config()).await?;

    let (status, body) = helpers::send_json(
        router.clone(),
        helpers::make_request(Method::GET, "/health", None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = helpers::send_json(
        router,
        helpers::make_request(Method::GET, "/ready", None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    Ok(())
}

#[tokio::test]
async fn missing_actor_headers_rejected() -> Result<()> {
    let (router, _state) = test_router(debug_config()).await?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/reminders")
        .body(Body::empty())?;
    let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn add_then_fetch_number() -> Result<()> {
    let (router, state) = test_router(debug_config()).await?;

    let (status, created) = helpers::send_json(
        router.clone(),
        helpers::make_request(
            Method::POST,
            "/api/v1/numbers",
            Some(sample_number("9876543210")),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().context("created id")?.to_string();
    assert_eq!(created["mobile"], "9876543210");

    sync(&state).await?;

    let (status, fetched) = helpers::send_json(
        router.clone(),
        helpers::make_request(Method::GET, &format!("/api/v1/numbers/{id}"), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["history"][0]["action"], "Created");

    let (status, page) = helpers::send_json(
        router,
        helpers::make_request(
            Method::POST,
            "/api/v1/numbers/search",
            Some(serde_json::json!({})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_mobile_conflicts() -> Result<()> {
    let (router, _state) = test_router(debug_config()).await?;

    let (status, _) = helpers::send_json(
        router.clone(),
        helpers::make_request(
            Method::POST,
            "/api/v1/numbers",
            Some(sample_number("9000000001")),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = helpers::send_json(
        router,
        helpers::make_request(
            Method::POST,
            "/api/v1/numbers",
            Some(sample_number("9000000001")),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn webhook_validates_shared_secret() -> Result<()> {
    let (router, _state) = test_router(debug_config()).await?;
    let update = serde_json::json!({
        "message": { "chat": { "id": 42 }, "text": "/start" }
    });

    let bad = Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Telegram-Bot-Api-Secret-Token", "wrong")
        .body(Body::from(serde_json::to_vec(&update)?))?;
    let response = router
        .clone()
        .oneshot(bad)
        .await
        .map_err(|err| -> anyhow::Error { match err {} })?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let good = Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Telegram-Bot-Api-Secret-Token", WEBHOOK_SECRET)
        .body(Body::from(serde_json::to_vec(&update)?))?;
    let (status, reply) = helpers::send_json(router, good).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["method"], "sendMessage");
    assert_eq!(reply["chat_id"], 42);
    Ok(())
}

#[tokio::test]
async fn openapi_spec_served() -> Result<()> {
    let (router, _state) = test_router(debug_config()).await?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/openapi.json")
        .body(Body::empty())?;
    let (status, spec) = helpers::send_json(router, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(spec["info"]["title"], "Numera API");
    Ok(())
}

/// Forces the read-side mirror to catch up with committed writes.
async fn sync(state: &std::sync::Arc<AppState>) -> Result<()> {
    state.registry.refresh(collections::NUMBERS).await?;
    Ok(())
}
