//! CSV export and import routes.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use numera_registry::csv::{self, RejectedRow};
use numera_registry::model::NumberRecord;

use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::server::AppState;

/// Import outcome returned to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Numbers created from accepted rows.
    pub created: Vec<NumberRecord>,
    /// Rows refused, with their reasons.
    pub rejected: Vec<RejectedRow>,
}

/// Creates transfer routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/numbers/export", get(export_numbers))
        .route("/numbers/import", post(import_numbers))
}

/// Export the inventory as CSV, newest snapshot, with a summary line.
///
/// GET /api/v1/numbers/export
pub(crate) async fn export_numbers(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let numbers = state.registry.numbers();
    let body = csv::export_numbers(&numbers, Utc::now());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"numbers.csv\"",
            ),
        ],
        body,
    ))
}

/// Import numbers from CSV text. Valid rows are created in one batch;
/// invalid rows come back with per-row reasons and block nothing else.
///
/// POST /api/v1/numbers/import
pub(crate) async fn import_numbers(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<ImportResponse>> {
    let mut existing: HashSet<String> = HashSet::new();
    for n in state.registry.numbers() {
        existing.insert(n.details.mobile.to_string());
    }
    for s in state.registry.sales() {
        existing.insert(s.mobile.to_string());
    }
    for b in state.registry.prebookings() {
        existing.insert(b.mobile.to_string());
    }
    for p in state.registry.dealer_purchases() {
        existing.insert(p.mobile.to_string());
    }
    let employees = state.registry.employees();

    let outcome = csv::parse_import(&body, &existing, &employees);
    let created = state
        .writer
        .import_numbers(&ctx.actor, outcome.accepted)
        .await?;

    Ok(Json(ImportResponse {
        created,
        rejected: outcome.rejected,
    }))
}
