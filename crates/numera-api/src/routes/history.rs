//! Cross-stage history routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use numera_registry::{global_history, GlobalHistory, HistoryEntry};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Creates history routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history", get(get_history))
        .route("/history/:mobile", get(get_mobile_history))
}

/// The whole registry flattened into one timeline, with stage conflicts.
///
/// GET /api/v1/history
pub(crate) async fn get_history(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<GlobalHistory>> {
    Ok(Json(global_history(&state.registry)))
}

/// Every stage a single mobile has passed through.
///
/// GET /api/v1/history/:mobile
pub(crate) async fn get_mobile_history(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(mobile): Path<String>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let history = global_history(&state.registry);
    let entries: Vec<HistoryEntry> = history.for_mobile(&mobile).into_iter().cloned().collect();
    if entries.is_empty() {
        return Err(ApiError::not_found(format!(
            "no history recorded for {mobile}"
        )));
    }
    Ok(Json(entries))
}
