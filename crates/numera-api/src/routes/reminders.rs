//! Reminder routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use numera_core::ReminderId;
use serde::Deserialize;
use utoipa::ToSchema;

use numera_registry::model::{NewReminder, Reminder};
use numera_registry::writer::BulkDoneReport;

use crate::context::RequestContext;
use crate::error::{ApiErrorBody, ApiResult};
use crate::server::AppState;

/// Reminder reassignment request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRemindersRequest {
    /// Target reminder ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<ReminderId>,
    /// Display names of the new assignees.
    pub assignees: Vec<String>,
}

/// Single completion request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkDoneRequest {
    /// Optional completion note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Bulk reminder selection.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderIdsRequest {
    /// Target reminder ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<ReminderId>,
}

/// Creates reminder routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reminders", get(list_reminders).post(add_reminder))
        .route("/reminders/assign", post(assign_reminders))
        .route("/reminders/done", post(mark_done_bulk))
        .route("/reminders/delete", post(delete_reminders))
        .route("/reminders/:id", delete(delete_reminder))
        .route("/reminders/:id/done", post(mark_done))
}

/// List reminders.
///
/// GET /api/v1/reminders
pub(crate) async fn list_reminders(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Reminder>>> {
    Ok(Json(state.registry.reminders()))
}

/// Create a reminder by hand.
///
/// POST /api/v1/reminders
pub(crate) async fn add_reminder(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewReminder>,
) -> ApiResult<(StatusCode, Json<Reminder>)> {
    let reminder = state.writer.add_reminder(&ctx.actor, new).await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

/// Replace the assignee list on one or more reminders.
///
/// POST /api/v1/reminders/assign
pub(crate) async fn assign_reminders(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignRemindersRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .assign_reminders(&ctx.actor, &req.ids, &req.assignees)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark one reminder done.
///
/// POST /api/v1/reminders/:id/done
#[utoipa::path(
    post,
    path = "/api/v1/reminders/{id}/done",
    tag = "reminders",
    request_body = MarkDoneRequest,
    responses(
        (status = 204, description = "Reminder completed"),
        (status = 412, description = "Tracked condition unresolved", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn mark_done(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MarkDoneRequest>,
) -> ApiResult<StatusCode> {
    let id: ReminderId = id.parse()?;
    state
        .writer
        .mark_reminder_done(&ctx.actor, &id, req.note)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark many reminders done, reporting the ones skipped because their
/// tracked condition is unresolved.
///
/// POST /api/v1/reminders/done
pub(crate) async fn mark_done_bulk(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReminderIdsRequest>,
) -> ApiResult<Json<BulkDoneReport>> {
    let report = state
        .writer
        .mark_reminders_done_bulk(&ctx.actor, &req.ids)
        .await?;
    Ok(Json(report))
}

/// Delete one reminder.
///
/// DELETE /api/v1/reminders/:id
pub(crate) async fn delete_reminder(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ReminderId = id.parse()?;
    state.writer.delete_reminder(&ctx.actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete many reminders at once.
///
/// POST /api/v1/reminders/delete
pub(crate) async fn delete_reminders(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReminderIdsRequest>,
) -> ApiResult<StatusCode> {
    state.writer.delete_reminders(&ctx.actor, &req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
