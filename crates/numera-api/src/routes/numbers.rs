//! Inventory number routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use numera_core::{DeletedNumberId, Msisdn, NumberId};
use serde::Deserialize;
use utoipa::ToSchema;

use numera_registry::model::{
    DeletedNumberRecord, NewNumber, NumberRecord, NumberTemplate, PdBill, RtsStatus, UploadStatus,
};
use numera_registry::writer::LocationUpdate;
use numera_registry::{NumberQuery, Page};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody, ApiResult};
use crate::server::AppState;

/// Bulk add request: one field template applied to many mobiles.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddRequest {
    /// Fields shared by every created number.
    #[schema(value_type = Object)]
    pub template: NumberTemplate,
    /// Mobiles to create.
    #[schema(value_type = Vec<String>)]
    pub mobiles: Vec<Msisdn>,
}

/// RTS status change request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    /// New status.
    #[schema(value_type = String)]
    pub status: RtsStatus,
    /// Scheduled RTS date, for Non-RTS only.
    #[serde(default)]
    pub rts_date: Option<DateTime<Utc>>,
    /// Optional note appended to the number's notes.
    #[serde(default)]
    pub note: Option<String>,
}

/// Upload status change request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// New upload status.
    #[schema(value_type = String)]
    pub upload_status: UploadStatus,
}

/// Assignment request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// Display name of the assignee.
    pub employee_name: String,
    /// Where the numbers move to.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub location: LocationUpdate,
}

/// Location change request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// Where the numbers move to.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub location: LocationUpdate,
}

/// Safe-custody date change request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafeCustodyRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// New safe-custody date.
    pub new_date: DateTime<Utc>,
}

/// Postpaid billing details request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostpaidRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// New bill date.
    pub bill_date: DateTime<Utc>,
    /// New PD-bill flag.
    #[schema(value_type = String)]
    pub pd_bill: PdBill,
}

/// Archive request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNumbersRequest {
    /// Target number ids.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// Mandatory audit reason.
    pub reason: String,
}

/// Creates inventory number routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/numbers", post(add_number))
        .route("/numbers/search", post(search_numbers))
        .route("/numbers/bulk", post(bulk_add_numbers))
        .route("/numbers/upload-status", post(update_upload_status))
        .route("/numbers/assign", post(assign_numbers))
        .route("/numbers/location", post(update_location))
        .route("/numbers/safe-custody", post(update_safe_custody))
        .route("/numbers/postpaid", post(update_postpaid))
        .route("/numbers/delete", post(delete_numbers))
        .route("/numbers/:id", get(get_number).put(update_number))
        .route("/numbers/:id/status", post(update_status))
        .route("/numbers/:id/check-in", post(check_in))
        .route("/deleted-numbers", get(list_deleted))
        .route("/deleted-numbers/:id/restore", post(restore_deleted))
}

/// Search, filter, sort and paginate the inventory.
///
/// POST /api/v1/numbers/search
#[utoipa::path(
    post,
    path = "/api/v1/numbers/search",
    tag = "numbers",
    responses(
        (status = 200, description = "Matching page of numbers"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn search_numbers(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(query): Json<NumberQuery>,
) -> ApiResult<Json<Page<NumberRecord>>> {
    let numbers = state.registry.numbers();
    Ok(Json(query.apply(&numbers)))
}

/// Fetch one number with its full history.
///
/// GET /api/v1/numbers/:id
pub(crate) async fn get_number(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NumberRecord>> {
    let id: NumberId = id.parse()?;
    state
        .registry
        .number(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("number {id} not found")))
}

/// Add a single number to inventory.
///
/// POST /api/v1/numbers
#[utoipa::path(
    post,
    path = "/api/v1/numbers",
    tag = "numbers",
    responses(
        (status = 201, description = "Number created"),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 409, description = "Duplicate mobile", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn add_number(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewNumber>,
) -> ApiResult<(StatusCode, Json<NumberRecord>)> {
    let record = state.writer.add_number(&ctx.actor, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Add many numbers sharing one field template.
///
/// POST /api/v1/numbers/bulk
#[utoipa::path(
    post,
    path = "/api/v1/numbers/bulk",
    tag = "numbers",
    request_body = BulkAddRequest,
    responses(
        (status = 201, description = "Numbers created"),
        (status = 409, description = "Duplicate mobile", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn bulk_add_numbers(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkAddRequest>,
) -> ApiResult<(StatusCode, Json<Vec<NumberRecord>>)> {
    let created = state
        .writer
        .add_numbers_bulk(&ctx.actor, req.template, req.mobiles)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a number's editable details.
///
/// PUT /api/v1/numbers/:id
pub(crate) async fn update_number(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(new): Json<NewNumber>,
) -> ApiResult<Json<NumberRecord>> {
    let id: NumberId = id.parse()?;
    let record = state.writer.update_number(&ctx.actor, &id, new).await?;
    Ok(Json(record))
}

/// Change a number's RTS status.
///
/// POST /api/v1/numbers/:id/status
pub(crate) async fn update_status(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<StatusCode> {
    let id: NumberId = id.parse()?;
    state
        .writer
        .update_status(&ctx.actor, &id, req.status, req.rts_date, req.note)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set upload status on one or more numbers.
///
/// POST /api/v1/numbers/upload-status
pub(crate) async fn update_upload_status(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadStatusRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .update_upload_status(&ctx.actor, &req.ids, req.upload_status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Assign numbers to an employee and move them.
///
/// POST /api/v1/numbers/assign
pub(crate) async fn assign_numbers(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .assign_numbers(&ctx.actor, &req.ids, &req.employee_name, &req.location)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move numbers to a location without changing assignment.
///
/// POST /api/v1/numbers/location
pub(crate) async fn update_location(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .update_location(&ctx.actor, &req.ids, &req.location)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record a SIM check-in at its current location.
///
/// POST /api/v1/numbers/:id/check-in
pub(crate) async fn check_in(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: NumberId = id.parse()?;
    state.writer.check_in(&ctx.actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the safe-custody date on COCP numbers.
///
/// POST /api/v1/numbers/safe-custody
pub(crate) async fn update_safe_custody(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SafeCustodyRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .update_safe_custody(&ctx.actor, &req.ids, req.new_date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set bill date and PD-bill flag on postpaid numbers.
///
/// POST /api/v1/numbers/postpaid
pub(crate) async fn update_postpaid(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostpaidRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .update_postpaid(&ctx.actor, &req.ids, req.bill_date, req.pd_bill)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move numbers to the deleted archive. Admin only.
///
/// POST /api/v1/numbers/delete
#[utoipa::path(
    post,
    path = "/api/v1/numbers/delete",
    tag = "numbers",
    request_body = DeleteNumbersRequest,
    responses(
        (status = 200, description = "Numbers archived"),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn delete_numbers(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteNumbersRequest>,
) -> ApiResult<Json<Vec<DeletedNumberRecord>>> {
    let archived = state
        .writer
        .delete_numbers(&ctx.actor, &req.ids, &req.reason)
        .await?;
    Ok(Json(archived))
}

/// List the deleted-number archive.
///
/// GET /api/v1/deleted-numbers
pub(crate) async fn list_deleted(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DeletedNumberRecord>>> {
    Ok(Json(state.registry.deleted_numbers()))
}

/// Restore an archived number back to inventory.
///
/// POST /api/v1/deleted-numbers/:id/restore
pub(crate) async fn restore_deleted(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NumberRecord>> {
    let id: DeletedNumberId = id.parse()?;
    let record = state.writer.restore_deleted(&ctx.actor, &id).await?;
    Ok(Json(record))
}
