//! Activity feed, payment and user routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use numera_core::ActivityId;
use serde::Deserialize;
use utoipa::ToSchema;

use numera_registry::model::{Activity, NewPayment, PaymentRecord, UserProfile};

use crate::context::RequestContext;
use crate::error::{ApiErrorBody, ApiResult};
use crate::server::AppState;

/// Activity removal request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteActivitiesRequest {
    /// Entries to remove from the feed.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<ActivityId>,
}

/// Creates ledger routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activities", get(list_activities))
        .route("/activities/delete", post(delete_activities))
        .route("/payments", get(list_payments).post(add_payment))
        .route("/users", get(list_users))
        .route("/users/:uid", delete(delete_user))
        .route("/vendors", get(list_vendors))
        .route("/employees", get(list_employees))
}

/// List the audit activity feed.
///
/// GET /api/v1/activities
pub(crate) async fn list_activities(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Activity>>> {
    Ok(Json(state.registry.activities()))
}

/// Delete activity entries. Admin only.
///
/// POST /api/v1/activities/delete
#[utoipa::path(
    post,
    path = "/api/v1/activities/delete",
    tag = "ledger",
    request_body = DeleteActivitiesRequest,
    responses(
        (status = 204, description = "Activities deleted"),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn delete_activities(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteActivitiesRequest>,
) -> ApiResult<StatusCode> {
    state.writer.delete_activities(&ctx.actor, &req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List received payments.
///
/// GET /api/v1/payments
pub(crate) async fn list_payments(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PaymentRecord>>> {
    Ok(Json(state.registry.payments()))
}

/// Record a vendor payment.
///
/// POST /api/v1/payments
pub(crate) async fn add_payment(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewPayment>,
) -> ApiResult<(StatusCode, Json<PaymentRecord>)> {
    let record = state.writer.add_payment(&ctx.actor, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List user profiles.
///
/// GET /api/v1/users
pub(crate) async fn list_users(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.registry.users()))
}

/// Delete a user account. Admin only, and never your own.
///
/// DELETE /api/v1/users/:uid
pub(crate) async fn delete_user(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> ApiResult<StatusCode> {
    state.writer.delete_user(&ctx.actor, &uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List vendor names for purchase and payment forms.
///
/// GET /api/v1/vendors
pub(crate) async fn list_vendors(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.registry.vendors()))
}

/// List employee display names for assignment forms.
///
/// GET /api/v1/employees
pub(crate) async fn list_employees(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.registry.employees()))
}
