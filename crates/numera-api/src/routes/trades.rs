//! Sale, pre-booking and dealer-purchase routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use numera_core::{DealerPurchaseId, NumberId, PreBookingId, SaleId};
use serde::Deserialize;
use utoipa::ToSchema;

use numera_registry::model::{
    DealerPurchaseRecord, NewDealerPurchase, NumberRecord, PreBookingRecord, SaleDetails,
    SaleRecord,
};

use crate::context::RequestContext;
use crate::error::{ApiErrorBody, ApiResult};
use crate::server::AppState;

/// Sell request: which numbers, and the shared sale terms.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    /// Numbers being sold.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
    /// Buyer, price and date, shared by every sold number.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub sale: SaleDetails,
}

/// Pre-booking request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreBookRequest {
    /// Numbers being parked.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<NumberId>,
}

/// Sell pre-booked request: booking ids plus the shared sale terms.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellPreBookedRequest {
    /// Bookings being converted.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<PreBookingId>,
    /// Buyer, price and date, shared by every converted booking.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub sale: SaleDetails,
}

/// Purchase register removal request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletePurchasesRequest {
    /// Entries to remove.
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<DealerPurchaseId>,
}

/// Creates trade routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sales", get(list_sales).post(sell_numbers))
        .route("/sales/:id/cancel", post(cancel_sale))
        .route("/prebookings", get(list_prebookings).post(pre_book))
        .route("/prebookings/sell", post(sell_pre_booked))
        .route("/prebookings/:id/cancel", post(cancel_pre_booking))
        .route(
            "/dealer-purchases",
            get(list_dealer_purchases).post(add_dealer_purchase),
        )
        .route("/dealer-purchases/delete", post(delete_dealer_purchases))
}

/// List completed sales.
///
/// GET /api/v1/sales
pub(crate) async fn list_sales(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SaleRecord>>> {
    Ok(Json(state.registry.sales()))
}

/// Sell one or more inventory numbers.
///
/// POST /api/v1/sales
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    tag = "trades",
    request_body = SellRequest,
    responses(
        (status = 201, description = "Sales recorded"),
        (status = 404, description = "Number not found", body = ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn sell_numbers(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SellRequest>,
) -> ApiResult<(StatusCode, Json<Vec<SaleRecord>>)> {
    let sold = state
        .writer
        .sell_numbers(&ctx.actor, &req.ids, &req.sale)
        .await?;
    Ok((StatusCode::CREATED, Json(sold)))
}

/// Cancel a sale, returning the number to inventory.
///
/// POST /api/v1/sales/:id/cancel
pub(crate) async fn cancel_sale(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NumberRecord>> {
    let id: SaleId = id.parse()?;
    let record = state.writer.cancel_sale(&ctx.actor, &id).await?;
    Ok(Json(record))
}

/// List pre-bookings.
///
/// GET /api/v1/prebookings
pub(crate) async fn list_prebookings(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PreBookingRecord>>> {
    Ok(Json(state.registry.prebookings()))
}

/// Park inventory numbers on the pre-booking list.
///
/// POST /api/v1/prebookings
pub(crate) async fn pre_book(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreBookRequest>,
) -> ApiResult<(StatusCode, Json<Vec<PreBookingRecord>>)> {
    let booked = state.writer.pre_book(&ctx.actor, &req.ids).await?;
    Ok((StatusCode::CREATED, Json(booked)))
}

/// Cancel a pre-booking, returning the number to inventory.
///
/// POST /api/v1/prebookings/:id/cancel
pub(crate) async fn cancel_pre_booking(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NumberRecord>> {
    let id: PreBookingId = id.parse()?;
    let record = state.writer.cancel_pre_booking(&ctx.actor, &id).await?;
    Ok(Json(record))
}

/// Convert pre-bookings straight into sales.
///
/// POST /api/v1/prebookings/sell
pub(crate) async fn sell_pre_booked(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SellPreBookedRequest>,
) -> ApiResult<(StatusCode, Json<Vec<SaleRecord>>)> {
    let sold = state
        .writer
        .sell_pre_booked(&ctx.actor, &req.ids, &req.sale)
        .await?;
    Ok((StatusCode::CREATED, Json(sold)))
}

/// List dealer purchases.
///
/// GET /api/v1/dealer-purchases
pub(crate) async fn list_dealer_purchases(
    _ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DealerPurchaseRecord>>> {
    Ok(Json(state.registry.dealer_purchases()))
}

/// Record a purchase made directly by a dealer.
///
/// POST /api/v1/dealer-purchases
pub(crate) async fn add_dealer_purchase(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewDealerPurchase>,
) -> ApiResult<(StatusCode, Json<DealerPurchaseRecord>)> {
    let record = state.writer.add_dealer_purchase(&ctx.actor, new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Remove entries from the dealer purchase register.
///
/// POST /api/v1/dealer-purchases/delete
pub(crate) async fn delete_dealer_purchases(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeletePurchasesRequest>,
) -> ApiResult<StatusCode> {
    state
        .writer
        .delete_dealer_purchases(&ctx.actor, &req.ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
