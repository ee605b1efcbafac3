//! HTTP route handlers.

pub mod history;
pub mod ledger;
pub mod numbers;
pub mod reminders;
pub mod trades;
pub mod transfer;
pub mod webhook;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/v1` routes (authenticated).
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(numbers::routes())
        .merge(trades::routes())
        .merge(reminders::routes())
        .merge(ledger::routes())
        .merge(history::routes())
        .merge(transfer::routes())
        .route(
            "/openapi.json",
            axum::routing::get(crate::openapi::serve_openapi),
        )
}
