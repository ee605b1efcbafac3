//! `OpenAPI` (3.1) specification generation for `numera-api`.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the registry REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Numera API",
        description = "Phone-number registry REST API"
    ),
    paths(
        crate::routes::numbers::search_numbers,
        crate::routes::numbers::add_number,
        crate::routes::numbers::bulk_add_numbers,
        crate::routes::numbers::delete_numbers,
        crate::routes::trades::sell_numbers,
        crate::routes::reminders::mark_done,
        crate::routes::ledger::delete_activities,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::numbers::BulkAddRequest,
            crate::routes::numbers::StatusRequest,
            crate::routes::numbers::UploadStatusRequest,
            crate::routes::numbers::AssignRequest,
            crate::routes::numbers::LocationRequest,
            crate::routes::numbers::SafeCustodyRequest,
            crate::routes::numbers::PostpaidRequest,
            crate::routes::numbers::DeleteNumbersRequest,
            crate::routes::trades::SellRequest,
            crate::routes::trades::PreBookRequest,
            crate::routes::trades::SellPreBookedRequest,
            crate::routes::trades::DeletePurchasesRequest,
            crate::routes::reminders::AssignRemindersRequest,
            crate::routes::reminders::MarkDoneRequest,
            crate::routes::reminders::ReminderIdsRequest,
            crate::routes::ledger::DeleteActivitiesRequest,
        )
    ),
    tags(
        (name = "numbers", description = "Inventory operations"),
        (name = "trades", description = "Sales, pre-bookings and dealer purchases"),
        (name = "reminders", description = "Reminder tasks"),
        (name = "ledger", description = "Activity feed, payments and users"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Handler for `GET /api/v1/openapi.json`.
pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates() {
        let spec = openapi();
        assert!(!spec.paths.paths.is_empty());
    }
}
