use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CargoLink API",
        version = "0.3.0",
        description = r#"
# CargoLink Logistics API

Back office and guest tracking for parcel shipments.

## Features

- **Rates & Quotes**: Price a parcel, store a quote valid for a configurable number of days
- **Tracking**: Public tracker page and a live server-sent event feed per tracking number
- **Payment exceptions**: Guests answer a held shipment with proof of payment; admins review it
- **Back office**: Shipments, their append-only event history, payment options, profiles and analytics

## Authentication

Public endpoints accept anonymous callers. Everything else needs a bearer token issued
by the identity provider:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body shape:

```json
{
  "error": "Conflict",
  "message": "Illegal transition from delivered to in_transit",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "rates", description = "Cost estimates"),
        (name = "quotes", description = "Guest price quotes"),
        (name = "tracking", description = "Public tracker and payment proofs"),
        (name = "payments", description = "Payment option catalog"),
        (name = "me", description = "Signed-in client's profile and shipments"),
        (name = "admin", description = "Back-office endpoints")
    ),
    paths(
        // Public
        crate::handlers::quotes::calculate_rate,
        crate::handlers::quotes::create_quote,
        crate::handlers::quotes::get_quote,
        crate::handlers::tracking::track_shipment,
        crate::handlers::tracking::stream_tracking_events,
        crate::handlers::tracking::submit_payment_proof,
        crate::handlers::payments::list_active_options,

        // Client
        crate::handlers::me::get_me,
        crate::handlers::me::update_me,
        crate::handlers::me::list_my_shipments,
        crate::handlers::me::get_my_shipment,

        // Admin
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::delete_shipment,
        crate::handlers::shipments::list_events,
        crate::handlers::shipments::append_event,
        crate::handlers::payments::list_options,
        crate::handlers::payments::create_option,
        crate::handlers::payments::delete_option,
        crate::handlers::payments::list_proofs,
        crate::handlers::payments::review_proof,
        crate::handlers::profiles::list_profiles,
        crate::handlers::profiles::update_profile,
        crate::handlers::quotes::list_quotes,
        crate::handlers::analytics::summary,
    ),
    components(
        schemas(
            crate::models::ShipmentStatus,
            crate::models::PackageType,
            crate::models::ServiceType,
            crate::models::TrackingEventRecord,
            crate::models::PaymentDetails,
            crate::models::NewTrackingEvent,
            crate::models::PaymentRequest,
            crate::models::PackageDetails,
            crate::models::ServiceOptions,
            crate::pricing::CostBreakdown,
            crate::commands::shipments::NewShipment,
            crate::commands::shipments::Party,
            crate::commands::shipments::ShipmentPatch,
            crate::commands::quotes::NewQuote,
            crate::commands::quotes::Place,
            crate::handlers::shipments::ShipmentView,
            crate::handlers::shipments::ShipmentDetail,
            crate::handlers::tracking::TrackerResponse,
            crate::handlers::payments::PaymentOptionView,
            crate::handlers::payments::PaymentProofView,
            crate::handlers::profiles::ProfileView,
            crate::handlers::quotes::QuoteView,
            crate::services::analytics::AnalyticsSummary,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_public_and_admin_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("CargoLink API"));
        assert!(json.contains("/api/v1/track/{tracking_number}"));
        assert!(json.contains("/api/v1/admin/shipments/{id}/events"));
        assert!(json.contains("bearer_auth"));
    }
}
