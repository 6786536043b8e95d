//! CargoLink API Library
//!
//! Shipments, their append-only tracking history, guest quotes and
//! payment-exception resolution behind one authorized HTTP surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod pricing;
pub mod services;
pub mod tracing;

use axum::{
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

use crate::auth::{Action, AuthConfig, AuthRouterExt, AuthService, Resource};
use crate::db::DbPool;
use crate::events::{EventSender, TrackingFeed};
use crate::health::HealthState;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub feed: Arc<TrackingFeed>,
    pub auth: Arc<AuthService>,
    pub health: Arc<HealthState>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the pricing and tracking-number collaborators from config and
    /// wires every service around them.
    pub fn new(
        config: config::AppConfig,
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        base_logger: &Logger,
    ) -> Result<Self, errors::ServiceError> {
        let feed = Arc::new(TrackingFeed::new(config.feed_channel_capacity));
        let calculator = pricing::cost_calculator_from_config(&config)?;
        let tracking_ids = pricing::tracking_generator_from_config(&config)?;

        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let health = Arc::new(HealthState::new(
            db.clone(),
            feed.clone(),
            calculator.backend(),
        ));

        let services = handlers::AppServices::new(
            &config,
            db.clone(),
            event_sender.clone(),
            feed.clone(),
            calculator,
            tracking_ids,
            base_logger,
        );

        Ok(Self {
            db,
            config,
            event_sender,
            feed,
            auth,
            health,
            services,
        })
    }

    pub fn shipment_service(&self) -> Arc<services::shipments::ShipmentService> {
        self.services.shipments.clone()
    }

    pub fn tracking_service(&self) -> Arc<services::tracking::TrackingService> {
        self.services.tracking.clone()
    }

    pub fn quote_service(&self) -> Arc<services::quotes::QuoteService> {
        self.services.quotes.clone()
    }

    pub fn payment_service(&self) -> Arc<services::payments::PaymentService> {
        self.services.payments.clone()
    }

    pub fn profile_service(&self) -> Arc<services::profiles::ProfileService> {
        self.services.profiles.clone()
    }

    pub fn analytics_service(&self) -> Arc<services::analytics::AnalyticsService> {
        self.services.analytics.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn message_is_attached_to_the_envelope() {
        let response = ApiResponse::success(3u64).with_message("Shipment deleted");
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Shipment deleted"));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Result for handlers that answer 201 Created
pub type ApiCreated<T> = Result<(StatusCode, Json<ApiResponse<T>>), errors::ServiceError>;

/// Every `/api/v1` route, each group guarded by the permission it needs.
/// Guests pass through the same policy check as everyone else.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{analytics, me, payments, profiles, quotes, shipments, tracking};

    // Public
    let rates = Router::new()
        .route("/rates/calculate", post(quotes::calculate_rate))
        .require(Resource::Rates, Action::Create);
    let quotes_create = Router::new()
        .route("/quotes", post(quotes::create_quote))
        .require(Resource::Quotes, Action::Create);
    let quotes_read = Router::new()
        .route("/quotes/:id", get(quotes::get_quote))
        .require(Resource::Quotes, Action::Read);
    let tracking_read = Router::new()
        .route("/track/:tracking_number", get(tracking::track_shipment))
        .route(
            "/track/:tracking_number/events/stream",
            get(tracking::stream_tracking_events),
        )
        .require(Resource::Tracking, Action::Read);
    let proofs_create = Router::new()
        .route(
            "/track/:tracking_number/payment-proofs",
            post(tracking::submit_payment_proof),
        )
        .require(Resource::PaymentProofs, Action::Create);
    let options_read = Router::new()
        .route("/payment-options", get(payments::list_active_options))
        .require(Resource::PaymentOptions, Action::Read);

    // Signed-in client
    let profile_read = Router::new()
        .route("/me", get(me::get_me))
        .require(Resource::Profile, Action::Read);
    let profile_update = Router::new()
        .route("/me", put(me::update_me))
        .require(Resource::Profile, Action::Update);
    let own_shipments_list = Router::new()
        .route("/me/shipments", get(me::list_my_shipments))
        .require(Resource::OwnShipments, Action::List);
    let own_shipments_read = Router::new()
        .route("/me/shipments/:id", get(me::get_my_shipment))
        .require(Resource::OwnShipments, Action::Read);

    // Admin
    let shipments_list = Router::new()
        .route("/admin/shipments", get(shipments::list_shipments))
        .require(Resource::Shipments, Action::List);
    let shipments_create = Router::new()
        .route("/admin/shipments", post(shipments::create_shipment))
        .require(Resource::Shipments, Action::Create);
    let shipments_read = Router::new()
        .route("/admin/shipments/:id", get(shipments::get_shipment))
        .require(Resource::Shipments, Action::Read);
    let shipments_update = Router::new()
        .route("/admin/shipments/:id", put(shipments::update_shipment))
        .require(Resource::Shipments, Action::Update);
    let shipments_delete = Router::new()
        .route("/admin/shipments/:id", delete(shipments::delete_shipment))
        .require(Resource::Shipments, Action::Delete);
    let events_list = Router::new()
        .route("/admin/shipments/:id/events", get(shipments::list_events))
        .require(Resource::TrackingEvents, Action::List);
    let events_create = Router::new()
        .route("/admin/shipments/:id/events", post(shipments::append_event))
        .require(Resource::TrackingEvents, Action::Create);

    let options_list = Router::new()
        .route("/admin/payment-options", get(payments::list_options))
        .require(Resource::PaymentOptions, Action::List);
    let options_create = Router::new()
        .route("/admin/payment-options", post(payments::create_option))
        .require(Resource::PaymentOptions, Action::Create);
    let options_delete = Router::new()
        .route("/admin/payment-options/:id", delete(payments::delete_option))
        .require(Resource::PaymentOptions, Action::Delete);
    let proofs_list = Router::new()
        .route("/admin/payment-proofs", get(payments::list_proofs))
        .require(Resource::PaymentProofs, Action::List);
    let proofs_review = Router::new()
        .route(
            "/admin/payment-proofs/:id/review",
            post(payments::review_proof),
        )
        .require(Resource::PaymentProofs, Action::Review);

    let profiles_list = Router::new()
        .route("/admin/profiles", get(profiles::list_profiles))
        .require(Resource::Profiles, Action::List);
    let profiles_update = Router::new()
        .route("/admin/profiles/:id", put(profiles::update_profile))
        .require(Resource::Profiles, Action::Update);
    let quotes_list = Router::new()
        .route("/admin/quotes", get(quotes::list_quotes))
        .require(Resource::Quotes, Action::List);
    let analytics_read = Router::new()
        .route("/admin/analytics/summary", get(analytics::summary))
        .require(Resource::Analytics, Action::Read);

    Router::new()
        .route("/status", get(api_status))
        .merge(rates)
        .merge(quotes_create)
        .merge(quotes_read)
        .merge(tracking_read)
        .merge(proofs_create)
        .merge(options_read)
        .merge(profile_read)
        .merge(profile_update)
        .merge(own_shipments_list)
        .merge(own_shipments_read)
        .merge(shipments_list)
        .merge(shipments_create)
        .merge(shipments_read)
        .merge(shipments_update)
        .merge(shipments_delete)
        .merge(events_list)
        .merge(events_create)
        .merge(options_list)
        .merge(options_create)
        .merge(options_delete)
        .merge(proofs_list)
        .merge(proofs_review)
        .merge(profiles_list)
        .merge(profiles_update)
        .merge(quotes_list)
        .merge(analytics_read)
}

/// CORS from config: explicit origins, permissive when allowed, else an error.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(errors::ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// Full application: `/api/v1` behind authentication, health probes and
/// Swagger UI, with the shared HTTP layers on top.
pub fn app_router(state: AppState, base_logger: &Logger) -> Result<Router, errors::ServiceError> {
    let cors = cors_layer(&state.config)?;
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));
    let access_log = Arc::new(logging::LoggingState::new(logging::component_logger(
        base_logger,
        "http",
    )));

    let api = api_v1_routes()
        .layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            auth::authenticate,
        ))
        .with_state(state.clone());

    Ok(Router::new()
        .route("/", get(|| async { "cargolink-api up" }))
        .nest("/api/v1", api)
        .nest("/health", health::health_routes(state.health.clone()))
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn_with_state(
            access_log,
            logging::logging_middleware,
        ))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        )))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "cargolink-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}
