use crate::{
    commands::quotes::NewQuote,
    handlers::common::paginated,
    models::{
        quote::{self, QuoteStatus},
        PackageType, ServiceType,
    },
    pricing::CostBreakdown,
    services::quotes::RateRequest,
    ApiCreated, ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<QuoteStatus>,
    /// Matches the contact email
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuoteView {
    pub id: Uuid,
    pub origin_city: String,
    pub origin_country: String,
    pub destination_city: String,
    pub destination_country: String,
    pub package_type: PackageType,
    pub weight_kg: Decimal,
    pub declared_value: Decimal,
    pub service_type: ServiceType,
    pub signature_required: bool,
    pub insurance_required: bool,
    pub base_cost: Decimal,
    pub estimated_cost: Decimal,
    pub estimated_delivery_days: i32,
    pub contact_email: String,
    pub contact_name: Option<String>,
    /// `expired` once `expires_at` has passed, whatever is stored
    pub status: QuoteStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl QuoteView {
    fn at(model: quote::Model, now: DateTime<Utc>) -> Self {
        Self {
            status: model.effective_status(now),
            id: model.id,
            origin_city: model.origin_city,
            origin_country: model.origin_country,
            destination_city: model.destination_city,
            destination_country: model.destination_country,
            package_type: model.package_type,
            weight_kg: model.weight_kg,
            declared_value: model.declared_value,
            service_type: model.service_type,
            signature_required: model.signature_required,
            insurance_required: model.insurance_required,
            base_cost: model.base_cost,
            estimated_cost: model.estimated_cost,
            estimated_delivery_days: model.estimated_delivery_days,
            contact_email: model.contact_email,
            contact_name: model.contact_name,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}

impl From<quote::Model> for QuoteView {
    fn from(model: quote::Model) -> Self {
        Self::at(model, Utc::now())
    }
}

/// Price a parcel without storing anything
#[utoipa::path(
    post,
    path = "/api/v1/rates/calculate",
    request_body = RateRequest,
    responses(
        (status = 200, description = "Itemized price", body = ApiResponse<CostBreakdown>),
        (status = 400, description = "Invalid parcel", body = crate::errors::ErrorResponse),
        (status = 502, description = "Pricing service failed", body = crate::errors::ErrorResponse)
    ),
    tag = "rates"
)]
pub async fn calculate_rate(
    State(state): State<AppState>,
    Json(request): Json<RateRequest>,
) -> ApiResult<CostBreakdown> {
    let breakdown = state.quote_service().calculate_rate(request).await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    request_body = NewQuote,
    responses(
        (status = 201, description = "Quote stored", body = ApiResponse<QuoteView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Pricing service failed", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn create_quote(
    State(state): State<AppState>,
    Json(payload): Json<NewQuote>,
) -> ApiCreated<QuoteView> {
    let quote = state.quote_service().create_quote(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(QuoteView::from(quote))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote", body = ApiResponse<QuoteView>),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuoteView> {
    let quote = state.quote_service().get_quote(id).await?;
    Ok(Json(ApiResponse::success(QuoteView::from(quote))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/quotes",
    params(QuoteListQuery),
    responses(
        (status = 200, description = "Quotes listed", body = ApiResponse<PaginatedResponse<QuoteView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuoteListQuery>,
) -> ApiResult<PaginatedResponse<QuoteView>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let (quotes, total) = state
        .quote_service()
        .list_quotes(query.status, query.search, page, limit)
        .await?;

    let now = Utc::now();
    let items = quotes.into_iter().map(|q| QuoteView::at(q, now)).collect();
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}
