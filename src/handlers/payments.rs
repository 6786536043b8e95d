use crate::{
    auth::Subject,
    handlers::common::paginated,
    models::{
        payment_option::{self, PaymentMethodType},
        payment_proof::{self, ProofStatus},
    },
    services::payments::{NewPaymentOption, ProofReview},
    ApiCreated, ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentOptionView {
    pub id: Uuid,
    pub method_type: PaymentMethodType,
    pub display_name: String,
    /// Account number, wallet address or other payer instructions
    pub details: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<payment_option::Model> for PaymentOptionView {
    fn from(model: payment_option::Model) -> Self {
        Self {
            id: model.id,
            method_type: model.method_type,
            display_name: model.display_name,
            details: model.details,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentProofView {
    pub id: Uuid,
    pub shipment_id: Uuid,
    /// The exception event this proof answers
    pub tracking_event_id: Uuid,
    pub payer_email: String,
    pub payment_method: String,
    pub amount: Option<Decimal>,
    pub reference: String,
    pub note: Option<String>,
    pub status: ProofStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

impl From<payment_proof::Model> for PaymentProofView {
    fn from(model: payment_proof::Model) -> Self {
        Self {
            id: model.id,
            shipment_id: model.shipment_id,
            tracking_event_id: model.tracking_event_id,
            payer_email: model.payer_email,
            payment_method: model.payment_method,
            amount: model.amount,
            reference: model.reference,
            note: model.note,
            status: model.status,
            created_at: model.created_at,
            reviewed_at: model.reviewed_at,
            reviewed_by: model.reviewed_by,
        }
    }
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProofListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ProofStatus>,
    pub shipment_id: Option<Uuid>,
}

/// Active payment options, as offered to guests
#[utoipa::path(
    get,
    path = "/api/v1/payment-options",
    responses(
        (status = 200, description = "Active payment options", body = ApiResponse<Vec<PaymentOptionView>>)
    ),
    tag = "payments"
)]
pub async fn list_active_options(
    State(state): State<AppState>,
) -> ApiResult<Vec<PaymentOptionView>> {
    let options = state.payment_service().active_options().await?;
    Ok(Json(ApiResponse::success(
        options.into_iter().map(PaymentOptionView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/payment-options",
    responses(
        (status = 200, description = "Whole catalog, inactive included", body = ApiResponse<Vec<PaymentOptionView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_options(State(state): State<AppState>) -> ApiResult<Vec<PaymentOptionView>> {
    let options = state.payment_service().list_options().await?;
    Ok(Json(ApiResponse::success(
        options.into_iter().map(PaymentOptionView::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/payment-options",
    request_body = NewPaymentOption,
    responses(
        (status = 201, description = "Payment option created", body = ApiResponse<PaymentOptionView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_option(
    State(state): State<AppState>,
    Json(payload): Json<NewPaymentOption>,
) -> ApiCreated<PaymentOptionView> {
    let option = state.payment_service().create_option(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PaymentOptionView::from(option))),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/payment-options/{id}",
    params(("id" = Uuid, Path, description = "Payment option ID")),
    responses(
        (status = 204, description = "Payment option deleted"),
        (status = 404, description = "Payment option not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_option(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::errors::ServiceError> {
    state.payment_service().delete_option(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/payment-proofs",
    params(ProofListQuery),
    responses(
        (status = 200, description = "Payment proofs listed", body = ApiResponse<PaginatedResponse<PaymentProofView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_proofs(
    State(state): State<AppState>,
    Query(query): Query<ProofListQuery>,
) -> ApiResult<PaginatedResponse<PaymentProofView>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let (proofs, total) = state
        .payment_service()
        .list_proofs(query.status, query.shipment_id, page, limit)
        .await?;

    let items = proofs.into_iter().map(PaymentProofView::from).collect();
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/payment-proofs/{id}/review",
    params(("id" = Uuid, Path, description = "Payment proof ID")),
    request_body = ProofReview,
    responses(
        (status = 200, description = "Proof verified or rejected", body = ApiResponse<PaymentProofView>),
        (status = 404, description = "Payment proof not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Proof already reviewed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn review_proof(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<Uuid>,
    Json(review): Json<ProofReview>,
) -> ApiResult<PaymentProofView> {
    let proof = state
        .payment_service()
        .review_proof(id, review, subject.user_id)
        .await?;
    Ok(Json(ApiResponse::success(PaymentProofView::from(proof))))
}
