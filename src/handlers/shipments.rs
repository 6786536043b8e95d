use crate::{
    auth::Subject,
    commands::shipments::{NewShipment, ShipmentPatch},
    handlers::common::paginated,
    models::{
        lifecycle::{derive_status, progress_position},
        shipment::{self, PackageType, ServiceType, ShipmentStatus},
        NewTrackingEvent, TrackingEventRecord,
    },
    services::shipments::ShipmentFilter,
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

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<Uuid>,
    /// Tracking number, sender or recipient name
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartyView {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CostView {
    pub base_cost: Decimal,
    pub weight_cost: Decimal,
    pub insurance_cost: Decimal,
    pub signature_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
}

/// Shipment as shown to admins and to the owning client
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "990e8400-e29b-41d4-a716-446655440000",
    "tracking_number": "CL240312K7M2Q9XD",
    "status": "in_transit",
    "service_type": "standard",
    "package_type": "box",
    "weight_kg": "3",
    "costs": {
        "base_cost": "15.00",
        "weight_cost": "7.50",
        "insurance_cost": "0",
        "signature_cost": "0",
        "tax_amount": "1.80",
        "total_cost": "24.30"
    }
}))]
pub struct ShipmentView {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer_id: Option<Uuid>,
    pub sender: PartyView,
    pub recipient: PartyView,
    pub package_type: PackageType,
    pub weight_kg: Decimal,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub declared_value: Decimal,
    pub package_description: Option<String>,
    pub service_type: ServiceType,
    pub delivery_instructions: Option<String>,
    pub signature_required: bool,
    pub insurance_required: bool,
    /// Cached status; the event log is authoritative
    pub status: ShipmentStatus,
    pub costs: CostView,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<shipment::Model> for ShipmentView {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            tracking_number: model.tracking_number,
            customer_id: model.customer_id,
            sender: PartyView {
                name: model.sender_name,
                email: model.sender_email,
                phone: model.sender_phone,
                address: model.sender_address,
                city: model.sender_city,
                state: model.sender_state,
                postal_code: model.sender_postal_code,
                country: model.sender_country,
            },
            recipient: PartyView {
                name: model.recipient_name,
                email: model.recipient_email,
                phone: model.recipient_phone,
                address: model.recipient_address,
                city: model.recipient_city,
                state: model.recipient_state,
                postal_code: model.recipient_postal_code,
                country: model.recipient_country,
            },
            package_type: model.package_type,
            weight_kg: model.weight_kg,
            length_cm: model.length_cm,
            width_cm: model.width_cm,
            height_cm: model.height_cm,
            declared_value: model.declared_value,
            package_description: model.package_description,
            service_type: model.service_type,
            delivery_instructions: model.delivery_instructions,
            signature_required: model.signature_required,
            insurance_required: model.insurance_required,
            status: model.status,
            costs: CostView {
                base_cost: model.base_cost,
                weight_cost: model.weight_cost,
                insurance_cost: model.insurance_cost,
                signature_cost: model.signature_cost,
                tax_amount: model.tax_amount,
                total_cost: model.total_cost,
            },
            estimated_delivery_date: model.estimated_delivery_date,
            actual_delivery_date: model.actual_delivery_date,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Shipment with its full history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentDetail {
    pub shipment: ShipmentView,
    pub events: Vec<TrackingEventRecord>,
    /// Derived from the latest event
    pub current_status: ShipmentStatus,
    pub progress: Option<usize>,
}

impl ShipmentDetail {
    pub fn new(model: shipment::Model, events: Vec<TrackingEventRecord>) -> Self {
        let current_status = derive_status(events.last().map(|e| e.event_type), model.status);
        Self {
            progress: progress_position(events.len()),
            current_status,
            shipment: ShipmentView::from(model),
            events,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedShipment {
    pub id: Uuid,
    pub events_removed: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<ShipmentView>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let filter = ShipmentFilter {
        status: query.status,
        customer_id: query.customer_id,
        search: query.search,
    };
    let (records, total) = state
        .shipment_service()
        .list_shipments(filter, page, limit)
        .await?;

    let items = records.into_iter().map(ShipmentView::from).collect();
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/shipments",
    request_body = NewShipment,
    responses(
        (status = 201, description = "Shipment created and priced", body = ApiResponse<ShipmentView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Pricing or tracking service failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Json(payload): Json<NewShipment>,
) -> ApiCreated<ShipmentView> {
    let created = state
        .shipment_service()
        .create_shipment(payload, subject.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ShipmentView::from(created))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment with history", body = ApiResponse<ShipmentDetail>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentDetail> {
    let shipment = state.shipment_service().get_shipment(id).await?;
    let events = state.tracking_service().history(id).await?;
    Ok(Json(ApiResponse::success(ShipmentDetail::new(shipment, events))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ShipmentPatch,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<ShipmentView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ShipmentPatch>,
) -> ApiResult<ShipmentView> {
    let updated = state.shipment_service().update_shipment(id, patch).await?;
    Ok(Json(ApiResponse::success(ShipmentView::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment and its history deleted", body = ApiResponse<DeletedShipment>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedShipment> {
    let events_removed = state.shipment_service().delete_shipment(id).await?;
    Ok(Json(
        ApiResponse::success(DeletedShipment { id, events_removed })
            .with_message(format!("Shipment deleted with {} tracking events", events_removed)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/shipments/{id}/events",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Tracking history, oldest first", body = ApiResponse<Vec<TrackingEventRecord>>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<TrackingEventRecord>> {
    let events = state.tracking_service().shipment_history(id).await?;
    Ok(Json(ApiResponse::success(events)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/shipments/{id}/events",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = NewTrackingEvent,
    responses(
        (status = 201, description = "Event appended", body = ApiResponse<TrackingEventRecord>),
        (status = 400, description = "Event rejected before any write", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition or concurrent append", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn append_event(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<Uuid>,
    Json(event): Json<NewTrackingEvent>,
) -> ApiCreated<TrackingEventRecord> {
    let record = state
        .tracking_service()
        .append_event(id, event, subject.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}
