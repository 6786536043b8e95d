//! Public tracker: history, live updates and payment proofs for a
//! tracking number.

use crate::{
    errors::ServiceError,
    events::FeedSubscription,
    handlers::payments::{PaymentOptionView, PaymentProofView},
    models::{
        lifecycle::PROGRESS_STEPS, PackageType, ServiceType, ShipmentStatus, TrackingEventRecord,
    },
    services::{
        payments::NewPaymentProof,
        tracking::{PaymentResolution, TrackerView},
    },
    ApiCreated, ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        Json,
    },
};
use chrono::{DateTime, Utc};
use futures::{stream, Stream};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// The slice of a shipment a guest may see
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackedShipment {
    pub tracking_number: String,
    pub service_type: ServiceType,
    pub package_type: PackageType,
    pub origin_city: String,
    pub origin_country: String,
    pub destination_city: String,
    pub destination_country: String,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResolutionView {
    pub event_id: Uuid,
    pub amount: Option<Decimal>,
    /// Methods named on the exception event
    pub payment_methods: Vec<String>,
    pub options: Vec<PaymentOptionView>,
    pub can_make_payment: bool,
}

impl From<PaymentResolution> for PaymentResolutionView {
    fn from(resolution: PaymentResolution) -> Self {
        Self {
            event_id: resolution.event_id,
            amount: resolution.amount,
            payment_methods: resolution.payment_methods,
            options: resolution
                .options
                .into_iter()
                .map(PaymentOptionView::from)
                .collect(),
            can_make_payment: resolution.can_make_payment,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackerResponse {
    pub shipment: TrackedShipment,
    /// Oldest first
    pub events: Vec<TrackingEventRecord>,
    pub latest_event: Option<TrackingEventRecord>,
    pub current_status: ShipmentStatus,
    /// Index into `progress_steps`; absent until the first event
    pub progress: Option<usize>,
    pub progress_steps: Vec<String>,
    /// Present only while the shipment is in exception
    pub payment: Option<PaymentResolutionView>,
}

impl From<TrackerView> for TrackerResponse {
    fn from(view: TrackerView) -> Self {
        let latest_event = view.latest_event().cloned();
        let shipment = view.shipment;
        Self {
            shipment: TrackedShipment {
                tracking_number: shipment.tracking_number,
                service_type: shipment.service_type,
                package_type: shipment.package_type,
                origin_city: shipment.sender_city,
                origin_country: shipment.sender_country,
                destination_city: shipment.recipient_city,
                destination_country: shipment.recipient_country,
                estimated_delivery_date: shipment.estimated_delivery_date,
                actual_delivery_date: shipment.actual_delivery_date,
                created_at: shipment.created_at,
            },
            events: view.events,
            latest_event,
            current_status: view.current_status,
            progress: view.progress,
            progress_steps: PROGRESS_STEPS.iter().map(|s| s.to_string()).collect(),
            payment: view.payment.map(PaymentResolutionView::from),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/track/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "Tracker page", body = ApiResponse<TrackerResponse>),
        (status = 404, description = "Unknown tracking number", body = crate::errors::ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn track_shipment(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> ApiResult<TrackerResponse> {
    let view = state.tracking_service().tracker_view(&tracking_number).await?;
    Ok(Json(ApiResponse::success(TrackerResponse::from(view))))
}

/// Server-sent events for every event appended after the client connects
#[utoipa::path(
    get,
    path = "/api/v1/track/{tracking_number}/events/stream",
    params(("tracking_number" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "`tracking_event` messages as they are appended", content_type = "text/event-stream"),
        (status = 404, description = "Unknown tracking number", body = crate::errors::ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn stream_tracking_events(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, ServiceError> {
    let subscription = state.tracking_service().subscribe(&tracking_number).await?;
    debug!(shipment_id = %subscription.shipment_id(), "opening tracking event stream");

    Ok(Sse::new(event_stream(subscription)).keep_alive(KeepAlive::default()))
}

/// Ends when the feed closes; dropping it on disconnect releases the subscription.
fn event_stream(
    subscription: FeedSubscription,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    stream::unfold(subscription, |mut subscription| async move {
        let message = match subscription.recv().await {
            Ok(record) => SseEvent::default()
                .event("tracking_event")
                .id(record.sequence.to_string())
                .json_data(&record),
            // Slow client: tell it to refetch the history
            Err(RecvError::Lagged(skipped)) => Ok(SseEvent::default()
                .event("lagged")
                .data(skipped.to_string())),
            Err(RecvError::Closed) => return None,
        };
        Some((message, subscription))
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/track/{tracking_number}/payment-proofs",
    params(("tracking_number" = String, Path, description = "Tracking number")),
    request_body = NewPaymentProof,
    responses(
        (status = 201, description = "Proof recorded for review", body = ApiResponse<PaymentProofView>),
        (status = 400, description = "Shipment not in exception or unknown method", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tracking number", body = crate::errors::ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn submit_payment_proof(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
    Json(proof): Json<NewPaymentProof>,
) -> ApiCreated<PaymentProofView> {
    let saved = state
        .payment_service()
        .submit_proof(&tracking_number, proof)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PaymentProofView::from(saved))),
    ))
}
