//! Signed-in client's own profile and shipments.

use crate::{
    auth::Subject,
    handlers::{
        common::{paginated, signed_in_user},
        profiles::ProfileView,
        shipments::{ShipmentDetail, ShipmentView},
    },
    models::ShipmentStatus,
    services::profiles::ProfileUpdate,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyShipmentsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ShipmentStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Caller's profile", body = ApiResponse<ProfileView>),
        (status = 401, description = "Sign in required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> ApiResult<ProfileView> {
    let user_id = signed_in_user(&subject)?;
    let profile = state.profile_service().get_profile(user_id).await?;
    Ok(Json(ApiResponse::success(ProfileView::from(profile))))
}

#[utoipa::path(
    put,
    path = "/api/v1/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Sign in required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ProfileView> {
    let user_id = signed_in_user(&subject)?;
    let profile = state
        .profile_service()
        .update_own_profile(user_id, update)
        .await?;
    Ok(Json(ApiResponse::success(ProfileView::from(profile))))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/shipments",
    params(MyShipmentsQuery),
    responses(
        (status = 200, description = "Caller's shipments", body = ApiResponse<PaginatedResponse<ShipmentView>>),
        (status = 401, description = "Sign in required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn list_my_shipments(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Query(query): Query<MyShipmentsQuery>,
) -> ApiResult<PaginatedResponse<ShipmentView>> {
    let user_id = signed_in_user(&subject)?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let (records, total) = state
        .shipment_service()
        .list_customer_shipments(user_id, query.status, page, limit)
        .await?;

    let items = records.into_iter().map(ShipmentView::from).collect();
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment with history", body = ApiResponse<ShipmentDetail>),
        (status = 404, description = "Not one of the caller's shipments", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn get_my_shipment(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentDetail> {
    let user_id = signed_in_user(&subject)?;
    let shipment = state
        .shipment_service()
        .get_customer_shipment(user_id, id)
        .await?;
    let events = state.tracking_service().history(shipment.id).await?;
    Ok(Json(ApiResponse::success(ShipmentDetail::new(shipment, events))))
}
