use crate::{
    handlers::common::paginated,
    models::profile::{self, UserType},
    services::profiles::AdminProfileUpdate,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<profile::Model> for ProfileView {
    fn from(model: profile::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            company_name: model.company_name,
            address: model.address,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            user_type: model.user_type,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub user_type: Option<UserType>,
    /// Email, name or company
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/profiles",
    params(ProfileListQuery),
    responses(
        (status = 200, description = "Profiles listed", body = ApiResponse<PaginatedResponse<ProfileView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ProfileListQuery>,
) -> ApiResult<PaginatedResponse<ProfileView>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let (profiles, total) = state
        .profile_service()
        .list_profiles(query.user_type, query.search, page, limit)
        .await?;

    let items = profiles.into_iter().map(ProfileView::from).collect();
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = AdminProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileView>),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<AdminProfileUpdate>,
) -> ApiResult<ProfileView> {
    let profile = state.profile_service().update_profile(id, update).await?;
    Ok(Json(ApiResponse::success(ProfileView::from(profile))))
}
