use crate::{services::analytics::AnalyticsSummary, ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json};

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics/summary",
    responses(
        (status = 200, description = "Dashboard figures", body = ApiResponse<AnalyticsSummary>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn summary(State(state): State<AppState>) -> ApiResult<AnalyticsSummary> {
    let summary = state.analytics_service().summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}
