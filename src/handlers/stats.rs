use axum::{extract::State, Extension, Json};

use crate::{auth::Actor, services::dashboard::DashboardStats, ApiResponse, ApiResult, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses(
        (status = 200, description = "Shop totals grouped by status and role", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::errors::ErrorResponse)
    ),
    tag = "stats"
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<DashboardStats> {
    let stats = state.services.dashboard.stats(&actor).await?;
    Ok(Json(ApiResponse::success(stats)))
}
