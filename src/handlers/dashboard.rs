use axum::{extract::State, routing::get, Json, Router};

use crate::services::dashboard::DashboardStats;
use crate::{ApiResponse, ApiResult, AppState};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/stats", get(dashboard_stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Inventory, rental and revenue figures as of now", body = ApiResponse<DashboardStats>)
    ),
    tag = "dashboard"
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.services.dashboard.stats(state.clock.now()).await?;
    Ok(Json(ApiResponse::success(stats)))
}
