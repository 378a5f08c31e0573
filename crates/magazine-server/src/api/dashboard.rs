use crate::api::{storage_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use magazine_common::types::DashboardSummary;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 后台首页统计：草稿、文章、关键词改写与待处理来源的数量。
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "统计汇总", body = DashboardSummary),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn dashboard_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.dashboard_summary().await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(dashboard_summary))
}
