use crate::api::{storage_error_response, success_response, validate_request};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use magazine_common::types::{AiSettingView, UpsertAiSettingRequest};
use magazine_storage::AiSettingInput;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 获取当前 AI 改写配置（api_key 脱敏）。未配置时 `data` 为 null。
/// 鉴权：仅管理员。
#[utoipa::path(
    get,
    path = "/v1/admin/ai-settings",
    tag = "AI",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "AI 配置", body = Option<AiSettingView>),
        (status = 403, description = "非管理员", body = crate::api::ApiError)
    )
)]
async fn get_ai_setting(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.get_ai_setting().await {
        Ok(setting) => success_response(
            StatusCode::OK,
            &trace_id,
            setting.as_ref().map(AiSettingView::from),
        ),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 写入 AI 改写配置。省略 `api_key` 时保留原密钥；
/// 激活一条配置会停用其余配置。
#[utoipa::path(
    put,
    path = "/v1/admin/ai-settings",
    tag = "AI",
    security(("bearer_auth" = [])),
    request_body = UpsertAiSettingRequest,
    responses(
        (status = 200, description = "AI 配置已保存", body = AiSettingView),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn upsert_ai_setting(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<UpsertAiSettingRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let input = AiSettingInput {
        provider: req.provider.trim().to_string(),
        api_key: req.api_key,
        model_name: req.model_name.trim().to_string(),
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        is_active: req.is_active.unwrap_or(true),
    };
    match state.store.upsert_ai_setting(input).await {
        Ok(setting) => {
            tracing::info!(
                trace_id = %trace_id,
                provider = %setting.provider,
                model = %setting.model_name,
                active = setting.is_active,
                "AI setting saved"
            );
            success_response(StatusCode::OK, &trace_id, AiSettingView::from(&setting))
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn ai_setting_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_ai_setting, upsert_ai_setting))
}
