pub mod ai_settings;
pub mod categories;
pub mod dashboard;
pub mod drafts;
pub mod media;
pub mod pagination;
pub mod published;
pub mod sources;
pub mod users;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use magazine_ai::signature::{verify, SIGNATURE_HEADER};
use magazine_storage::{FieldErrors, StorageError};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use validator::{Validate, ValidationErrors};

use crate::api::pagination::PaginationParams;

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

/// 分页数据结构
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// 数据项列表
    pub items: Vec<T>,
    /// 总数
    pub total: u64,
    /// 当前页（从 1 开始）
    pub current_page: u64,
    /// 每页数量
    pub per_page: u64,
    /// 最后一页页码（无数据时为 1）
    pub last_page: u64,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    pagination: &PaginationParams,
) -> Response
where
    T: Serialize,
{
    let per_page = pagination.per_page();
    let last_page = total.div_ceil(per_page).max(1);
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            current_page: pagination.page(),
            per_page,
            last_page,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "token_expired" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "validation_failed" => 1006,
        "payload_too_large" => 1007,
        "forbidden" => 1010,
        "storage_error" => 1501,
        "internal_error" => 1500,
        "upstream_error" => 1502,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// 422 响应，`data` 为字段 -> 错误信息列表
pub fn validation_error_response(trace_id: &str, fields: &FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse {
            err_code: to_custom_error_code("validation_failed"),
            err_msg: "validation failed".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(fields),
        }),
    )
        .into_response()
}

fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("invalid ({})", e.code),
            })
            .collect();
        out.insert(field.to_string(), messages);
    }
    out
}

/// Run the `validator` rules of a request body.
pub fn validate_request<T: Validate>(trace_id: &str, req: &T) -> Result<(), Response> {
    req.validate()
        .map_err(|e| validation_error_response(trace_id, &field_errors(&e)))
}

/// Map a storage failure to the HTTP error contract. Raw database errors are
/// logged and replaced with a generic message.
pub fn storage_error_response(trace_id: &str, err: StorageError) -> Response {
    match err {
        StorageError::NotFound { entity, .. } => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &format!("{} not found", entity.replace('_', " ")),
        ),
        StorageError::Validation(fields) => validation_error_response(trace_id, &fields),
        StorageError::Conflict(msg) => {
            error_response(StatusCode::CONFLICT, trace_id, "conflict", &msg)
        }
        StorageError::InvalidTransition { entity, from, to } => error_response(
            StatusCode::CONFLICT,
            trace_id,
            "conflict",
            &format!("{} cannot move from {from} to {to}", entity.replace('_', " ")),
        ),
        other => {
            tracing::error!(trace_id = %trace_id, error = %other, "Storage operation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 422 on `category_id` when the referenced category does not exist.
pub async fn check_category_exists(
    state: &AppState,
    trace_id: &str,
    category_id: &str,
) -> Result<(), Response> {
    match state.store.get_category(category_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(storage_error_response(
            trace_id,
            StorageError::field("category_id", "does not exist"),
        )),
        Err(e) => Err(storage_error_response(trace_id, e)),
    }
}

/// Check the `X-Signature` header of a callback against its raw body.
pub fn check_signature(
    trace_id: &str,
    headers: &HeaderMap,
    body: &[u8],
    secret: &str,
) -> Result<(), Response> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if verify(secret, body, header) {
        return Ok(());
    }
    tracing::warn!(trace_id = %trace_id, has_header = !header.is_empty(), "Callback signature rejected");
    Err(error_response(
        StatusCode::UNAUTHORIZED,
        trace_id,
        "unauthorized",
        "invalid signature",
    ))
}

/// Parse and validate a signed callback body.
pub fn parse_callback<T>(trace_id: &str, body: &[u8]) -> Result<T, Response>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_slice(body).map_err(|e| {
        let mut fields = FieldErrors::new();
        fields.insert("body".to_string(), vec![e.to_string()]);
        validation_error_response(trace_id, &fields)
    })?;
    validate_request(trace_id, &payload)?;
    Ok(payload)
}

pub fn not_found_response(trace_id: &str, what: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        trace_id,
        "not_found",
        &format!("{what} not found"),
    )
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// 服务版本号
    version: String,
    /// 运行时长（秒）
    uptime_secs: i64,
    /// 存储状态
    storage_status: String,
}

/// 获取服务健康状态。
/// 鉴权：无需 Bearer Token。
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "服务健康状态", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.store.count_categories().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Health check storage query failed");
            "error"
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: storage_status.to_string(),
        },
    )
}

/// 无需鉴权的公开接口（前台读取）
pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(categories::public_category_routes())
        .merge(published::public_article_routes())
}

pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(crate::auth::login))
}

/// 外部服务回调，使用 HMAC 签名鉴权
pub fn callback_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(crate::ai::api::keyword_callback_routes())
        .merge(crate::scrape::api::scrape_callback_routes())
}

/// 需要登录的内容管理接口（admin 与 editor 均可访问）
pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(crate::auth::me))
        .routes(routes!(crate::auth::change_password))
        .merge(categories::category_routes())
        .merge(sources::source_routes())
        .merge(drafts::draft_routes())
        .merge(published::approved_article_routes())
        .merge(media::media_routes())
        .merge(dashboard::dashboard_routes())
        .merge(crate::ai::api::ai_routes())
        .merge(crate::scrape::api::scrape_routes())
}

/// 仅管理员可访问（用户与 AI 设置）
pub fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(users::user_routes())
        .merge(ai_settings::ai_setting_routes())
}
