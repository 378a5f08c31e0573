use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, not_found_response, storage_error_response, success_empty_response,
    success_paginated_response, success_response, validate_request,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use magazine_common::types::{CreateUserRequest, UpdateUserRequest, UserInfo, UserRole};
use magazine_storage::auth::hash_password;
use magazine_storage::{NewUser, StorageError, UserUpdate};
use utoipa_axum::{router::OpenApiRouter, routes};

fn hash_or_error(trace_id: &str, password: &str) -> Result<String, Response> {
    hash_password(password).map_err(|e| {
        tracing::error!(trace_id = %trace_id, error = %e, "Password hashing failed");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            trace_id,
            "internal_error",
            "Failed to hash password",
        )
    })
}

/// 分页查询用户。
/// 鉴权：仅管理员。
#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "用户分页列表", body = Vec<UserInfo>),
        (status = 403, description = "非管理员", body = crate::api::ApiError)
    )
)]
async fn list_users(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let total = match state.store.count_users().await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_users(pagination.limit(), pagination.offset())
        .await
    {
        Ok(users) => {
            let items: Vec<UserInfo> = users.iter().map(UserInfo::from).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取用户详情。
#[utoipa::path(
    get,
    path = "/v1/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "用户详情", body = UserInfo),
        (status = 404, description = "用户不存在", body = crate::api::ApiError)
    )
)]
async fn get_user(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_user_by_id(&id).await {
        Ok(Some(u)) => success_response(StatusCode::OK, &trace_id, UserInfo::from(&u)),
        Ok(None) => not_found_response(&trace_id, "user"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 创建用户。角色缺省为 editor。
#[utoipa::path(
    post,
    path = "/v1/admin/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "用户已创建", body = UserInfo),
        (status = 422, description = "邮箱重复或参数不合法", body = crate::api::ApiError)
    )
)]
async fn create_user(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let password_hash = match hash_or_error(&trace_id, &req.password) {
        Ok(h) => h,
        Err(resp) => return resp,
    };
    let new = NewUser {
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        password_hash,
        role: req.role.unwrap_or(UserRole::Editor),
        is_active: req.is_active.unwrap_or(true),
    };
    match state.store.create_user(new).await {
        Ok(u) => {
            tracing::info!(trace_id = %trace_id, user_id = %u.id, role = %u.role, "User created");
            success_response(StatusCode::CREATED, &trace_id, UserInfo::from(&u))
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 更新用户。修改密码、角色或启用状态会使该用户已签发的 token 失效。
/// 管理员不能降级或停用自己。
#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户 ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "用户已更新", body = UserInfo),
        (status = 404, description = "用户不存在", body = crate::api::ApiError),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn update_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    if id == current.id {
        if req.role.is_some_and(|r| r != UserRole::Admin) {
            return storage_error_response(
                &trace_id,
                StorageError::field("role", "cannot demote your own account"),
            );
        }
        if req.is_active == Some(false) {
            return storage_error_response(
                &trace_id,
                StorageError::field("is_active", "cannot deactivate your own account"),
            );
        }
    }
    let password_hash = match req.password.as_deref() {
        Some(p) => match hash_or_error(&trace_id, p) {
            Ok(h) => Some(h),
            Err(resp) => return resp,
        },
        None => None,
    };
    let update = UserUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email.map(|e| e.trim().to_string()),
        password_hash,
        role: req.role,
        is_active: req.is_active,
    };
    match state.store.update_user(&id, update).await {
        Ok(u) => success_response(StatusCode::OK, &trace_id, UserInfo::from(&u)),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除用户。不能删除自己。
#[utoipa::path(
    delete,
    path = "/v1/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "用户已删除"),
        (status = 404, description = "用户不存在", body = crate::api::ApiError),
        (status = 409, description = "不能删除自己", body = crate::api::ApiError)
    )
)]
async fn delete_user(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if id == current.id {
        return error_response(
            StatusCode::CONFLICT,
            &trace_id,
            "conflict",
            "cannot delete your own account",
        );
    }
    match state.store.delete_user(&id).await {
        Ok(()) => {
            tracing::info!(trace_id = %trace_id, user_id = %id, deleted_by = %current.id, "User deleted");
            success_empty_response(StatusCode::OK, &trace_id, "user deleted")
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_users, create_user))
        .routes(routes!(get_user, update_user, delete_user))
}
