use crate::api::pagination::PaginationParams;
use crate::api::{
    not_found_response, storage_error_response, success_empty_response,
    success_paginated_response, success_response, validate_request,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use magazine_common::types::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use utoipa_axum::{router::OpenApiRouter, routes};

/// 分页查询分类（公开）。
#[utoipa::path(
    get,
    path = "/v1/categories",
    tag = "Categories",
    params(PaginationParams),
    responses(
        (status = 200, description = "分类分页列表", body = Vec<Category>)
    )
)]
async fn list_public_categories(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    list_page(&state, &trace_id, &pagination).await
}

/// 按 slug 获取分类（公开）。
#[utoipa::path(
    get,
    path = "/v1/categories/{slug}",
    tag = "Categories",
    params(("slug" = String, Path, description = "分类 slug")),
    responses(
        (status = 200, description = "分类详情", body = Category),
        (status = 404, description = "分类不存在", body = crate::api::ApiError)
    )
)]
async fn get_category_by_slug(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match state.store.get_category_by_slug(&slug).await {
        Ok(Some(c)) => success_response(StatusCode::OK, &trace_id, c),
        Ok(None) => not_found_response(&trace_id, "category"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

async fn list_page(
    state: &AppState,
    trace_id: &str,
    pagination: &PaginationParams,
) -> axum::response::Response {
    let total = match state.store.count_categories().await {
        Ok(v) => v,
        Err(e) => return storage_error_response(trace_id, e),
    };
    match state
        .store
        .list_categories(pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => success_paginated_response(StatusCode::OK, trace_id, items, total, pagination),
        Err(e) => storage_error_response(trace_id, e),
    }
}

/// 分页查询分类（后台）。
#[utoipa::path(
    get,
    path = "/v1/admin/categories",
    tag = "Categories",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "分类分页列表", body = Vec<Category>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_categories(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    list_page(&state, &trace_id, &pagination).await
}

/// 获取分类详情。
#[utoipa::path(
    get,
    path = "/v1/admin/categories/{id}",
    tag = "Categories",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "分类 ID")),
    responses(
        (status = 200, description = "分类详情", body = Category),
        (status = 404, description = "分类不存在", body = crate::api::ApiError)
    )
)]
async fn get_category(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_category(&id).await {
        Ok(Some(c)) => success_response(StatusCode::OK, &trace_id, c),
        Ok(None) => not_found_response(&trace_id, "category"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 创建分类。slug 为空时由名称生成；名称与 slug 必须唯一。
#[utoipa::path(
    post,
    path = "/v1/admin/categories",
    tag = "Categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "分类已创建", body = Category),
        (status = 401, description = "未认证", body = crate::api::ApiError),
        (status = 422, description = "名称或 slug 重复/不合法", body = crate::api::ApiError)
    )
)]
async fn create_category(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    match state
        .store
        .create_category(req.name.trim(), req.slug.as_deref(), req.description)
        .await
    {
        Ok(c) => {
            tracing::info!(trace_id = %trace_id, id = %c.id, slug = %c.slug, "Category created");
            success_response(StatusCode::CREATED, &trace_id, c)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 更新分类。
#[utoipa::path(
    put,
    path = "/v1/admin/categories/{id}",
    tag = "Categories",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "分类 ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "分类已更新", body = Category),
        (status = 404, description = "分类不存在", body = crate::api::ApiError),
        (status = 422, description = "名称或 slug 重复/不合法", body = crate::api::ApiError)
    )
)]
async fn update_category(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    match state
        .store
        .update_category(
            &id,
            req.name.map(|n| n.trim().to_string()),
            req.slug,
            req.description,
        )
        .await
    {
        Ok(c) => success_response(StatusCode::OK, &trace_id, c),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除分类（软删除）。
#[utoipa::path(
    delete,
    path = "/v1/admin/categories/{id}",
    tag = "Categories",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "分类 ID")),
    responses(
        (status = 200, description = "分类已删除"),
        (status = 404, description = "分类不存在", body = crate::api::ApiError)
    )
)]
async fn delete_category(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_category(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "category deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn public_category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_public_categories))
        .routes(routes!(get_category_by_slug))
}

pub fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_categories, create_category))
        .routes(routes!(get_category, update_category, delete_category))
}
