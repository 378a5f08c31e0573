use crate::api::pagination::PaginationParams;
use crate::api::{
    check_category_exists, not_found_response, storage_error_response, success_empty_response,
    success_paginated_response, success_response, validate_request,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use magazine_common::types::{ApprovedArticle, PublishStatus, UpdateApprovedArticleRequest};
use magazine_storage::{ApprovedArticleFilter, ApprovedArticleUpdate};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct PublicArticleQuery {
    /// 按分类 slug 过滤
    #[param(required = false)]
    category: Option<String>,
    /// 标题关键字
    #[param(required = false)]
    search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct AdminArticleQuery {
    /// 按状态过滤（published / archived）
    #[param(required = false)]
    status: Option<PublishStatus>,
    /// 按分类 ID 过滤
    #[param(required = false)]
    category_id: Option<String>,
    /// 标题关键字
    #[param(required = false)]
    search: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn list_page(
    state: &AppState,
    trace_id: &str,
    filter: &ApprovedArticleFilter,
    pagination: &PaginationParams,
) -> Response {
    let total = match state.store.count_approved_articles(filter).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(trace_id, e),
    };
    match state
        .store
        .list_approved_articles(filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => success_paginated_response(StatusCode::OK, trace_id, items, total, pagination),
        Err(e) => storage_error_response(trace_id, e),
    }
}

/// 分页查询已发布文章（公开）。
/// 默认排序：`published_at` 倒序。
#[utoipa::path(
    get,
    path = "/v1/articles",
    tag = "Articles",
    params(PaginationParams, PublicArticleQuery),
    responses(
        (status = 200, description = "已发布文章分页列表", body = Vec<ApprovedArticle>)
    )
)]
async fn list_public_articles(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<PublicArticleQuery>,
) -> impl IntoResponse {
    let category_id = match non_empty(query.category) {
        Some(slug) => match state.store.get_category_by_slug(&slug).await {
            Ok(Some(c)) => Some(c.id),
            // 未知分类返回空列表
            Ok(None) => {
                return success_paginated_response::<ApprovedArticle>(
                    StatusCode::OK,
                    &trace_id,
                    Vec::new(),
                    0,
                    &pagination,
                )
            }
            Err(e) => return storage_error_response(&trace_id, e),
        },
        None => None,
    };
    let filter = ApprovedArticleFilter {
        status: Some(PublishStatus::Published),
        category_id,
        search: non_empty(query.search),
    };
    list_page(&state, &trace_id, &filter, &pagination).await
}

/// 按 slug 获取已发布文章（公开）。归档文章不可见。
#[utoipa::path(
    get,
    path = "/v1/articles/{slug}",
    tag = "Articles",
    params(("slug" = String, Path, description = "文章 slug")),
    responses(
        (status = 200, description = "文章详情", body = ApprovedArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn get_public_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match state.store.get_published_by_slug(&slug).await {
        Ok(Some(a)) => success_response(StatusCode::OK, &trace_id, a),
        Ok(None) => not_found_response(&trace_id, "article"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 分页查询已审核文章（后台，包含归档）。
#[utoipa::path(
    get,
    path = "/v1/admin/approved-articles",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(PaginationParams, AdminArticleQuery),
    responses(
        (status = 200, description = "文章分页列表", body = Vec<ApprovedArticle>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_approved_articles(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<AdminArticleQuery>,
) -> impl IntoResponse {
    let filter = ApprovedArticleFilter {
        status: query.status,
        category_id: non_empty(query.category_id),
        search: non_empty(query.search),
    };
    list_page(&state, &trace_id, &filter, &pagination).await
}

/// 获取已审核文章详情。
#[utoipa::path(
    get,
    path = "/v1/admin/approved-articles/{id}",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "文章详情", body = ApprovedArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn get_approved_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_approved_article(&id).await {
        Ok(Some(a)) => success_response(StatusCode::OK, &trace_id, a),
        Ok(None) => not_found_response(&trace_id, "approved article"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 编辑已审核文章。设置 `featured_image_id` 即关联封面图。
#[utoipa::path(
    put,
    path = "/v1/admin/approved-articles/{id}",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    request_body = UpdateApprovedArticleRequest,
    responses(
        (status = 200, description = "文章已更新", body = ApprovedArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError),
        (status = 422, description = "slug 重复或媒体不存在", body = crate::api::ApiError)
    )
)]
async fn update_approved_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateApprovedArticleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    if let Some(category_id) = &req.category_id {
        if let Err(resp) = check_category_exists(&state, &trace_id, category_id).await {
            return resp;
        }
    }
    let update = ApprovedArticleUpdate {
        title: req.title,
        slug: req.slug,
        content: req.content,
        meta_title: req.meta_title,
        meta_description: req.meta_description,
        meta_keywords: req.meta_keywords,
        category_id: req.category_id,
        featured_image_id: req.featured_image_id,
    };
    match state.store.update_approved_article(&id, update).await {
        Ok(a) => success_response(StatusCode::OK, &trace_id, a),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

async fn set_status(
    state: &AppState,
    trace_id: &str,
    id: &str,
    status: PublishStatus,
) -> Response {
    match state.store.set_publish_status(id, status).await {
        Ok(a) => {
            tracing::info!(trace_id = %trace_id, article_id = %id, status = %status, "Article status changed");
            success_response(StatusCode::OK, trace_id, a)
        }
        Err(e) => storage_error_response(trace_id, e),
    }
}

/// 归档文章（前台不可见）。
#[utoipa::path(
    post,
    path = "/v1/admin/approved-articles/{id}/archive",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "文章已归档", body = ApprovedArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn archive_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    set_status(&state, &trace_id, &id, PublishStatus::Archived).await
}

/// 取消归档，重新发布。
#[utoipa::path(
    post,
    path = "/v1/admin/approved-articles/{id}/publish",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "文章已发布", body = ApprovedArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn publish_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    set_status(&state, &trace_id, &id, PublishStatus::Published).await
}

/// 删除文章（软删除）。
#[utoipa::path(
    delete,
    path = "/v1/admin/approved-articles/{id}",
    tag = "Articles",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "文章已删除"),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn delete_approved_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_approved_article(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "article deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn public_article_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_public_articles))
        .routes(routes!(get_public_article))
}

pub fn approved_article_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_approved_articles))
        .routes(routes!(
            get_approved_article,
            update_approved_article,
            delete_approved_article
        ))
        .routes(routes!(archive_article))
        .routes(routes!(publish_article))
}
