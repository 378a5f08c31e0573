use crate::api::pagination::{deserialize_optional_bool, PaginationParams};
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
use magazine_common::types::{
    CreateFacebookPostRequest, CreateSourceArticleRequest, FacebookPost, SourceArticle,
};
use magazine_storage::{NewFacebookPost, NewSourceArticle};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct SourceArticleQuery {
    /// 按是否已处理过滤
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    is_processed: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct FacebookPostQuery {
    /// 按是否已处理过滤
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    processed: Option<bool>,
}

// ---- 采集文章 ----

/// 分页查询采集文章。
#[utoipa::path(
    get,
    path = "/v1/admin/articles",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(PaginationParams, SourceArticleQuery),
    responses(
        (status = 200, description = "采集文章分页列表", body = Vec<SourceArticle>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_source_articles(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<SourceArticleQuery>,
) -> impl IntoResponse {
    let total = match state.store.count_source_articles(query.is_processed).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_source_articles(query.is_processed, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取采集文章详情。
#[utoipa::path(
    get,
    path = "/v1/admin/articles/{id}",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "采集文章详情", body = SourceArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn get_source_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_source_article(&id).await {
        Ok(Some(a)) => success_response(StatusCode::OK, &trace_id, a),
        Ok(None) => not_found_response(&trace_id, "article"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 手动录入一篇采集文章。
#[utoipa::path(
    post,
    path = "/v1/admin/articles",
    tag = "Sources",
    security(("bearer_auth" = [])),
    request_body = CreateSourceArticleRequest,
    responses(
        (status = 201, description = "文章已录入", body = SourceArticle),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn create_source_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateSourceArticleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let new = NewSourceArticle {
        title: req.title,
        slug: req.slug,
        content: req.content,
        source_url: req.source_url,
        source_name: req.source_name,
        source_icon: req.source_icon,
    };
    match state.store.insert_source_article(new).await {
        Ok(a) => success_response(StatusCode::CREATED, &trace_id, a),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除采集文章。
#[utoipa::path(
    delete,
    path = "/v1/admin/articles/{id}",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "文章 ID")),
    responses(
        (status = 200, description = "文章已删除"),
        (status = 404, description = "文章不存在", body = crate::api::ApiError)
    )
)]
async fn delete_source_article(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_source_article(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "article deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

// ---- Facebook 帖子 ----

/// 分页查询 Facebook 帖子。
#[utoipa::path(
    get,
    path = "/v1/admin/facebook-posts",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(PaginationParams, FacebookPostQuery),
    responses(
        (status = 200, description = "帖子分页列表", body = Vec<FacebookPost>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_facebook_posts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<FacebookPostQuery>,
) -> impl IntoResponse {
    let total = match state.store.count_facebook_posts(query.processed).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_facebook_posts(query.processed, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取 Facebook 帖子详情。
#[utoipa::path(
    get,
    path = "/v1/admin/facebook-posts/{id}",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "帖子 ID")),
    responses(
        (status = 200, description = "帖子详情", body = FacebookPost),
        (status = 404, description = "帖子不存在", body = crate::api::ApiError)
    )
)]
async fn get_facebook_post(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_facebook_post(&id).await {
        Ok(Some(p)) => success_response(StatusCode::OK, &trace_id, p),
        Ok(None) => not_found_response(&trace_id, "facebook post"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 手动录入一条 Facebook 帖子。
#[utoipa::path(
    post,
    path = "/v1/admin/facebook-posts",
    tag = "Sources",
    security(("bearer_auth" = [])),
    request_body = CreateFacebookPostRequest,
    responses(
        (status = 201, description = "帖子已录入", body = FacebookPost),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn create_facebook_post(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateFacebookPostRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let new = NewFacebookPost {
        content: req.content,
        source_url: req.source_url,
        page_or_group_name: req.page_or_group_name,
    };
    match state.store.insert_facebook_post(new).await {
        Ok(p) => success_response(StatusCode::CREATED, &trace_id, p),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除 Facebook 帖子。
#[utoipa::path(
    delete,
    path = "/v1/admin/facebook-posts/{id}",
    tag = "Sources",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "帖子 ID")),
    responses(
        (status = 200, description = "帖子已删除"),
        (status = 404, description = "帖子不存在", body = crate::api::ApiError)
    )
)]
async fn delete_facebook_post(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_facebook_post(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "facebook post deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn source_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_source_articles, create_source_article))
        .routes(routes!(get_source_article, delete_source_article))
        .routes(routes!(list_facebook_posts, create_facebook_post))
        .routes(routes!(get_facebook_post, delete_facebook_post))
}
