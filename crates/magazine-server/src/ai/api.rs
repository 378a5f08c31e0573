use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use magazine_ai::{KeywordJob, RewriteInput, RewriteOptions, RewriteOutput};
use magazine_common::types::{
    ConvertKeywordRewriteRequest, ConvertedArticle, KeywordRewrite, KeywordRewriteCallback,
    KeywordRewriteStatusView, RewriteSourceRequest, RewriteStatus, RewrittenArticle,
    SubmitKeywordRequest,
};
use magazine_storage::{
    CallbackOutcome, KeywordConversion, KeywordRewriteFilter, NewDraft, StorageError,
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::pagination::PaginationParams;
use crate::api::{
    check_category_exists, check_signature, error_response, not_found_response, parse_callback,
    storage_error_response, success_empty_response, success_paginated_response, success_response,
    validate_request,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;

pub fn ai_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_keyword_rewrites, submit_keyword))
        .routes(routes!(get_keyword_rewrite, delete_keyword_rewrite))
        .routes(routes!(keyword_rewrite_status))
        .routes(routes!(retry_keyword_rewrite))
        .routes(routes!(convert_keyword_rewrite))
        .routes(routes!(rewrite_source_article))
        .routes(routes!(rewrite_facebook_post))
}

pub fn keyword_callback_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(keyword_callback))
}

// ===== 数据结构 =====

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListKeywordRewritesQuery {
    /// 按状态过滤 (pending, processing, completed, failed)
    #[param(required = false)]
    status: Option<RewriteStatus>,
    /// 关键词子串
    #[param(required = false)]
    keyword: Option<String>,
}

// ===== 改写服务调用 =====

/// Options forwarded to the rewrite service, taken from the active AI setting.
async fn rewrite_options(state: &AppState, trace_id: &str) -> Option<RewriteOptions> {
    match state.store.get_active_ai_setting().await {
        Ok(Some(s)) => Some(RewriteOptions {
            provider: s.provider,
            model_name: s.model_name,
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            api_key: s.api_key,
        }),
        Ok(None) => None,
        Err(e) => {
            // 读取失败时不带 options 继续，由改写服务使用默认配置
            tracing::warn!(trace_id = %trace_id, error = %e, "Failed to load AI setting");
            None
        }
    }
}

/// Hand a pending record to the rewrite service and record the outcome.
async fn dispatch_keyword(
    state: &AppState,
    trace_id: &str,
    record: &KeywordRewrite,
) -> Result<KeywordRewrite, StorageError> {
    let job = KeywordJob {
        rewrite_id: record.id.clone(),
        keyword: record.keyword.clone(),
        callback_url: state.config.keyword_callback_url(),
        options: rewrite_options(state, trace_id).await,
    };
    match state.rewriter.dispatch_keyword(job).await {
        Ok(()) => {
            tracing::info!(trace_id = %trace_id, rewrite_id = %record.id, keyword = %record.keyword, "Keyword rewrite dispatched");
            state.store.mark_keyword_dispatched(&record.id).await
        }
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, rewrite_id = %record.id, error = %e, "Keyword rewrite dispatch failed");
            state
                .store
                .mark_keyword_dispatch_failed(&record.id, "rewrite service unavailable")
                .await
        }
    }
}

/// Call the rewrite service synchronously; failures become a 502.
async fn rewrite_content(
    state: &AppState,
    trace_id: &str,
    title: Option<String>,
    content: String,
) -> Result<RewriteOutput, Response> {
    let input = RewriteInput {
        title,
        content,
        options: rewrite_options(state, trace_id).await,
    };
    state.rewriter.rewrite(input).await.map_err(|e| {
        tracing::error!(trace_id = %trace_id, error = %e, "Rewrite service call failed");
        error_response(
            StatusCode::BAD_GATEWAY,
            trace_id,
            "upstream_error",
            "AI rewrite service failed",
        )
    })
}

fn draft_from_output(output: RewriteOutput, category_id: String, user_id: String) -> NewDraft {
    NewDraft {
        title: output.title,
        content: output.content,
        meta_title: output.meta_title,
        meta_description: output.meta_description,
        meta_keywords: output.meta_keywords,
        category_id: Some(category_id),
        user_id: Some(user_id),
        ..Default::default()
    }
}

// ===== 关键词改写 =====

/// 分页查询关键词改写记录。
#[utoipa::path(
    get,
    path = "/v1/admin/keyword-rewrites",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(PaginationParams, ListKeywordRewritesQuery),
    responses(
        (status = 200, description = "改写记录分页列表", body = Vec<KeywordRewrite>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_keyword_rewrites(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<ListKeywordRewritesQuery>,
) -> impl IntoResponse {
    let filter = KeywordRewriteFilter {
        status: query.status,
        keyword: query
            .keyword
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()),
    };
    let total = match state.store.count_keyword_rewrites(&filter).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_keyword_rewrites(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 提交关键词改写任务。
/// 记录先以 pending 落库，再同步派发给改写服务：成功为 processing，失败为 failed。
/// 两种情况均返回 201 与记录本身，结果通过 `/status` 轮询。
#[utoipa::path(
    post,
    path = "/v1/admin/keyword-rewrites",
    tag = "AI",
    security(("bearer_auth" = [])),
    request_body = SubmitKeywordRequest,
    responses(
        (status = 201, description = "任务已创建", body = KeywordRewrite),
        (status = 422, description = "关键词为空", body = crate::api::ApiError)
    )
)]
async fn submit_keyword(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(req): Json<SubmitKeywordRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let keyword = req.keyword.trim();
    if keyword.is_empty() {
        return storage_error_response(&trace_id, StorageError::field("keyword", "can't be blank"));
    }
    let record = match state
        .store
        .create_keyword_rewrite(keyword, Some(&current.id))
        .await
    {
        Ok(r) => r,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match dispatch_keyword(&state, &trace_id, &record).await {
        Ok(r) => success_response(StatusCode::CREATED, &trace_id, r),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取关键词改写详情（包含改写内容与原始搜索结果）。
#[utoipa::path(
    get,
    path = "/v1/admin/keyword-rewrites/{id}",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "改写记录 ID")),
    responses(
        (status = 200, description = "改写记录详情", body = KeywordRewrite),
        (status = 404, description = "记录不存在", body = crate::api::ApiError)
    )
)]
async fn get_keyword_rewrite(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_keyword_rewrite(&id).await {
        Ok(Some(r)) => success_response(StatusCode::OK, &trace_id, r),
        Ok(None) => not_found_response(&trace_id, "keyword rewrite"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 轮询改写状态。`terminal` 为 true 时可停止轮询。
#[utoipa::path(
    get,
    path = "/v1/admin/keyword-rewrites/{id}/status",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "改写记录 ID")),
    responses(
        (status = 200, description = "当前状态", body = KeywordRewriteStatusView),
        (status = 404, description = "记录不存在", body = crate::api::ApiError)
    )
)]
async fn keyword_rewrite_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_keyword_rewrite(&id).await {
        Ok(Some(r)) => success_response(
            StatusCode::OK,
            &trace_id,
            KeywordRewriteStatusView::from(&r),
        ),
        Ok(None) => not_found_response(&trace_id, "keyword rewrite"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 重试失败的改写：重置为 pending 后重新派发。
#[utoipa::path(
    post,
    path = "/v1/admin/keyword-rewrites/{id}/retry",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "改写记录 ID")),
    responses(
        (status = 200, description = "已重新派发", body = KeywordRewrite),
        (status = 404, description = "记录不存在", body = crate::api::ApiError),
        (status = 409, description = "仅 failed 状态可重试", body = crate::api::ApiError)
    )
)]
async fn retry_keyword_rewrite(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let record = match state.store.reset_keyword_for_retry(&id).await {
        Ok(r) => r,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match dispatch_keyword(&state, &trace_id, &record).await {
        Ok(r) => success_response(StatusCode::OK, &trace_id, r),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 将已完成的改写转换为待审核草稿，或在 `publish=true` 时直接发布。每条记录只能转换一次。
#[utoipa::path(
    post,
    path = "/v1/admin/keyword-rewrites/{id}/convert",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "改写记录 ID")),
    request_body = ConvertKeywordRewriteRequest,
    responses(
        (status = 201, description = "已转换", body = ConvertedArticle),
        (status = 404, description = "记录不存在", body = crate::api::ApiError),
        (status = 409, description = "仅 completed 且未转换过的记录可转换", body = crate::api::ApiError),
        (status = 422, description = "分类不存在", body = crate::api::ApiError)
    )
)]
async fn convert_keyword_rewrite(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConvertKeywordRewriteRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    if let Err(resp) = check_category_exists(&state, &trace_id, &req.category_id).await {
        return resp;
    }
    let conversion = KeywordConversion {
        category_id: req.category_id,
        title: req.title,
        slug: req.slug,
        publish: req.publish.unwrap_or(false),
        user_id: Some(current.id),
    };
    match state.store.convert_keyword_rewrite(&id, conversion).await {
        Ok(converted) => {
            let kind = match &converted {
                ConvertedArticle::Draft(_) => "draft",
                ConvertedArticle::Published(_) => "published",
            };
            tracing::info!(trace_id = %trace_id, rewrite_id = %id, kind, "Keyword rewrite converted");
            success_response(StatusCode::CREATED, &trace_id, converted)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除关键词改写记录（软删除）。
#[utoipa::path(
    delete,
    path = "/v1/admin/keyword-rewrites/{id}",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "改写记录 ID")),
    responses(
        (status = 200, description = "记录已删除"),
        (status = 404, description = "记录不存在", body = crate::api::ApiError)
    )
)]
async fn delete_keyword_rewrite(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_keyword_rewrite(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "keyword rewrite deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 改写服务回调。
/// 鉴权：`X-Signature: sha256=<hex>`，为原始请求体的 HMAC-SHA256（密钥 `ai_service.callback_secret`）。
/// 同一终态的重复投递返回 200 且不写库；终态之间的切换返回 409。
#[utoipa::path(
    post,
    path = "/v1/keyword-rewrites/callback",
    tag = "Callbacks",
    request_body = KeywordRewriteCallback,
    params(("X-Signature" = String, Header, description = "sha256=<hex>")),
    responses(
        (status = 200, description = "回调已处理", body = KeywordRewrite),
        (status = 401, description = "签名无效", body = crate::api::ApiError),
        (status = 404, description = "记录不存在", body = crate::api::ApiError),
        (status = 409, description = "状态冲突", body = crate::api::ApiError),
        (status = 422, description = "请求体不合法", body = crate::api::ApiError)
    )
)]
async fn keyword_callback(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(resp) = check_signature(
        &trace_id,
        &headers,
        &body,
        &state.config.ai_service.callback_secret,
    ) {
        return resp;
    }
    let payload: KeywordRewriteCallback = match parse_callback(&trace_id, &body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match state.store.apply_keyword_callback(&payload).await {
        Ok(CallbackOutcome::Applied(r)) => {
            tracing::info!(trace_id = %trace_id, rewrite_id = %r.id, status = %r.status, "Keyword rewrite callback applied");
            success_response(StatusCode::OK, &trace_id, r)
        }
        Ok(CallbackOutcome::Duplicate(r)) => {
            tracing::info!(trace_id = %trace_id, rewrite_id = %r.id, status = %r.status, "Duplicate keyword rewrite callback ignored");
            success_response(StatusCode::OK, &trace_id, r)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

// ===== 来源改写 =====

/// 调用改写服务改写采集文章，生成待审核草稿并标记文章已处理。
/// 改写服务失败返回 502，不写入任何数据。
#[utoipa::path(
    post,
    path = "/v1/admin/articles/{id}/rewrite",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "采集文章 ID")),
    request_body = RewriteSourceRequest,
    responses(
        (status = 201, description = "草稿已生成", body = RewrittenArticle),
        (status = 404, description = "文章不存在", body = crate::api::ApiError),
        (status = 422, description = "分类不存在", body = crate::api::ApiError),
        (status = 502, description = "改写服务失败", body = crate::api::ApiError)
    )
)]
async fn rewrite_source_article(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RewriteSourceRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let article = match state.store.get_source_article(&id).await {
        Ok(Some(a)) => a,
        Ok(None) => return not_found_response(&trace_id, "article"),
        Err(e) => return storage_error_response(&trace_id, e),
    };
    if let Err(resp) = check_category_exists(&state, &trace_id, &req.category_id).await {
        return resp;
    }
    let output = match rewrite_content(&state, &trace_id, Some(article.title), article.content).await
    {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    let draft = draft_from_output(output, req.category_id, current.id);
    match state.store.record_article_rewrite(&id, draft).await {
        Ok(d) => {
            tracing::info!(trace_id = %trace_id, article_id = %id, draft_id = %d.id, "Article rewritten");
            success_response(StatusCode::CREATED, &trace_id, d)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 调用改写服务改写 Facebook 帖子，生成待审核草稿并标记帖子已处理。
#[utoipa::path(
    post,
    path = "/v1/admin/facebook-posts/{id}/rewrite",
    tag = "AI",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "帖子 ID")),
    request_body = RewriteSourceRequest,
    responses(
        (status = 201, description = "草稿已生成", body = RewrittenArticle),
        (status = 404, description = "帖子不存在", body = crate::api::ApiError),
        (status = 422, description = "分类不存在", body = crate::api::ApiError),
        (status = 502, description = "改写服务失败", body = crate::api::ApiError)
    )
)]
async fn rewrite_facebook_post(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RewriteSourceRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let post = match state.store.get_facebook_post(&id).await {
        Ok(Some(p)) => p,
        Ok(None) => return not_found_response(&trace_id, "facebook post"),
        Err(e) => return storage_error_response(&trace_id, e),
    };
    if let Err(resp) = check_category_exists(&state, &trace_id, &req.category_id).await {
        return resp;
    }
    let output = match rewrite_content(&state, &trace_id, None, post.content).await {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    let draft = draft_from_output(output, req.category_id, current.id);
    match state.store.record_post_rewrite(&id, draft).await {
        Ok(d) => {
            tracing::info!(trace_id = %trace_id, post_id = %id, draft_id = %d.id, "Facebook post rewritten");
            success_response(StatusCode::CREATED, &trace_id, d)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}
