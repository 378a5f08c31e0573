use crate::api::pagination::PaginationParams;
use crate::api::{
    check_category_exists, not_found_response, storage_error_response, success_empty_response,
    success_paginated_response, success_response, validate_request,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use magazine_common::types::{
    ApproveArticleRequest, ApprovedArticle, BulkReviewOutcome, BulkReviewRequest,
    CreateRewrittenArticleRequest, DraftStatus, RejectArticleRequest, ReviewAction,
    RewrittenArticle, UpdateRewrittenArticleRequest,
};
use magazine_storage::{ApproveOverrides, DraftFilter, DraftUpdate, NewDraft, StorageError};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct DraftListQuery {
    /// 按状态过滤（pending / approved / rejected）
    #[param(required = false)]
    status: Option<DraftStatus>,
    /// 按分类过滤
    #[param(required = false)]
    category_id: Option<String>,
}

/// 分页查询改写草稿。
#[utoipa::path(
    get,
    path = "/v1/admin/rewritten-articles",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(PaginationParams, DraftListQuery),
    responses(
        (status = 200, description = "草稿分页列表", body = Vec<RewrittenArticle>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_drafts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<DraftListQuery>,
) -> impl IntoResponse {
    let filter = DraftFilter {
        status: query.status,
        category_id: query.category_id,
    };
    let total = match state.store.count_drafts(&filter).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_drafts(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取草稿详情。
#[utoipa::path(
    get,
    path = "/v1/admin/rewritten-articles/{id}",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "草稿 ID")),
    responses(
        (status = 200, description = "草稿详情", body = RewrittenArticle),
        (status = 404, description = "草稿不存在", body = crate::api::ApiError)
    )
)]
async fn get_draft(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_draft(&id).await {
        Ok(Some(d)) => success_response(StatusCode::OK, &trace_id, d),
        Ok(None) => not_found_response(&trace_id, "rewritten article"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 手动创建草稿。
#[utoipa::path(
    post,
    path = "/v1/admin/rewritten-articles",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    request_body = CreateRewrittenArticleRequest,
    responses(
        (status = 201, description = "草稿已创建", body = RewrittenArticle),
        (status = 422, description = "参数不合法或 slug 重复", body = crate::api::ApiError)
    )
)]
async fn create_draft(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(req): Json<CreateRewrittenArticleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    if let Err(resp) = check_category_exists(&state, &trace_id, &req.category_id).await {
        return resp;
    }
    let new = NewDraft {
        title: req.title,
        slug: req.slug,
        content: req.content,
        meta_title: req.meta_title,
        meta_description: req.meta_description,
        meta_keywords: req.meta_keywords,
        featured_image: req.featured_image,
        user_id: Some(current.id),
        category_id: Some(req.category_id),
        original_article_id: req.original_article_id,
        ..Default::default()
    };
    match state.store.create_draft(new).await {
        Ok(d) => success_response(StatusCode::CREATED, &trace_id, d),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 编辑草稿。`resubmit=true` 时将已驳回的草稿重新置为待审核。
#[utoipa::path(
    put,
    path = "/v1/admin/rewritten-articles/{id}",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "草稿 ID")),
    request_body = UpdateRewrittenArticleRequest,
    responses(
        (status = 200, description = "草稿已更新", body = RewrittenArticle),
        (status = 404, description = "草稿不存在", body = crate::api::ApiError),
        (status = 422, description = "参数不合法或 slug 重复", body = crate::api::ApiError)
    )
)]
async fn update_draft(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRewrittenArticleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    if let Some(category_id) = &req.category_id {
        if let Err(resp) = check_category_exists(&state, &trace_id, category_id).await {
            return resp;
        }
    }
    let update = DraftUpdate {
        title: req.title,
        slug: req.slug,
        content: req.content,
        meta_title: req.meta_title,
        meta_description: req.meta_description,
        meta_keywords: req.meta_keywords,
        featured_image: req.featured_image,
        category_id: req.category_id,
        resubmit: req.resubmit.unwrap_or(false),
    };
    match state.store.update_draft(&id, update).await {
        Ok(d) => success_response(StatusCode::OK, &trace_id, d),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除草稿（软删除）。
#[utoipa::path(
    delete,
    path = "/v1/admin/rewritten-articles/{id}",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "草稿 ID")),
    responses(
        (status = 200, description = "草稿已删除"),
        (status = 404, description = "草稿不存在", body = crate::api::ApiError)
    )
)]
async fn delete_draft(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_draft(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "rewritten article deleted"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

async fn overrides_for(
    state: &AppState,
    trace_id: &str,
    req: ApproveArticleRequest,
) -> Result<ApproveOverrides, axum::response::Response> {
    if let Some(category_id) = &req.category_id {
        check_category_exists(state, trace_id, category_id).await?;
    }
    if let Some(media_id) = &req.featured_image_id {
        match state.store.get_media(media_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(storage_error_response(
                    trace_id,
                    StorageError::field("featured_image_id", "does not exist"),
                ))
            }
            Err(e) => return Err(storage_error_response(trace_id, e)),
        }
    }
    Ok(ApproveOverrides {
        category_id: req.category_id,
        featured_image_id: req.featured_image_id,
        published_at: req.published_at,
    })
}

/// 审核通过：在同一事务中创建已发布文章并删除草稿。
/// 请求体可省略，所有覆盖项均为可选。
#[utoipa::path(
    post,
    path = "/v1/admin/rewritten-articles/{id}/approve",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "草稿 ID")),
    request_body(content = Option<ApproveArticleRequest>, description = "可选的覆盖项"),
    responses(
        (status = 200, description = "已发布文章", body = ApprovedArticle),
        (status = 404, description = "草稿不存在", body = crate::api::ApiError),
        (status = 409, description = "草稿已审核通过", body = crate::api::ApiError),
        (status = 422, description = "slug 已被已发布文章占用", body = crate::api::ApiError)
    )
)]
async fn approve_draft(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Option<Json<ApproveArticleRequest>>,
) -> impl IntoResponse {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let overrides = match overrides_for(&state, &trace_id, req).await {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    match state.store.approve_draft(&id, &overrides).await {
        Ok(article) => {
            tracing::info!(
                trace_id = %trace_id,
                draft_id = %id,
                article_id = %article.id,
                "Draft approved"
            );
            success_response(StatusCode::OK, &trace_id, article)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 驳回草稿（原地更新状态）。
#[utoipa::path(
    post,
    path = "/v1/admin/rewritten-articles/{id}/reject",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "草稿 ID")),
    request_body = RejectArticleRequest,
    responses(
        (status = 200, description = "草稿已驳回", body = RewrittenArticle),
        (status = 404, description = "草稿不存在", body = crate::api::ApiError),
        (status = 409, description = "草稿已审核通过", body = crate::api::ApiError)
    )
)]
async fn reject_draft(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RejectArticleRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    match state.store.reject_draft(&id, req.reason).await {
        Ok(d) => {
            tracing::info!(trace_id = %trace_id, draft_id = %id, "Draft rejected");
            success_response(StatusCode::OK, &trace_id, d)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

fn bulk_error_message(err: &StorageError) -> String {
    match err {
        StorageError::NotFound { .. } => "not found".to_string(),
        StorageError::Validation(fields) => fields
            .iter()
            .map(|(field, msgs)| format!("{field} {}", msgs.join(", ")))
            .collect::<Vec<_>>()
            .join("; "),
        StorageError::InvalidTransition { from, to, .. } => {
            format!("cannot move from {from} to {to}")
        }
        StorageError::Conflict(msg) => msg.clone(),
        _ => "internal error".to_string(),
    }
}

/// 批量审核。每个 ID 独立处理，返回逐条结果。
#[utoipa::path(
    post,
    path = "/v1/admin/rewritten-articles/bulk",
    tag = "Drafts",
    security(("bearer_auth" = [])),
    request_body = BulkReviewRequest,
    responses(
        (status = 200, description = "逐条处理结果", body = Vec<BulkReviewOutcome>),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn bulk_review(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<BulkReviewRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }

    let mut outcomes = Vec::with_capacity(req.ids.len());
    for id in &req.ids {
        let result = match req.action {
            ReviewAction::Approve => state
                .store
                .approve_draft(id, &ApproveOverrides::default())
                .await
                .map(|a| Some(a.id)),
            ReviewAction::Reject => state
                .store
                .reject_draft(id, req.reason.clone())
                .await
                .map(|_| None),
        };
        let outcome = match result {
            Ok(approved_article_id) => BulkReviewOutcome {
                id: id.clone(),
                ok: true,
                error: None,
                approved_article_id,
            },
            Err(e) => {
                if !matches!(
                    e,
                    StorageError::NotFound { .. }
                        | StorageError::Validation(_)
                        | StorageError::InvalidTransition { .. }
                        | StorageError::Conflict(_)
                ) {
                    tracing::error!(trace_id = %trace_id, draft_id = %id, error = %e, "Bulk review item failed");
                }
                BulkReviewOutcome {
                    id: id.clone(),
                    ok: false,
                    error: Some(bulk_error_message(&e)),
                    approved_article_id: None,
                }
            }
        };
        outcomes.push(outcome);
    }

    let ok = outcomes.iter().filter(|o| o.ok).count();
    tracing::info!(
        trace_id = %trace_id,
        action = ?req.action,
        total = outcomes.len(),
        ok,
        "Bulk review finished"
    );
    success_response(StatusCode::OK, &trace_id, outcomes)
}

pub fn draft_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_drafts, create_draft))
        .routes(routes!(bulk_review))
        .routes(routes!(get_draft, update_draft, delete_draft))
        .routes(routes!(approve_draft))
        .routes(routes!(reject_draft))
}
