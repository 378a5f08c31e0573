use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use magazine_ai::{ProcessExit, ScrapeLaunch};
use magazine_common::types::{CreateScrapeJobRequest, ScrapeJob, ScrapeJobCallback, ScrapeJobStatus};
use magazine_storage::{CallbackOutcome, StorageError};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::pagination::PaginationParams;
use crate::api::{
    check_signature, not_found_response, parse_callback, storage_error_response,
    success_paginated_response, success_response, validate_request,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;

/// 未指定时每次采集的帖子上限
pub const DEFAULT_MAX_POSTS: i32 = 20;

pub fn scrape_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_scrape_jobs, create_scrape_job))
        .routes(routes!(get_scrape_job))
}

pub fn scrape_callback_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(scrape_callback))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListScrapeJobsQuery {
    /// 按状态过滤 (pending, running, completed, failed)
    #[param(required = false)]
    status: Option<ScrapeJobStatus>,
}

/// Launch the scraper for a pending job and track the process in the background.
async fn launch_job(state: &AppState, trace_id: &str, job: ScrapeJob) -> Result<ScrapeJob, StorageError> {
    let launch = ScrapeLaunch {
        job_id: job.id.clone(),
        target_url: job.target_url.clone(),
        max_posts: job.max_posts,
        callback_url: state.config.scrape_callback_url(),
    };
    let handle = match state.scraper.launch(&launch) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!(trace_id = %trace_id, job_id = %job.id, error = %e, "Failed to launch scraper");
            state
                .store
                .fail_scrape_job(&job.id, "failed to start scraper process")
                .await?;
            return state
                .store
                .get_scrape_job(&job.id)
                .await?
                .ok_or_else(|| StorageError::not_found("scrape_job", &job.id));
        }
    };
    let running = state.store.mark_scrape_job_running(&job.id).await?;

    let store = state.store.clone();
    let job_id = job.id;
    tokio::spawn(async move {
        let exit = match handle.await {
            Ok(exit) => exit,
            Err(e) => ProcessExit::Failed(format!("scraper task aborted: {e}")),
        };
        // 正常退出但未回调的任务同样视为失败
        let reason = match exit {
            ProcessExit::Success => "scraper exited without reporting".to_string(),
            ProcessExit::Failed(reason) => reason,
        };
        match store.fail_scrape_job(&job_id, &reason).await {
            Ok(true) => tracing::warn!(job_id = %job_id, reason = %reason, "Scrape job failed"),
            // 进程退出前已回调终态
            Ok(false) => tracing::info!(job_id = %job_id, "Scraper process exited"),
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record scrape job failure")
            }
        }
    });

    Ok(running)
}

/// 分页查询采集任务。
#[utoipa::path(
    get,
    path = "/v1/admin/scrape-jobs",
    tag = "Scrape",
    security(("bearer_auth" = [])),
    params(PaginationParams, ListScrapeJobsQuery),
    responses(
        (status = 200, description = "采集任务分页列表", body = Vec<ScrapeJob>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_scrape_jobs(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<ListScrapeJobsQuery>,
) -> impl IntoResponse {
    let total = match state.store.count_scrape_jobs(query.status).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_scrape_jobs(query.status, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 创建采集任务并启动采集进程。
/// 启动成功返回 running 状态；进程无法启动时任务立即标记为 failed。两种情况均返回 202。
#[utoipa::path(
    post,
    path = "/v1/admin/scrape-jobs",
    tag = "Scrape",
    security(("bearer_auth" = [])),
    request_body = CreateScrapeJobRequest,
    responses(
        (status = 202, description = "任务已受理", body = ScrapeJob),
        (status = 422, description = "参数不合法", body = crate::api::ApiError)
    )
)]
async fn create_scrape_job(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(req): Json<CreateScrapeJobRequest>,
) -> impl IntoResponse {
    if let Err(resp) = validate_request(&trace_id, &req) {
        return resp;
    }
    let job = match state
        .store
        .create_scrape_job(
            req.target_url.trim(),
            req.max_posts.unwrap_or(DEFAULT_MAX_POSTS),
            Some(&current.id),
        )
        .await
    {
        Ok(j) => j,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match launch_job(&state, &trace_id, job).await {
        Ok(j) => success_response(StatusCode::ACCEPTED, &trace_id, j),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 获取采集任务状态。
#[utoipa::path(
    get,
    path = "/v1/admin/scrape-jobs/{id}",
    tag = "Scrape",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "任务 ID")),
    responses(
        (status = 200, description = "任务详情", body = ScrapeJob),
        (status = 404, description = "任务不存在", body = crate::api::ApiError)
    )
)]
async fn get_scrape_job(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_scrape_job(&id).await {
        Ok(Some(j)) => success_response(StatusCode::OK, &trace_id, j),
        Ok(None) => not_found_response(&trace_id, "scrape job"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 采集进程完成回调。
/// 鉴权：`X-Signature`，密钥为 `scraper.callback_secret`。
#[utoipa::path(
    post,
    path = "/v1/scrape-jobs/callback",
    tag = "Callbacks",
    request_body = ScrapeJobCallback,
    params(("X-Signature" = String, Header, description = "sha256=<hex>")),
    responses(
        (status = 200, description = "回调已处理", body = ScrapeJob),
        (status = 401, description = "签名无效", body = crate::api::ApiError),
        (status = 404, description = "任务不存在", body = crate::api::ApiError),
        (status = 409, description = "状态冲突", body = crate::api::ApiError),
        (status = 422, description = "请求体不合法", body = crate::api::ApiError)
    )
)]
async fn scrape_callback(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(resp) = check_signature(
        &trace_id,
        &headers,
        &body,
        &state.config.scraper.callback_secret,
    ) {
        return resp;
    }
    let payload: ScrapeJobCallback = match parse_callback(&trace_id, &body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match state.store.apply_scrape_callback(&payload).await {
        Ok(CallbackOutcome::Applied(j)) => {
            tracing::info!(
                trace_id = %trace_id,
                job_id = %j.id,
                status = %j.status,
                posts_found = ?j.posts_found,
                "Scrape job callback applied"
            );
            success_response(StatusCode::OK, &trace_id, j)
        }
        Ok(CallbackOutcome::Duplicate(j)) => success_response(StatusCode::OK, &trace_id, j),
        Err(e) => storage_error_response(&trace_id, e),
    }
}
