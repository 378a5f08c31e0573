use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, not_found_response, storage_error_response, success_empty_response,
    success_paginated_response, success_response,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, Utc};
use magazine_common::types::{Media, MediaType};
use magazine_storage::NewMedia;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct MediaQuery {
    /// 按类型过滤（image / document）
    #[param(required = false)]
    #[serde(rename = "type")]
    media_type: Option<MediaType>,
}

/// 媒体文件及其访问地址
#[derive(Serialize, ToSchema)]
struct MediaView {
    #[serde(flatten)]
    media: Media,
    /// 公开访问 URL
    url: String,
}

/// multipart 上传表单
#[allow(dead_code)]
#[derive(ToSchema)]
struct MediaUploadForm {
    /// 文件内容
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// 显示名称，缺省为原始文件名
    name: Option<String>,
}

fn media_view(state: &AppState, media: Media) -> MediaView {
    let url = format!("{}/{}", state.config.media_url_prefix(), media.file_path);
    MediaView { media, url }
}

struct UploadedFile {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// 扩展名优先取原始文件名，其次按 mime 推断
fn file_extension(file_name: &str, mime_type: &str) -> String {
    let from_name = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    from_name
        .or_else(|| {
            mime_guess::get_mime_extensions_str(mime_type)
                .and_then(|exts| exts.first())
                .map(|e| e.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// Relative storage path: `{images|documents}/{YYYY}/{MM}/{uuid}.{ext}`.
fn relative_path(media_type: MediaType, ext: &str) -> String {
    let now = Utc::now();
    format!(
        "{}/{:04}/{:02}/{}.{}",
        media_type.dir_name(),
        now.year(),
        now.month(),
        uuid::Uuid::new_v4().simple(),
        ext
    )
}

fn too_large(trace_id: &str, limit: usize) -> Response {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        trace_id,
        "payload_too_large",
        &format!("file exceeds the {limit} byte upload limit"),
    )
}

/// 分页查询媒体文件。
#[utoipa::path(
    get,
    path = "/v1/admin/media",
    tag = "Media",
    security(("bearer_auth" = [])),
    params(PaginationParams, MediaQuery),
    responses(
        (status = 200, description = "媒体分页列表", body = Vec<MediaView>),
        (status = 401, description = "未认证", body = crate::api::ApiError)
    )
)]
async fn list_media(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<MediaQuery>,
) -> impl IntoResponse {
    let total = match state.store.count_media(query.media_type).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, e),
    };
    match state
        .store
        .list_media(query.media_type, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => {
            let views: Vec<MediaView> = items.into_iter().map(|m| media_view(&state, m)).collect();
            success_paginated_response(StatusCode::OK, &trace_id, views, total, &pagination)
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 上传媒体文件（multipart/form-data，字段 `file`，可选 `name`）。
/// `image/*` 归为图片，其余为文档。
#[utoipa::path(
    post,
    path = "/v1/admin/media",
    tag = "Media",
    security(("bearer_auth" = [])),
    request_body(content = MediaUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "上传成功", body = MediaView),
        (status = 400, description = "缺少文件", body = crate::api::ApiError),
        (status = 413, description = "文件过大", body = crate::api::ApiError)
    )
)]
async fn upload_media(
    Extension(trace_id): Extension<TraceId>,
    Extension(current): Extension<CurrentUser>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let limit = state.config.media.max_upload_bytes;
    let mut upload: Option<UploadedFile> = None;
    let mut display_name: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return too_large(&trace_id, limit)
            }
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    &format!("invalid multipart body: {}", e.body_text()),
                )
            }
        };
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let declared = field.content_type().map(|c| c.to_string());
                let bytes = match field.bytes().await {
                    Ok(b) => b,
                    Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                        return too_large(&trace_id, limit)
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            &trace_id,
                            "bad_request",
                            &format!("failed to read file: {}", e.body_text()),
                        )
                    }
                };
                // multipart 常见的 octet-stream 按文件名重新推断
                let mime_type = match declared {
                    Some(m) if m != "application/octet-stream" => m,
                    _ => mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string(),
                };
                upload = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("name") => {
                if let Ok(text) = field.text().await {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        display_name = Some(text);
                    }
                }
            }
            _ => {}
        }
    }

    let Some(upload) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "missing multipart field: file",
        );
    };
    if upload.bytes.len() > limit {
        return too_large(&trace_id, limit);
    }

    let media_type = MediaType::from_mime(&upload.mime_type);
    let ext = file_extension(&upload.file_name, &upload.mime_type);
    let rel_path = relative_path(media_type, &ext);
    let full_path = PathBuf::from(&state.config.media.storage_dir).join(&rel_path);

    if let Some(parent) = full_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::error!(trace_id = %trace_id, error = %e, path = %parent.display(), "Failed to create media directory");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to store file",
            );
        }
    }
    if let Err(e) = tokio::fs::write(&full_path, &upload.bytes).await {
        tracing::error!(trace_id = %trace_id, error = %e, path = %full_path.display(), "Failed to write media file");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "internal_error",
            "Failed to store file",
        );
    }

    let new = NewMedia {
        id: magazine_common::id::next_id(),
        name: display_name.unwrap_or_else(|| upload.file_name.clone()),
        file_name: upload.file_name,
        file_path: rel_path,
        mime_type: upload.mime_type,
        size: upload.bytes.len() as i64,
        media_type,
        user_id: Some(current.id),
    };
    match state.store.insert_media(new).await {
        Ok(media) => {
            tracing::info!(trace_id = %trace_id, id = %media.id, path = %media.file_path, size = media.size, "Media uploaded");
            success_response(StatusCode::CREATED, &trace_id, media_view(&state, media))
        }
        Err(e) => {
            // 入库失败时清理孤儿文件
            let _ = tokio::fs::remove_file(&full_path).await;
            storage_error_response(&trace_id, e)
        }
    }
}

/// 获取媒体详情。
#[utoipa::path(
    get,
    path = "/v1/admin/media/{id}",
    tag = "Media",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "媒体 ID")),
    responses(
        (status = 200, description = "媒体详情", body = MediaView),
        (status = 404, description = "媒体不存在", body = crate::api::ApiError)
    )
)]
async fn get_media(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_media(&id).await {
        Ok(Some(m)) => success_response(StatusCode::OK, &trace_id, media_view(&state, m)),
        Ok(None) => not_found_response(&trace_id, "media"),
        Err(e) => storage_error_response(&trace_id, e),
    }
}

/// 删除媒体记录及磁盘文件。
#[utoipa::path(
    delete,
    path = "/v1/admin/media/{id}",
    tag = "Media",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "媒体 ID")),
    responses(
        (status = 200, description = "媒体已删除"),
        (status = 404, description = "媒体不存在", body = crate::api::ApiError)
    )
)]
async fn delete_media(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_media(&id).await {
        Ok(media) => {
            let path = PathBuf::from(&state.config.media.storage_dir).join(&media.file_path);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(trace_id = %trace_id, error = %e, path = %path.display(), "Media file already missing");
            }
            success_empty_response(StatusCode::OK, &trace_id, "media deleted")
        }
        Err(e) => storage_error_response(&trace_id, e),
    }
}

pub fn media_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_media, upload_media))
        .routes(routes!(get_media, delete_media))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(file_extension("Photo.JPG", "image/png"), "jpg");
        assert_eq!(file_extension("noext", "application/pdf"), "pdf");
        assert_eq!(file_extension("noext", "application/x-unknown-thing"), "bin");
    }

    #[test]
    fn relative_path_is_bucketed_by_type_and_month() {
        let path = relative_path(MediaType::Image, "png");
        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "images");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
        assert!(parts[3].ends_with(".png"));
        assert!(relative_path(MediaType::Document, "pdf").starts_with("documents/"));
    }
}
