use crate::state::AppState;
use crate::{api, auth, logging, openapi};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AI Magazine API",
        description = "AI 杂志内容管理 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Auth", description = "认证鉴权"),
        (name = "Categories", description = "分类管理"),
        (name = "Sources", description = "采集文章与 Facebook 帖子"),
        (name = "Drafts", description = "改写草稿与审核"),
        (name = "Articles", description = "已发布文章"),
        (name = "AI", description = "关键词改写与 AI 配置"),
        (name = "Scrape", description = "Facebook 采集任务"),
        (name = "Media", description = "媒体库"),
        (name = "Users", description = "用户管理"),
        (name = "Dashboard", description = "后台统计"),
        (name = "Callbacks", description = "外部服务回调（HMAC 签名）")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_spec) = api::public_routes().split_for_parts();
    let (login_router, login_spec) = api::auth_routes().split_for_parts();
    let (callback_router, callback_spec) = api::callback_routes().split_for_parts();
    let (protected_router, protected_spec) = api::protected_routes().split_for_parts();
    let (admin_router, admin_spec) = api::admin_routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(public_spec);
    merged_spec.merge(login_spec);
    merged_spec.merge(callback_spec);
    merged_spec.merge(protected_spec);
    merged_spec.merge(admin_spec);
    let spec = Arc::new(merged_spec.clone());

    let config = state.config.clone();
    // multipart 边界与表单字段的额外开销
    let body_limit = config.media.max_upload_bytes.saturating_add(64 * 1024);

    public_router
        .merge(login_router)
        .merge(callback_router)
        .merge(
            protected_router
                .merge(admin_router.layer(middleware::from_fn(
                    crate::middleware::require_admin,
                )))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::jwt_auth_middleware,
                )),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", merged_spec))
        .merge(openapi::yaml_route(spec))
        .nest_service(
            &config.media_url_prefix(),
            ServeDir::new(&config.media.storage_dir),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(middleware::from_fn(logging::request_logging))
}
