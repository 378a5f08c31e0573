#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use magazine_ai::{HttpRewriteService, ProcessScrapeLauncher, ScrapeLauncher};
use magazine_common::types::{LoginRequest, UserRole};
use magazine_server::app;
use magazine_server::config::ServerConfig;
use magazine_server::state::AppState;
use magazine_storage::auth::hash_password;
use magazine_storage::{ContentStore, NewUser};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "changeme123";
pub const EDITOR_EMAIL: &str = "editor@example.com";
pub const EDITOR_PASSWORD: &str = "editorpass1";
pub const AI_CALLBACK_SECRET: &str = "test-ai-callback-secret";
pub const SCRAPE_CALLBACK_SECRET: &str = "test-scrape-callback-secret";

/// Nothing listens here; connections are refused immediately.
pub const UNREACHABLE_AI_URL: &str = "http://127.0.0.1:9";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub struct TestOptions {
    pub ai_base_url: String,
    pub scraper: Option<Arc<dyn ScrapeLauncher>>,
    pub max_upload_bytes: Option<usize>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            ai_base_url: UNREACHABLE_AI_URL.to_string(),
            scraper: None,
            max_upload_bytes: None,
        }
    }
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(TestOptions::default()).await
}

pub async fn build_test_context_with(options: TestOptions) -> Result<TestContext> {
    magazine_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_string_lossy().to_string();

    let mut config: ServerConfig = toml::from_str("")?;
    config.database.data_dir = data_dir.clone();
    config.auth.jwt_secret = Some("test-secret".to_string());
    config.ai_service.base_url = options.ai_base_url.clone();
    config.ai_service.public_base_url = "http://cms.test".to_string();
    config.ai_service.callback_secret = AI_CALLBACK_SECRET.to_string();
    config.ai_service.dispatch_timeout_secs = 5;
    config.ai_service.rewrite_timeout_secs = 5;
    config.scraper.command = "true".to_string();
    config.scraper.callback_secret = SCRAPE_CALLBACK_SECRET.to_string();
    config.media.storage_dir = temp_dir.path().join("media").to_string_lossy().to_string();
    if let Some(limit) = options.max_upload_bytes {
        config.media.max_upload_bytes = limit;
    }

    let store = Arc::new(ContentStore::new(&config.database.connection_url(), temp_dir.path()).await?);
    store
        .create_user(NewUser {
            name: "Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD)?,
            role: UserRole::Admin,
            is_active: true,
        })
        .await?;
    store
        .create_user(NewUser {
            name: "Editor".to_string(),
            email: EDITOR_EMAIL.to_string(),
            password_hash: hash_password(EDITOR_PASSWORD)?,
            role: UserRole::Editor,
            is_active: true,
        })
        .await?;

    let rewriter = Arc::new(HttpRewriteService::new(&options.ai_base_url, 5, 5)?);
    let scraper: Arc<dyn ScrapeLauncher> = match options.scraper {
        Some(s) => s,
        None => Arc::new(ProcessScrapeLauncher::new(&config.scraper.command, vec![])),
    };

    let state = AppState {
        store,
        rewriter,
        scraper,
        start_time: Utc::now(),
        jwt_secret: Arc::new("test-secret".to_string()),
        token_expire_secs: 3600,
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

/// POST a callback body, signed with `secret` when given.
pub async fn post_callback(
    app: &axum::Router,
    uri: &str,
    secret: Option<&str>,
    body: &Value,
) -> (StatusCode, Value, Option<String>) {
    let raw = body.to_string();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(
            "X-Signature",
            magazine_ai::signature::sign(secret, raw.as_bytes()),
        );
    }
    let req = builder.body(Body::from(raw)).expect("request should build");
    send(app, req).await
}

/// POST a multipart form with one `file` part and an optional `name` part.
pub async fn upload_file(
    app: &axum::Router,
    token: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
    name: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let boundary = "magazine-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    if let Some(name) = name {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let req = Request::builder()
        .method("POST")
        .uri("/v1/admin/media")
        .header("Authorization", format!("Bearer {token}"))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request should build");
    send(app, req).await
}

pub async fn login(app: &axum::Router, email: &str, password: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/auth/login",
        None,
        Some(
            serde_json::to_value(LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .expect("login request should serialize"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["err_code"], 0);
    body["data"]["access_token"]
        .as_str()
        .expect("token should exist")
        .to_string()
}

pub async fn admin_token(app: &axum::Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

pub async fn editor_token(app: &axum::Router) -> String {
    login(app, EDITOR_EMAIL, EDITOR_PASSWORD).await
}

/// Create a category through the API and return its id.
pub async fn create_category(app: &axum::Router, token: &str, name: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/admin/categories",
        Some(token),
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "category create failed: {body}");
    body["data"]["id"].as_str().expect("category id").to_string()
}

/// Create a pending draft through the API and return it.
pub async fn create_draft(
    app: &axum::Router,
    token: &str,
    category_id: &str,
    title: &str,
) -> Value {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/admin/rewritten-articles",
        Some(token),
        Some(serde_json::json!({
            "title": title,
            "content": format!("<p>{title} body</p>"),
            "category_id": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "draft create failed: {body}");
    body["data"].clone()
}
