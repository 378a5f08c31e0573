mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn health_and_public_routes_need_no_token() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, trace_id) = request_no_body(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert!(trace_id.is_some());

    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/articles", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/categories", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_a_valid_token() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/admin/rewritten-articles", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["err_code"], 1002);

    let (status, _, _) = request_no_body(
        &ctx.app,
        "GET",
        "/v1/admin/dashboard",
        Some("not-a-jwt"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let ctx = build_test_context().await.unwrap();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn editors_manage_content_but_not_users() {
    let ctx = build_test_context().await.unwrap();
    let token = editor_token(&ctx.app).await;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "editor");

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["drafts"]["pending"], 0);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["err_code"], 1010);

    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/admin/ai-settings", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn changing_password_revokes_old_tokens() {
    let ctx = build_test_context().await.unwrap();
    let old_token = editor_token(&ctx.app).await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/password",
        Some(&old_token),
        Some(json!({ "current_password": EDITOR_PASSWORD, "new_password": "a-new-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&old_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&new_token)).await;
    assert_eq!(status, StatusCode::OK);

    login(&ctx.app, EDITOR_EMAIL, "a-new-password").await;
}

#[tokio::test]
async fn admin_manages_users_with_self_protection() {
    let ctx = build_test_context().await.unwrap();
    let token = admin_token(&ctx.app).await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/admin/users",
        Some(&token),
        Some(json!({
            "name": "Writer",
            "email": "writer@example.com",
            "password": "writerpass1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["role"], "editor");
    assert!(body["data"].get("password_hash").is_none());
    let writer_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/admin/users",
        Some(&token),
        Some(json!({
            "name": "Writer again",
            "email": "writer@example.com",
            "password": "writerpass1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["data"]["email"].is_array());

    let writer_token = login(&ctx.app, "writer@example.com", "writerpass1").await;
    let (status, _, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("/v1/admin/users/{writer_id}"),
        Some(&token),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 停用后旧 token 失效且无法登录
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&writer_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({ "email": "writer@example.com", "password": "writerpass1" })),
    )
    .await;
    assert_ne!(status, StatusCode::OK);

    let (_, me, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&token)).await;
    let admin_id = me["data"]["id"].as_str().unwrap().to_string();

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("/v1/admin/users/{admin_id}"),
        Some(&token),
        Some(json!({ "role": "editor" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["data"]["role"].is_array());

    let (status, _, _) = request_no_body(
        &ctx.app,
        "DELETE",
        &format!("/v1/admin/users/{admin_id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = request_no_body(
        &ctx.app,
        "DELETE",
        &format!("/v1/admin/users/{writer_id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ai_settings_hide_the_api_key() {
    let ctx = build_test_context().await.unwrap();
    let token = admin_token(&ctx.app).await;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/ai-settings", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        "/v1/admin/ai-settings",
        Some(&token),
        Some(json!({
            "provider": "openai",
            "model_name": "gpt-4o",
            "api_key": "sk-test-secret",
            "temperature": 0.7
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["provider"], "openai");
    assert!(!body.to_string().contains("sk-test-secret"));

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/ai-settings", Some(&token)).await;
    assert_eq!(body["data"]["model_name"], "gpt-4o");
    assert_eq!(body["data"]["is_active"], true);

    let stored = ctx.state.store.get_active_ai_setting().await.unwrap().unwrap();
    assert_eq!(stored.api_key.as_deref(), Some("sk-test-secret"));
}
