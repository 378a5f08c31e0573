mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALLBACK_URI: &str = "/v1/keyword-rewrites/callback";

async fn accepting_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/keyword-rewrite"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    server
}

async fn submit(app: &axum::Router, token: &str, keyword: &str) -> (StatusCode, serde_json::Value) {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/admin/keyword-rewrites",
        Some(token),
        Some(json!({ "keyword": keyword })),
    )
    .await;
    (status, body)
}

fn completed_payload(id: &str) -> serde_json::Value {
    json!({
        "rewrite_id": id,
        "status": "completed",
        "source_url": "https://news.example.com/covid",
        "source_title": "Covid update",
        "source_content": "<p>original</p>",
        "rewritten_content": "<p>rewritten</p>",
        "all_articles": [{"title": "Covid update", "url": "https://news.example.com/covid"}]
    })
}

#[tokio::test]
async fn keyword_rewrite_completes_through_signed_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/keyword-rewrite"))
        .and(body_partial_json(json!({
            "keyword": "covid-19",
            "callback_url": "http://cms.test/v1/keyword-rewrites/callback"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = build_test_context_with(TestOptions {
        ai_base_url: server.uri(),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;

    let (status, body) = submit(&ctx.app, &token, "  covid-19 ").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(body["data"]["keyword"], "covid-19");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let status_uri = format!("/v1/admin/keyword-rewrites/{id}/status");
    let (status, body, _) = request_no_body(&ctx.app, "GET", &status_uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["terminal"], false);

    let (status, body, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &completed_payload(&id),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "completed");

    let (_, body, _) = request_no_body(&ctx.app, "GET", &status_uri, Some(&token)).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["terminal"], true);
    assert!(body["data"]["completed_at"].is_string());

    let (status, body, _) = request_no_body(
        &ctx.app,
        "GET",
        &format!("/v1/admin/keyword-rewrites/{id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rewritten_content"], "<p>rewritten</p>");
    assert_eq!(body["data"]["source_title"], "Covid update");
    assert!(body["data"]["all_articles"].is_array());
}

#[tokio::test]
async fn callback_redelivery_and_conflicts() {
    let server = accepting_service().await;
    let ctx = build_test_context_with(TestOptions {
        ai_base_url: server.uri(),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;
    let (_, body) = submit(&ctx.app, &token, "quantum computing").await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let payload = completed_payload(&id);
    let (status, _, _) =
        post_callback(&ctx.app, CALLBACK_URI, Some(AI_CALLBACK_SECRET), &payload).await;
    assert_eq!(status, StatusCode::OK);

    // 同一终态重复投递
    let (status, body, _) =
        post_callback(&ctx.app, CALLBACK_URI, Some(AI_CALLBACK_SECRET), &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &json!({ "rewrite_id": id, "status": "failed", "error_message": "late failure" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["err_code"], 1005);

    let (_, body, _) = request_no_body(
        &ctx.app,
        "GET",
        &format!("/v1/admin/keyword-rewrites/{id}"),
        Some(&token),
    )
    .await;
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["error_message"].is_null());
}

#[tokio::test]
async fn callback_rejects_bad_signatures_and_payloads() {
    let server = accepting_service().await;
    let ctx = build_test_context_with(TestOptions {
        ai_base_url: server.uri(),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;
    let (_, body) = submit(&ctx.app, &token, "robotics").await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body, _) = post_callback(&ctx.app, CALLBACK_URI, None, &completed_payload(&id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["err_code"], 1002);

    let (status, _, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some("wrong-secret"),
        &completed_payload(&id),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &completed_payload("999999"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &json!({ "rewrite_id": id, "status": "processing" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["err_code"], 1006);

    // 未被任何回调改动
    let (_, body, _) = request_no_body(
        &ctx.app,
        "GET",
        &format!("/v1/admin/keyword-rewrites/{id}/status"),
        Some(&token),
    )
    .await;
    assert_eq!(body["data"]["status"], "processing");
}

#[tokio::test]
async fn blank_keyword_is_rejected() {
    let ctx = build_test_context().await.unwrap();
    let token = admin_token(&ctx.app).await;

    let (status, body) = submit(&ctx.app, &token, "   ").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["err_code"], 1006);
    assert!(body["data"]["keyword"].is_array());

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/keyword-rewrites", Some(&token)).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn failed_dispatch_can_be_retried_and_converted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/keyword-rewrite"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/keyword-rewrite"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let ctx = build_test_context_with(TestOptions {
        ai_base_url: server.uri(),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;
    let category_id = create_category(&ctx.app, &token, "Health").await;

    let (status, body) = submit(&ctx.app, &token, "covid-19").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["error_message"], "rewrite service unavailable");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // 未完成时不能转换
    let convert_uri = format!("/v1/admin/keyword-rewrites/{id}/convert");
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        &convert_uri,
        Some(&token),
        Some(json!({ "category_id": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body, _) = request_no_body(
        &ctx.app,
        "POST",
        &format!("/v1/admin/keyword-rewrites/{id}/retry"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "processing");
    assert!(body["data"]["error_message"].is_null());

    let (status, _, _) = post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &completed_payload(&id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &convert_uri,
        Some(&token),
        Some(json!({ "category_id": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["kind"], "draft");
    let draft = &body["data"]["article"];
    assert_eq!(draft["status"], "pending");
    assert_eq!(draft["title"], "Covid update");
    assert_eq!(draft["meta_keywords"], "covid-19");
    assert_eq!(draft["keyword_rewrite_id"], id.as_str());

    // 已转换的记录不能再次转换
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &convert_uri,
        Some(&token),
        Some(json!({ "category_id": category_id, "publish": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["err_code"], 1005);

    let (_, body, _) = request_no_body(
        &ctx.app,
        "GET",
        &format!("/v1/admin/keyword-rewrites/{id}"),
        Some(&token),
    )
    .await;
    assert!(body["data"]["converted_at"].is_string());
}

#[tokio::test]
async fn converting_with_publish_skips_review() {
    let server = accepting_service().await;
    let ctx = build_test_context_with(TestOptions {
        ai_base_url: server.uri(),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;
    let category_id = create_category(&ctx.app, &token, "Science").await;

    let (_, body) = submit(&ctx.app, &token, "fusion energy").await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    post_callback(
        &ctx.app,
        CALLBACK_URI,
        Some(AI_CALLBACK_SECRET),
        &completed_payload(&id),
    )
    .await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &format!("/v1/admin/keyword-rewrites/{id}/convert"),
        Some(&token),
        Some(json!({
            "category_id": category_id,
            "title": "Fusion explained",
            "slug": "fusion-explained",
            "publish": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["kind"], "published");
    assert_eq!(body["data"]["article"]["ai_generated"], true);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/articles/fusion-explained", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Fusion explained");
}
