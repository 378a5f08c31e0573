mod common;

use axum::http::StatusCode;
use common::*;
use std::path::Path;

#[tokio::test]
async fn upload_stores_file_and_serves_it() {
    let ctx = build_test_context().await.unwrap();
    let token = editor_token(&ctx.app).await;

    let (status, body, _) = upload_file(
        &ctx.app,
        &token,
        "Notes.TXT",
        "text/plain",
        b"hello magazine",
        Some("Launch notes"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let media = &body["data"];
    assert_eq!(media["name"], "Launch notes");
    assert_eq!(media["file_name"], "Notes.TXT");
    assert_eq!(media["type"], "document");
    assert_eq!(media["size"], 14);
    let file_path = media["file_path"].as_str().unwrap().to_string();
    assert!(file_path.starts_with("documents/"));
    assert!(file_path.ends_with(".txt"));
    let url = media["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/storage/{file_path}"));

    let on_disk = Path::new(&ctx.state.config.media.storage_dir).join(&file_path);
    assert_eq!(std::fs::read(&on_disk).unwrap(), b"hello magazine");

    let (status, body, _) = request_no_body(&ctx.app, "GET", &url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello magazine");

    let id = media["id"].as_str().unwrap().to_string();
    let (status, _, _) = request_no_body(
        &ctx.app,
        "DELETE",
        &format!("/v1/admin/media/{id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!on_disk.exists());

    let (status, _, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/admin/media/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn images_are_classified_and_filterable() {
    let ctx = build_test_context().await.unwrap();
    let token = admin_token(&ctx.app).await;

    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let (status, body, _) =
        upload_file(&ctx.app, &token, "cover.png", "image/png", &png, None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["type"], "image");
    assert_eq!(body["data"]["name"], "cover.png");
    assert!(body["data"]["file_path"].as_str().unwrap().starts_with("images/"));

    // octet-stream 按文件名推断
    let (status, body, _) = upload_file(
        &ctx.app,
        &token,
        "photo.jpg",
        "application/octet-stream",
        b"jpegdata",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["mime_type"], "image/jpeg");

    upload_file(&ctx.app, &token, "report.pdf", "application/pdf", b"%PDF", None).await;

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/admin/media?type=image", Some(&token)).await;
    assert_eq!(body["data"]["total"], 2);
    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/admin/media?type=document", Some(&token)).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let ctx = build_test_context_with(TestOptions {
        max_upload_bytes: Some(1024),
        ..Default::default()
    })
    .await
    .unwrap();
    let token = admin_token(&ctx.app).await;

    let big = vec![b'x'; 4096];
    let (status, body, _) =
        upload_file(&ctx.app, &token, "big.txt", "text/plain", &big, None).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["err_code"], 1007);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/admin/media", Some(&token)).await;
    assert_eq!(body["data"]["total"], 0);
}
