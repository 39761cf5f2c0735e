mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{response_json, TestApp};
use lustre_api::{
    entities::Material,
    message_queue::{InMemoryMessageQueue, MessageQueue},
    services::storage::{RetryPass, IMAGE_URL_UPDATE_TOPIC},
};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const BOUNDARY: &str = "lustre-test-boundary";
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\nContent-Type: {}\r\n\r\n",
                    name, ct
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(app: &TestApp, product_id: Uuid, body: Vec<u8>) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/admin/products/{}/images/upload", product_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("multipart request");
    app.send(request).await
}

fn stored_path(app: &TestApp, url: &str) -> std::path::PathBuf {
    let key = url.trim_start_matches("/uploads/");
    app.upload_dir.path().join(key)
}

#[tokio::test]
async fn upload_stores_files_and_attaches_urls() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Emerald Ring", Material::Gold, dec!(3), Some(dec!(4000)))
        .await;

    let body = multipart_body(&[
        ("file", Some("image/png"), PNG_BYTES),
        ("alt", None, b"Emerald ring, side view"),
    ]);
    let response = upload(&app, ring.id, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let outcome = response_json(response).await["data"].clone();
    assert_eq!(outcome["status"], "attached");
    let url = outcome["urls"][0].as_str().expect("stored url").to_string();
    assert!(url.starts_with(&format!("/uploads/products/{}/", ring.id)));
    assert!(url.ends_with(".png"));
    assert_eq!(outcome["images"][0]["alt"], "Emerald ring, side view");

    let on_disk = tokio::fs::read(stored_path(&app, &url))
        .await
        .expect("uploaded file on disk");
    assert_eq!(on_disk, PNG_BYTES);

    let detail = app.public(Method::GET, "/api/v1/products/emerald-ring").await;
    let detail = response_json(detail).await["data"].clone();
    assert_eq!(detail["image"]["url"], Value::String(url));
}

#[tokio::test]
async fn unsupported_files_are_rejected() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Plain Band", Material::Silver, dec!(3), Some(dec!(200)))
        .await;

    let body = multipart_body(&[("file", Some("application/pdf"), b"%PDF-1.7")]);
    let response = upload(&app, ring.id, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty = multipart_body(&[("alt", None, b"no file")]);
    let response = upload(&app, ring.id, empty).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut entries = tokio::fs::read_dir(app.upload_dir.path())
        .await
        .expect("upload dir");
    assert!(entries.next_entry().await.expect("read dir").is_none());
}

#[tokio::test]
async fn failed_product_update_is_queued_and_retried() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Sapphire Ring", Material::Gold, dec!(3), Some(dec!(5000)))
        .await;

    app.execute(
        "CREATE TRIGGER block_product_updates BEFORE UPDATE ON products \
         BEGIN SELECT RAISE(ABORT, 'products are locked'); END;",
    )
    .await;

    let body = multipart_body(&[("file", Some("image/png"), PNG_BYTES)]);
    let response = upload(&app, ring.id, body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let outcome = response_json(response).await["data"].clone();
    assert_eq!(outcome["status"], "queued");
    assert_eq!(outcome["images"], serde_json::json!([]));
    let url = outcome["urls"][0].as_str().expect("stored url").to_string();
    assert!(stored_path(&app, &url).exists());
    assert_eq!(app.queue.pending(IMAGE_URL_UPDATE_TOPIC).await, 1);

    let still_locked = app
        .services()
        .uploads
        .process_retry_queue()
        .await
        .expect("retry pass");
    assert_eq!(still_locked.applied, 0);
    assert_eq!(still_locked.requeued, 1);

    app.execute("DROP TRIGGER block_product_updates;").await;

    let pass = app
        .services()
        .uploads
        .process_retry_queue()
        .await
        .expect("retry pass");
    assert_eq!(pass.applied, 1);
    assert_eq!(app.queue.pending(IMAGE_URL_UPDATE_TOPIC).await, 0);

    let product = app
        .services()
        .products
        .get_product(ring.id)
        .await
        .expect("product");
    let urls: Vec<String> = product.image_list().into_iter().map(|img| img.url).collect();
    assert_eq!(urls, vec![url]);
}

#[tokio::test]
async fn retries_stop_after_the_configured_attempts() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Opal Ring", Material::Silver, dec!(2), Some(dec!(700)))
        .await;
    app.execute(
        "CREATE TRIGGER block_product_updates BEFORE UPDATE ON products \
         BEGIN SELECT RAISE(ABORT, 'products are locked'); END;",
    )
    .await;

    let body = multipart_body(&[("file", Some("image/png"), PNG_BYTES)]);
    let response = upload(&app, ring.id, body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let max_attempts = app.state.config.image_retry_max_attempts as usize;
    let mut attempts = 0;
    loop {
        let pass = app
            .services()
            .uploads
            .process_retry_queue()
            .await
            .expect("retry pass");
        if pass == RetryPass::default() {
            break;
        }
        attempts += 1;
        assert_eq!(pass.applied, 0);
        if attempts < max_attempts {
            assert_eq!(pass.requeued, 1, "attempt {attempts}");
        } else {
            assert_eq!(pass.dropped, 1, "attempt {attempts}");
        }
        assert!(attempts <= max_attempts, "job outlived its attempts");
    }

    assert_eq!(attempts, max_attempts);
    assert_eq!(app.queue.pending(IMAGE_URL_UPDATE_TOPIC).await, 0);
    assert_eq!(app.queue.dead_letters().await.len(), 1);
}

#[tokio::test]
async fn stored_files_are_removed_when_the_retry_cannot_be_queued() {
    let app = TestApp::with_queue(Arc::new(InMemoryMessageQueue::with_max_size(0))).await;
    let ring = app
        .seed_product("Onyx Ring", Material::Silver, dec!(2), Some(dec!(650)))
        .await;
    app.execute(
        "CREATE TRIGGER block_product_updates BEFORE UPDATE ON products \
         BEGIN SELECT RAISE(ABORT, 'products are locked'); END;",
    )
    .await;

    let body = multipart_body(&[("file", Some("image/png"), PNG_BYTES)]);
    let response = upload(&app, ring.id, body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.queue.pending(IMAGE_URL_UPDATE_TOPIC).await, 0);

    let product_dir = app
        .upload_dir
        .path()
        .join("products")
        .join(ring.id.to_string());
    let leftover = match tokio::fs::read_dir(&product_dir).await {
        Ok(mut entries) => entries.next_entry().await.expect("read dir").is_some(),
        Err(_) => false,
    };
    assert!(!leftover, "stored image was left behind");
}
