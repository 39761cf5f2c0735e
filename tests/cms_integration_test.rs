mod common;

use axum::http::{header, Method, StatusCode};
use common::{id_of, response_json, response_text, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_page(app: &TestApp, slug: &str) -> Uuid {
    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/pages",
            Some(json!({ "slug": slug, "title": "About us" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    id_of(&response_json(response).await["data"])
}

async fn add_block(app: &TestApp, page_id: Uuid, kind: &str, parent: Option<Uuid>) -> Value {
    let response = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/blocks", page_id),
            Some(json!({ "kind": kind, "parent": parent })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED, "adding {kind}");
    response_json(response).await["data"].clone()
}

async fn set_data(app: &TestApp, page_id: Uuid, block_id: Uuid, data: Value) {
    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/pages/{}/blocks/{}", page_id, block_id),
            Some(json!({ "data": data })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocks_nest_one_level_under_sections() {
    let app = TestApp::new().await;
    let page_id = create_page(&app, "about").await;

    let section = add_block(&app, page_id, "section", None).await;
    let section_id = id_of(&section["block"]);
    let text = add_block(&app, page_id, "text", Some(section_id)).await;
    let text_id = id_of(&text["block"]);

    let blocks = text["page"]["blocks"].clone();
    assert_eq!(blocks[0]["kind"], "section");
    assert_eq!(blocks[0]["children"][0]["id"], text_id.to_string());
    assert_eq!(blocks[0]["children"][0]["data"], json!({ "content": "" }));

    let under_text = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/blocks", page_id),
            Some(json!({ "kind": "cta", "parent": text_id })),
        )
        .await;
    assert_eq!(under_text.status(), StatusCode::BAD_REQUEST);

    let nested_section = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/blocks", page_id),
            Some(json!({ "kind": "grid", "parent": section_id })),
        )
        .await;
    assert_eq!(nested_section.status(), StatusCode::BAD_REQUEST);

    let not_an_object = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/pages/{}/blocks/{}", page_id, text_id),
            Some(json!({ "data": "plain" })),
        )
        .await;
    assert_eq!(not_an_object.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn moving_blocks_swaps_siblings() {
    let app = TestApp::new().await;
    let page_id = create_page(&app, "story").await;
    let header_block = add_block(&app, page_id, "header", None).await;
    let cta = add_block(&app, page_id, "cta", None).await;
    let cta_id = id_of(&cta["block"]);

    let moved = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/blocks/{}/move", page_id, cta_id),
            Some(json!({ "direction": "up" })),
        )
        .await;
    assert_eq!(moved.status(), StatusCode::OK);
    let page = response_json(moved).await["data"].clone();
    assert_eq!(page["blocks"][0]["id"], cta_id.to_string());
    assert_eq!(page["blocks"][1]["id"], header_block["block"]["id"]);

    let at_edge = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/blocks/{}/move", page_id, cta_id),
            Some(json!({ "direction": "up" })),
        )
        .await;
    assert_eq!(at_edge.status(), StatusCode::OK);
    let page = response_json(at_edge).await["data"].clone();
    assert_eq!(page["blocks"][0]["id"], cta_id.to_string());

    let removed = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/admin/pages/{}/blocks/{}", page_id, cta_id),
            None,
        )
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
    let page = response_json(removed).await["data"].clone();
    assert_eq!(page["blocks"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn pages_are_public_only_once_published() {
    let app = TestApp::new().await;
    let page_id = create_page(&app, "care-guide").await;
    let text = add_block(&app, page_id, "text", None).await;
    set_data(
        &app,
        page_id,
        id_of(&text["block"]),
        json!({ "content": "Polish gently" }),
    )
    .await;

    let draft = app.public(Method::GET, "/api/v1/pages/care-guide").await;
    assert_eq!(draft.status(), StatusCode::NOT_FOUND);

    let published = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/pages/{}/publish", page_id),
            None,
        )
        .await;
    assert_eq!(published.status(), StatusCode::OK);
    assert_eq!(response_json(published).await["data"]["is_published"], true);

    let visible = app.public(Method::GET, "/api/v1/pages/care-guide").await;
    assert_eq!(visible.status(), StatusCode::OK);
    let page = response_json(visible).await["data"].clone();
    assert_eq!(page["blocks"][0]["data"]["content"], "Polish gently");

    app.admin(
        Method::POST,
        &format!("/api/v1/admin/pages/{}/unpublish", page_id),
        None,
    )
    .await;
    let hidden = app.public(Method::GET, "/api/v1/pages/care-guide").await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rendered_html_is_escaped() {
    let app = TestApp::new().await;
    let page_id = create_page(&app, "promo").await;
    let text = add_block(&app, page_id, "text", None).await;
    let cta = add_block(&app, page_id, "cta", None).await;
    set_data(
        &app,
        page_id,
        id_of(&text["block"]),
        json!({ "content": "<script>alert(1)</script> & more" }),
    )
    .await;
    set_data(
        &app,
        page_id,
        id_of(&cta["block"]),
        json!({ "label": "Shop", "href": "javascript:alert(1)", "text": "Now" }),
    )
    .await;

    let preview = app
        .admin(
            Method::GET,
            &format!("/api/v1/admin/pages/{}/preview", page_id),
            None,
        )
        .await;
    assert_eq!(preview.status(), StatusCode::OK);
    assert!(preview
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html")));
    let html = response_text(preview).await;
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("<a href=\"#\">Shop</a>"));

    app.admin(
        Method::POST,
        &format!("/api/v1/admin/pages/{}/publish", page_id),
        None,
    )
    .await;
    let public_html = app.public(Method::GET, "/api/v1/pages/promo/html").await;
    assert_eq!(public_html.status(), StatusCode::OK);
    assert_eq!(response_text(public_html).await, html);
}

#[tokio::test]
async fn page_admin_requires_the_admin_role() {
    let app = TestApp::new().await;
    let response = app
        .customer(
            Method::POST,
            "/api/v1/admin/pages",
            Some(json!({ "slug": "sneaky", "title": "Nope" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let duplicate_slug = create_page(&app, "faq").await;
    let again = app
        .admin(
            Method::POST,
            "/api/v1/admin/pages",
            Some(json!({ "slug": "faq", "title": "FAQ" })),
        )
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let deleted = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/admin/pages/{}", duplicate_slug),
            None,
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}
