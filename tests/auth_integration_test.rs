mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, PASSWORD};
use serde_json::json;

async fn login(app: &TestApp, email: &str, password: &str) -> axum::response::Response {
    app.request(
        Method::POST,
        "/api/v1/auth/login",
        Some(json!({ "email": email, "password": password })),
        None,
    )
    .await
}

#[tokio::test]
async fn register_login_me_logout() {
    let app = TestApp::new().await;

    let registered = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "new@lustre.test", "name": "New Shopper", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let account = response_json(registered).await["data"].clone();
    assert_eq!(account["role"], "customer");
    assert!(account.get("password_hash").is_none());

    let response = login(&app, "new@lustre.test", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = response_json(response).await["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(response_json(me).await["data"]["email"], "new@lustre.test");

    let logout = app
        .request(Method::POST, "/api/v1/auth/logout", None, Some(&token))
        .await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": common::CUSTOMER_EMAIL, "name": "Again", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let short = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "short@lustre.test", "name": "Short", "password": "abc" })),
            None,
        )
        .await;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let response = login(&app, common::CUSTOMER_EMAIL, "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_area_checks_token_and_role() {
    let app = TestApp::new().await;

    let anonymous = app.public(Method::GET, "/api/v1/admin/products").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(Method::GET, "/api/v1/admin/products", None, Some("not.a.jwt"))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let customer = app.customer(Method::GET, "/api/v1/admin/orders", None).await;
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);

    let admin = app.admin(Method::GET, "/api/v1/admin/products", None).await;
    assert_eq!(admin.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_endpoints_need_no_token() {
    let app = TestApp::new().await;

    let status = app.public(Method::GET, "/api/v1/status").await;
    assert_eq!(status.status(), StatusCode::OK);
    let body = response_json(status).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "lustre-api");

    let health = app.public(Method::GET, "/health").await;
    assert_eq!(health.status(), StatusCode::OK);

    let markets = app.public(Method::GET, "/api/v1/markets").await;
    assert_eq!(markets.status(), StatusCode::OK);

    let response = app.public(Method::GET, "/api/v1/products").await;
    assert!(response.headers().contains_key("x-request-id"));
}
