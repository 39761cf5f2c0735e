mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, id_of, product_input, response_json, TestApp};
use lustre_api::entities::Material;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

fn shipping() -> Value {
    json!({
        "name": "Dana Customer",
        "line1": "12 Harbour Road",
        "city": "Lisbon",
        "postal_code": "1100-001",
        "country": "PT"
    })
}

async fn stocked_product(app: &TestApp, name: &str, price: rust_decimal::Decimal, stock: i32) -> Uuid {
    let mut input = product_input(name, Material::Silver, dec!(4), Some(price));
    input.stock = stock;
    app.services()
        .products
        .create_product(input)
        .await
        .expect("create stocked product")
        .id
}

async fn stock_of(app: &TestApp, product_id: Uuid) -> i64 {
    let response = app
        .admin(
            Method::GET,
            &format!("/api/v1/admin/products/{}", product_id),
            None,
        )
        .await;
    response_json(response).await["data"]["stock"]
        .as_i64()
        .expect("stock")
}

async fn add_to_cart(app: &TestApp, product_id: Uuid, quantity: i32) -> axum::response::Response {
    app.customer(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "product_id": product_id, "quantity": quantity })),
    )
    .await
}

#[tokio::test]
async fn cart_lines_are_capped_and_stock_checked() {
    let app = TestApp::new().await;
    let plenty = stocked_product(&app, "Silver Bangle", dec!(300), 50).await;
    let scarce = stocked_product(&app, "Opal Ring", dec!(800), 2).await;

    let first = add_to_cart(&app, plenty, 6).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cart = response_json(first).await["data"].clone();
    assert_eq!(cart["item_count"], 6);
    assert_eq!(decimal(&cart["subtotal"]), dec!(1800));

    let over_cap = add_to_cart(&app, plenty, 5).await;
    assert_eq!(over_cap.status(), StatusCode::BAD_REQUEST);

    let too_many = add_to_cart(&app, scarce, 3).await;
    assert_eq!(too_many.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let updated = app
        .customer(
            Method::PUT,
            &format!("/api/v1/cart/items/{}", plenty),
            Some(json!({ "quantity": 10 })),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let cart = response_json(updated).await["data"].clone();
    assert_eq!(cart["items"][0]["quantity"], 10);
    assert_eq!(decimal(&cart["items"][0]["line_total"]), dec!(3000));

    let removed = app
        .customer(
            Method::PUT,
            &format!("/api/v1/cart/items/{}", plenty),
            Some(json!({ "quantity": 0 })),
        )
        .await;
    let cart = response_json(removed).await["data"].clone();
    assert_eq!(cart["items"], json!([]));
    assert_eq!(decimal(&cart["subtotal"]), dec!(0));
}

#[tokio::test]
async fn cart_requires_a_login() {
    let app = TestApp::new().await;
    let response = app.public(Method::GET, "/api/v1/cart").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_places_an_order_with_a_promotion() {
    let app = TestApp::new().await;
    let product_id = stocked_product(&app, "Silver Locket", dec!(1000), 5).await;

    let promo = app
        .admin(
            Method::POST,
            "/api/v1/admin/promotions",
            Some(json!({
                "code": "WELCOME10",
                "discount_kind": "percentage",
                "value": "10"
            })),
        )
        .await;
    assert_eq!(promo.status(), StatusCode::CREATED);

    assert_eq!(add_to_cart(&app, product_id, 2).await.status(), StatusCode::OK);

    let check = app
        .customer(
            Method::POST,
            "/api/v1/cart/promotion",
            Some(json!({ "code": "WELCOME10" })),
        )
        .await;
    assert_eq!(check.status(), StatusCode::OK);
    let applied = response_json(check).await["data"].clone();
    assert_eq!(decimal(&applied["discount"]), dec!(200));

    let placed = app
        .customer(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "shipping_address": shipping(), "promotion_code": "WELCOME10" })),
        )
        .await;
    assert_eq!(placed.status(), StatusCode::CREATED);
    let placed = response_json(placed).await["data"].clone();
    assert_eq!(placed["order"]["status"], "pending");
    assert_eq!(decimal(&placed["order"]["subtotal"]), dec!(2000));
    assert_eq!(decimal(&placed["order"]["discount"]), dec!(200));
    assert_eq!(decimal(&placed["order"]["total"]), dec!(1800));
    assert_eq!(placed["order"]["email"], common::CUSTOMER_EMAIL);
    assert_eq!(placed["items"][0]["quantity"], 2);

    assert_eq!(stock_of(&app, product_id).await, 3);

    let cart = app.customer(Method::GET, "/api/v1/cart", None).await;
    let cart = response_json(cart).await["data"].clone();
    assert_eq!(cart["items"], json!([]));

    let history = app.customer(Method::GET, "/api/v1/orders", None).await;
    let history = response_json(history).await["data"].clone();
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let response = app
        .customer(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "shipping_address": shipping() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_promotion_fails_the_whole_checkout() {
    let app = TestApp::new().await;
    let product_id = stocked_product(&app, "Silver Brooch", dec!(500), 4).await;
    add_to_cart(&app, product_id, 1).await;

    let response = app
        .customer(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "shipping_address": shipping(), "promotion_code": "NOPE" })),
        )
        .await;
    assert!(response.status().is_client_error());
    assert_eq!(stock_of(&app, product_id).await, 4);

    let cart = app.customer(Method::GET, "/api/v1/cart", None).await;
    let cart = response_json(cart).await["data"].clone();
    assert_eq!(cart["item_count"], 1);
}

#[tokio::test]
async fn cancelling_an_order_restores_stock() {
    let app = TestApp::new().await;
    let product_id = stocked_product(&app, "Silver Anklet", dec!(250), 5).await;
    add_to_cart(&app, product_id, 3).await;

    let placed = app
        .customer(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "shipping_address": shipping() })),
        )
        .await;
    let order_id = id_of(&response_json(placed).await["data"]["order"]);
    assert_eq!(stock_of(&app, product_id).await, 2);

    let listed = app
        .admin(Method::GET, "/api/v1/admin/orders?status=pending", None)
        .await;
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = response_json(listed).await["data"].clone();
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["id"], order_id.to_string());

    let cancelled = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/orders/{}/status", order_id),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(cancelled.status(), StatusCode::OK);
    assert_eq!(
        response_json(cancelled).await["data"]["order"]["status"],
        "cancelled"
    );
    assert_eq!(stock_of(&app, product_id).await, 5);

    let revived = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/orders/{}/status", order_id),
            Some(json!({ "status": "paid" })),
        )
        .await;
    assert_eq!(revived.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let app = TestApp::new().await;
    let product_id = stocked_product(&app, "Silver Toe Ring", dec!(90), 5).await;
    add_to_cart(&app, product_id, 1).await;
    let placed = app
        .customer(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "shipping_address": shipping() })),
        )
        .await;
    let order_id = id_of(&response_json(placed).await["data"]["order"]);

    let registered = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "other@lustre.test", "name": "Other", "password": common::PASSWORD })),
            None,
        )
        .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "other@lustre.test", "password": common::PASSWORD })),
            None,
        )
        .await;
    let token = response_json(login).await["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let foreign = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let own = app
        .customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(own.status(), StatusCode::OK);
}
