mod common;

use axum::http::{header, Method, StatusCode};
use common::{decimal, id_of, response_json, TestApp};
use lustre_api::entities::Material;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn slugs(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["slug"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn slug_change_redirects_the_old_url() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Rose Band", Material::Gold, dec!(3), Some(dec!(1200)))
        .await;

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/products/{}", ring.id),
            Some(json!({ "slug": "rose-gold-band" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let old = app.public(Method::GET, "/api/v1/products/rose-band").await;
    assert_eq!(old.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        old.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/api/v1/products/rose-gold-band")
    );

    let with_market = app
        .public(Method::GET, "/api/v1/products/rose-band?market=uae")
        .await;
    assert_eq!(
        with_market
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/api/v1/products/rose-gold-band?market=uae")
    );

    let smuggled = app
        .public(
            Method::GET,
            "/api/v1/products/rose-band?market=uae%26sort%3Dprice-asc",
        )
        .await;
    assert_eq!(smuggled.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        smuggled
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/api/v1/products/rose-gold-band?market=uae%26sort%3Dprice-asc")
    );

    let control = app
        .public(Method::GET, "/api/v1/products/rose-band?market=%0A")
        .await;
    assert_eq!(control.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        control
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/api/v1/products/rose-gold-band?market=%0A")
    );

    let current = app
        .public(Method::GET, "/api/v1/products/rose-gold-band")
        .await;
    assert_eq!(current.status(), StatusCode::OK);
    let detail = response_json(current).await;
    assert_eq!(detail["data"]["name"], "Rose Band");

    let redirects = app
        .admin(
            Method::GET,
            &format!("/api/v1/admin/products/{}/redirects", ring.id),
            None,
        )
        .await;
    let redirects = response_json(redirects).await["data"].clone();
    assert_eq!(redirects.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn repeated_slug_edits_keep_one_redirect_per_old_slug() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("A Slug", Material::Silver, dec!(2), Some(dec!(300)))
        .await;

    for slug in ["b-slug", "a-slug", "b-slug", "c-slug", "a-slug"] {
        let response = app
            .admin(
                Method::PUT,
                &format!("/api/v1/admin/products/{}", ring.id),
                Some(json!({ "slug": slug })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "renaming to {slug}");
    }

    let redirects = app
        .admin(
            Method::GET,
            &format!("/api/v1/admin/products/{}/redirects", ring.id),
            None,
        )
        .await;
    let redirects = response_json(redirects).await["data"].clone();
    let mut old_slugs: Vec<String> = redirects
        .as_array()
        .expect("redirect list")
        .iter()
        .map(|r| r["old_slug"].as_str().unwrap_or_default().to_string())
        .collect();
    old_slugs.sort();
    assert_eq!(old_slugs, vec!["b-slug".to_string(), "c-slug".to_string()]);

    for old in ["b-slug", "c-slug"] {
        let response = app
            .public(Method::GET, &format!("/api/v1/products/{}", old))
            .await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/api/v1/products/a-slug")
        );
    }
    let current = app.public(Method::GET, "/api/v1/products/a-slug").await;
    assert_eq!(current.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let app = TestApp::new().await;
    app.seed_product("Halo Ring", Material::Gold, dec!(2), Some(dec!(900)))
        .await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "Another Halo",
                "slug": "halo-ring",
                "material": "silver",
                "gender": "unisex",
                "weight": "1",
                "price": "100",
                "stock": 1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn storefront_filters_and_sorts() {
    let app = TestApp::new().await;
    app.seed_product("Gold Studs", Material::Gold, dec!(1), Some(dec!(3000)))
        .await;
    app.seed_product("Gold Hoops", Material::Gold, dec!(2), Some(dec!(1500)))
        .await;
    app.seed_product("Silver Hoops", Material::Silver, dec!(2), Some(dec!(200)))
        .await;

    let response = app
        .public(Method::GET, "/api/v1/products?material=gold&sort=price-asc")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = response_json(response).await["data"].clone();
    assert_eq!(slugs(&page), vec!["gold-hoops", "gold-studs"]);
    assert_eq!(page["total"], 2);
    assert_eq!(page["query"], "material=gold&sort=price-asc");

    let searched = app
        .public(Method::GET, "/api/v1/products?q=hoops&sort=price-desc")
        .await;
    let searched = response_json(searched).await["data"].clone();
    assert_eq!(slugs(&searched), vec!["gold-hoops", "silver-hoops"]);

    let bounded = app
        .public(Method::GET, "/api/v1/products?min_price=1000&max_price=2000")
        .await;
    let bounded = response_json(bounded).await["data"].clone();
    assert_eq!(slugs(&bounded), vec!["gold-hoops"]);

    let paged = app
        .public(Method::GET, "/api/v1/products?sort=price-asc&per_page=2&page=2")
        .await;
    let paged = response_json(paged).await["data"].clone();
    assert_eq!(slugs(&paged), vec!["gold-studs"]);
    assert_eq!(paged["total_pages"], 2);
}

#[tokio::test]
async fn inactive_products_are_hidden_from_the_storefront() {
    let app = TestApp::new().await;
    let hidden = app
        .seed_product("Archived Pendant", Material::Silver, dec!(4), Some(dec!(300)))
        .await;
    app.admin(
        Method::PUT,
        &format!("/api/v1/admin/products/{}", hidden.id),
        Some(json!({ "is_active": false })),
    )
    .await;

    let detail = app
        .public(Method::GET, "/api/v1/products/archived-pendant")
        .await;
    assert_eq!(detail.status(), StatusCode::NOT_FOUND);

    let listing = app.public(Method::GET, "/api/v1/products").await;
    let listing = response_json(listing).await["data"].clone();
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn removing_the_last_image_leaves_an_empty_list() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Signet Ring", Material::Gold, dec!(5), Some(dec!(2500)))
        .await;
    let images_uri = format!("/api/v1/admin/products/{}/images", ring.id);

    let added = app
        .admin(
            Method::POST,
            &images_uri,
            Some(json!({ "images": [{ "url": "https://cdn.test/signet.jpg", "alt": "Signet" }] })),
        )
        .await;
    assert_eq!(added.status(), StatusCode::OK);

    let removed = app
        .admin(
            Method::DELETE,
            &images_uri,
            Some(json!({ "url": "https://cdn.test/signet.jpg" })),
        )
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(response_json(removed).await["data"], json!([]));

    let detail = app.public(Method::GET, "/api/v1/products/signet-ring").await;
    let detail = response_json(detail).await["data"].clone();
    assert_eq!(detail["images"], json!([]));
    assert!(detail["image"].is_null());
}

#[tokio::test]
async fn inactive_category_page_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/categories",
            Some(json!({ "name": "Bracelets", "is_active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let page = app.public(Method::GET, "/api/v1/categories/bracelets").await;
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_page_lists_its_products() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/categories",
            Some(json!({ "name": "Rings" })),
        )
        .await;
    let category_id = id_of(&response_json(response).await["data"]);

    let mut input = common::product_input("Band Ring", Material::Silver, dec!(3), Some(dec!(250)));
    input.category_id = Some(category_id);
    app.services()
        .products
        .create_product(input)
        .await
        .expect("create categorized product");
    app.seed_product("Loose Chain", Material::Silver, dec!(3), Some(dec!(250)))
        .await;

    let page = app.public(Method::GET, "/api/v1/categories/rings").await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = response_json(page).await["data"].clone();
    assert_eq!(body["grouping"]["slug"], "rings");
    assert_eq!(slugs(&body["products"]), vec!["band-ring"]);
}

#[tokio::test]
async fn collection_keeps_curated_order() {
    let app = TestApp::new().await;
    let first = app
        .seed_product("Pearl Drop", Material::Silver, dec!(2), Some(dec!(400)))
        .await;
    let second = app
        .seed_product("Tennis Bracelet", Material::Gold, dec!(8), Some(dec!(9000)))
        .await;
    let third = app
        .seed_product("Charm Anklet", Material::Silver, dec!(3), Some(dec!(150)))
        .await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/collections",
            Some(json!({ "name": "Bridal Edit" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let collection_id = id_of(&response_json(response).await["data"]);

    let added = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/collections/{}/products", collection_id),
            Some(json!({ "product_ids": [first.id, second.id, third.id] })),
        )
        .await;
    assert!(added.status().is_success());

    let reordered = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/collections/{}/products/order", collection_id),
            Some(json!({ "product_ids": [third.id, first.id, second.id] })),
        )
        .await;
    assert_eq!(reordered.status(), StatusCode::OK);

    let page = app
        .public(Method::GET, "/api/v1/collections/bridal-edit")
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = response_json(page).await["data"].clone();
    assert_eq!(
        slugs(&body["products"]),
        vec!["charm-anklet", "pearl-drop", "tennis-bracelet"]
    );

    let sorted = app
        .public(Method::GET, "/api/v1/collections/bridal-edit?sort=price-desc")
        .await;
    let sorted = response_json(sorted).await["data"].clone();
    assert_eq!(decimal(&sorted["products"]["items"][0]["price"]), dec!(9000));
}

#[tokio::test]
async fn malformed_image_column_is_not_overwritten() {
    let app = TestApp::new().await;
    let ring = app
        .seed_product("Legacy Ring", Material::Gold, dec!(2), Some(dec!(900)))
        .await;
    app.execute(
        r#"UPDATE products SET images = '{"url":"/legacy.png"}' WHERE slug = 'legacy-ring'"#,
    )
    .await;

    let response = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/products/{}/images", ring.id),
            Some(json!({ "images": [{ "url": "https://cdn.test/new.jpg" }] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let stored = app
        .services()
        .products
        .get_product(ring.id)
        .await
        .expect("product");
    assert_eq!(stored.images, json!({ "url": "/legacy.png" }));

    let detail = app.public(Method::GET, "/api/v1/products/legacy-ring").await;
    assert_eq!(detail.status(), StatusCode::OK);
    assert_eq!(response_json(detail).await["data"]["images"], json!([]));
}
